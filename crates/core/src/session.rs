//! Logged-in session.
//!
//! A [`Session`] is created by [`login`], handed explicitly to every page controller and
//! consumed by [`logout`]. The server tracks the session through its cookie; this value only
//! carries who the user is so pages can render the header and apply role rules.

use crate::constants::{DEFAULT_LOGIN_FAILURE, LOGIN_PATH, LOGOUT_PATH};
use crate::error::{FetchError, FetchResult, LoginError};
use crate::record::Record;
use crate::resource::{error_reason, interpret, ApiClient};
use crate::transport::{ApiRequest, Transport};
use chrono::{DateTime, Utc};
use clinic_types::{Identifier, Role};
use serde_json::json;
use uuid::Uuid;

/// The employee behind a session, as described by the login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub employee_id: Identifier,
    pub site_id: Option<Identifier>,
    pub name: String,
    /// `None` when the server sent no usable role; role rules then hide every gated element.
    pub role: Option<Role>,
    pub email: Option<String>,
    pub site_name: Option<String>,
}

impl SessionUser {
    /// Reads `{id_emp, id_sede, nombre, rol, email, sede_nombre}`.
    ///
    /// # Errors
    ///
    /// `LoginError::MalformedUser` when `id_emp` is missing.
    pub fn from_record(user: &Record) -> Result<Self, LoginError> {
        let employee_id = user
            .identifier("id_emp")
            .ok_or_else(|| LoginError::MalformedUser("missing id_emp".into()))?;
        let email = user.text("email");
        let name = user
            .text("nombre")
            .or_else(|| email.clone())
            .unwrap_or_else(|| employee_id.to_string());

        Ok(Self {
            employee_id,
            site_id: user.identifier("id_sede"),
            name,
            role: user.text("rol").and_then(|r| Role::new(r).ok()),
            email,
            site_name: user.text("sede_nombre"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    user: SessionUser,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: SessionUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> &SessionUser {
        &self.user
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.role.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Authenticates against `login/` and opens a session.
///
/// Blank credentials are refused before any request is sent. A 400 or 401 answer, or a 2xx
/// with `success: false`, is an invalid-credentials failure carrying the server's message.
///
/// # Errors
///
/// - `LoginError::MissingCredentials` for a blank email or password
/// - `LoginError::InvalidCredentials` when the server refuses them
/// - `LoginError::MalformedUser` when the response has no usable `user`
/// - `LoginError::Fetch` for any other failure
pub async fn login<T: Transport>(
    api: &ApiClient<T>,
    email: &str,
    password: &str,
) -> Result<Session, LoginError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let request = ApiRequest::post(LOGIN_PATH, json!({ "email": email, "password": password }));
    let response = api
        .transport()
        .send(request)
        .await
        .map_err(FetchError::from)?;

    if matches!(response.status, 400 | 401) {
        let reason =
            error_reason(&response.body).unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_owned());
        tracing::info!(email, status = response.status, "login refused");
        return Err(LoginError::InvalidCredentials(reason));
    }

    let body = interpret(&response)?;
    if body.bool("success") == Some(false) {
        return Err(LoginError::InvalidCredentials(
            body.text("error")
                .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_owned()),
        ));
    }

    let user = body
        .record("user")
        .ok_or_else(|| LoginError::MalformedUser("missing user".into()))?;
    let session = Session::new(SessionUser::from_record(&user)?);

    tracing::info!(
        session = %session.id(),
        employee = %session.user().employee_id,
        "logged in"
    );
    Ok(session)
}

/// Ends the session on the server. The session value is consumed whatever the outcome.
pub async fn logout<T: Transport>(api: &ApiClient<T>, session: Session) -> FetchResult<()> {
    let result = api.post(LOGOUT_PATH, &json!({})).await.map(|_| ());
    tracing::info!(session = %session.id(), ok = result.is_ok(), "logged out");
    result
}
