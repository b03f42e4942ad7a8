//! Error taxonomy for the clinic client.
//!
//! Every failure a page can hit ends in a [`UserSignal`]: either a redirect to the login entry
//! point or a message rendered inline where the data would have been. [`FetchError::user_signal`]
//! is the one place that policy is decided.

use clinic_types::{PanelName, TextError};
use std::fmt;

/// What the user sees when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSignal {
    /// The session is gone; send the user back to the login entry point.
    RedirectToLogin,
    /// Valid session, insufficient role. Rendered inline, no redirect.
    PermissionDenied(String),
    /// Any other failure, rendered inline. The user may retry the action.
    Inline(String),
}

impl UserSignal {
    pub fn is_redirect(&self) -> bool {
        matches!(self, UserSignal::RedirectToLogin)
    }
}

impl fmt::Display for UserSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserSignal::RedirectToLogin => f.write_str("session expired, please log in again"),
            UserSignal::PermissionDenied(msg) | UserSignal::Inline(msg) => f.write_str(msg),
        }
    }
}

/// Failure of a single network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Other(String),
}

/// Failure of a read or write against the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// HTTP 401.
    #[error("not authenticated")]
    Unauthenticated,
    /// HTTP 403, with the server's `error` text when it sent one.
    #[error("{}", .reason.as_deref().unwrap_or("permission denied"))]
    Forbidden { reason: Option<String> },
    /// Any other non-2xx status, a network failure (no status) or an undecodable 2xx body.
    #[error("{}", unavailable_message(.status, .reason))]
    Unavailable {
        status: Option<u16>,
        reason: Option<String>,
    },
    /// A 2xx write answered with `success: false`.
    #[error("{reason}")]
    Rejected { reason: String },
}

fn unavailable_message(status: &Option<u16>, reason: &Option<String>) -> String {
    match (status, reason) {
        (_, Some(reason)) => reason.clone(),
        (Some(status), None) => format!("server unavailable (HTTP {status})"),
        (None, None) => "server unavailable".to_owned(),
    }
}

impl FetchError {
    /// Maps the failure to what the user sees.
    pub fn user_signal(&self) -> UserSignal {
        match self {
            FetchError::Unauthenticated => UserSignal::RedirectToLogin,
            FetchError::Forbidden { .. } => UserSignal::PermissionDenied(self.to_string()),
            FetchError::Unavailable { .. } | FetchError::Rejected { .. } => {
                UserSignal::Inline(self.to_string())
            }
        }
    }

    /// The HTTP status that produced this error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Unauthenticated => Some(401),
            FetchError::Forbidden { .. } => Some(403),
            FetchError::Unavailable { status, .. } => *status,
            FetchError::Rejected { .. } => None,
        }
    }

    /// Network failures and 5xx responses; the only errors a read retry may repeat.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Unavailable { status: None, .. } => true,
            FetchError::Unavailable {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn malformed(status: u16, detail: impl fmt::Display) -> Self {
        FetchError::Unavailable {
            status: Some(status),
            reason: Some(format!("malformed response: {detail}")),
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        FetchError::Unavailable {
            status: None,
            reason: Some(err.to_string()),
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// A plain form field that failed client-side checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {problem}")]
pub struct ValidationError {
    pub field: String,
    pub problem: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

/// Failure of a cascade form submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Required selectors without a value, in declaration order. Raised before any network call.
    #[error("missing selection: {}", .missing.join(", "))]
    IncompleteSelection { missing: Vec<String> },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl SubmitError {
    pub fn user_signal(&self) -> UserSignal {
        match self {
            SubmitError::Fetch(err) => err.user_signal(),
            other => UserSignal::Inline(other.to_string()),
        }
    }
}

/// A user gesture on a selector that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("unknown selector: {0}")]
    UnknownSelector(String),
    #[error("{value} is not an option of {selector}")]
    NotAnOption { selector: String, value: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Invalid panel declarations or navigation requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("a panel set needs at least one panel")]
    NoPanels,
    #[error("panel declared twice: {0}")]
    DuplicatePanel(PanelName),
    #[error("panel {panel} names an undeclared parent {parent}")]
    UnknownParent { panel: PanelName, parent: PanelName },
    #[error("unknown panel: {0}")]
    UnknownPanel(String),
    #[error("panel {0} has no parent to go back to")]
    NoParent(PanelName),
}

/// Failure of the login exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// Email or password left blank; no request was sent.
    #[error("please fill in both email and password")]
    MissingCredentials,
    /// The server refused the credentials; its message is kept verbatim.
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("login response did not describe a user: {0}")]
    MalformedUser(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Invalid page declarations (panel sets, selector graphs).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("invalid name: {0}")]
    Name(#[from] TextError),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Invalid start-up configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base URL {url}: {problem}")]
    InvalidBaseUrl { url: String, problem: String },
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("failed to read role rules file: {0}")]
    RoleRulesRead(std::io::Error),
    #[error("failed to parse role rules: {0}")]
    RoleRulesParse(serde_yaml::Error),
    #[error("invalid role rule: {0}")]
    RoleRule(#[from] TextError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_redirects() {
        assert_eq!(
            FetchError::Unauthenticated.user_signal(),
            UserSignal::RedirectToLogin
        );
    }

    #[test]
    fn forbidden_is_inline_permission_denied() {
        let err = FetchError::Forbidden {
            reason: Some("No tiene permisos para ver auditoría".into()),
        };
        assert_eq!(
            err.user_signal(),
            UserSignal::PermissionDenied("No tiene permisos para ver auditoría".into())
        );
        assert_eq!(
            FetchError::Forbidden { reason: None }.user_signal(),
            UserSignal::PermissionDenied("permission denied".into())
        );
    }

    #[test]
    fn unavailable_prefers_server_reason() {
        let err = FetchError::Unavailable {
            status: Some(500),
            reason: Some("Error al consultar citas".into()),
        };
        assert_eq!(err.to_string(), "Error al consultar citas");

        let err = FetchError::Unavailable {
            status: Some(502),
            reason: None,
        };
        assert_eq!(err.to_string(), "server unavailable (HTTP 502)");
    }

    #[test]
    fn only_network_and_server_errors_are_transient() {
        assert!(FetchError::from(TransportError::Timeout).is_transient());
        assert!(FetchError::Unavailable {
            status: Some(503),
            reason: None
        }
        .is_transient());
        assert!(!FetchError::Unavailable {
            status: Some(404),
            reason: None
        }
        .is_transient());
        assert!(!FetchError::malformed(200, "not an object").is_transient());
        assert!(!FetchError::Unauthenticated.is_transient());
    }

    #[test]
    fn incomplete_selection_names_fields() {
        let err = SubmitError::IncompleteSelection {
            missing: vec!["department".into(), "doctor".into()],
        };
        assert_eq!(err.to_string(), "missing selection: department, doctor");
        assert_eq!(
            err.user_signal(),
            UserSignal::Inline("missing selection: department, doctor".into())
        );
    }

    #[test]
    fn rejected_reason_is_verbatim() {
        let err = SubmitError::from(FetchError::Rejected {
            reason: "X".into(),
        });
        assert_eq!(err.user_signal(), UserSignal::Inline("X".into()));
    }
}
