//! `HttpTransport` against a local axum backend: cookies, status mapping and query encoding.

use axum::{
    extract::Query as QueryParams,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clinic_core::pages::audit::AuditPage;
use clinic_core::{
    login, ApiClient, ClientConfig, Endpoint, FetchError, HttpTransport, LoginError, PageContext,
    Query, RetryPolicy, UserSignal,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

const SESSION_COOKIE: &str = "sessionid=abc123";

async fn login_handler(Json(body): Json<Value>) -> Response {
    if body["password"] == "secreto" {
        (
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
            Json(json!({
                "success": true,
                "user": {"id_emp": 4, "nombre": "Ana Ruiz", "rol": "Medico", "sede_nombre": "Sede Norte"}
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Correo o contraseña incorrectos"})),
        )
            .into_response()
    }
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(SESSION_COOKIE))
}

async fn appointments_handler(
    headers: HeaderMap,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Response {
    if !has_session(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "No autenticado"})),
        )
            .into_response();
    }
    let estado = params.get("estado").cloned().unwrap_or_else(|| "TODAS".into());
    Json(json!({"citas": [{"id_cita": 1, "estado": estado}]})).into_response()
}

const SEARCH_TERM: &str = "Ruiz & Peña/ñ?=1";

async fn patients_handler(QueryParams(params): QueryParams<HashMap<String, String>>) -> Response {
    let term = params.get("busqueda").cloned().unwrap_or_default();
    if term != SEARCH_TERM {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("busqueda llegó como {term:?}")})),
        )
            .into_response();
    }
    Json(json!({"pacientes": [{"cod_pac": 12, "busqueda": term}]})).into_response()
}

async fn audit_handler() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": "Solo administradores"})),
    )
        .into_response()
}

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/api/v2/login/", post(login_handler))
        .route("/api/v2/citas/", get(appointments_handler))
        .route("/api/v2/pacientes/", get(patients_handler))
        .route("/api/v2/auditoria/accesos/", get(audit_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr should exist");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    addr
}

fn client(addr: SocketAddr) -> ApiClient<HttpTransport> {
    let cfg = ClientConfig::new(
        &format!("http://{addr}/api/v2"),
        Duration::from_secs(5),
        RetryPolicy::single_attempt(),
    )
    .expect("config should be valid");
    let transport = HttpTransport::new(&cfg).expect("client should build");
    ApiClient::new(transport, cfg.retry())
}

#[tokio::test]
async fn session_cookie_authenticates_later_reads() {
    let addr = serve().await;
    let api = client(addr);
    let appointments = Endpoint::new("citas/", "citas");

    assert_eq!(
        api.fetch_collection(&appointments, &Query::new()).await,
        Err(FetchError::Unauthenticated)
    );

    let refused = login(&api, "ana@clinica.co", "otra").await.unwrap_err();
    assert_eq!(
        refused,
        LoginError::InvalidCredentials("Correo o contraseña incorrectos".into())
    );

    let session = login(&api, "ana@clinica.co", "secreto")
        .await
        .expect("login should succeed");
    assert_eq!(session.user().name, "Ana Ruiz");

    let citas = api
        .fetch_collection(&appointments, &Query::new().with("estado", "CANCELADA"))
        .await
        .expect("authenticated read should succeed");
    assert_eq!(citas[0].text("estado").as_deref(), Some("CANCELADA"));
}

#[tokio::test]
async fn query_values_are_url_encoded() {
    let addr = serve().await;
    let api = client(addr);

    let pacientes = api
        .fetch_collection(
            &Endpoint::new("pacientes/", "pacientes"),
            &Query::new().with("busqueda", SEARCH_TERM),
        )
        .await
        .expect("search should reach the handler intact");
    assert_eq!(pacientes.len(), 1);
    assert_eq!(pacientes[0].text("busqueda").as_deref(), Some(SEARCH_TERM));
}

#[tokio::test]
async fn forbidden_page_renders_permission_denied() {
    let addr = serve().await;
    let api = Rc::new(client(addr));
    let session = login(&api, "ana@clinica.co", "secreto")
        .await
        .expect("login should succeed");

    let page = AuditPage::new(&PageContext::new(api, Rc::new(session)));
    let table = page.load().await;
    assert!(matches!(
        table.failure(),
        Some(UserSignal::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transient_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr should exist");
    drop(listener);

    let err = client(addr)
        .fetch_collection(&Endpoint::new("citas/", "citas"), &Query::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), None);
    assert!(err.is_transient());
}
