//! Reads and writes against the backend.
//!
//! [`ApiClient`] turns raw responses into records or a [`FetchError`]:
//!
//! | Response                         | Result                                  |
//! |----------------------------------|-----------------------------------------|
//! | 2xx, JSON object                 | `Ok(record)`                            |
//! | 2xx write with `success: false`  | `FetchError::Rejected`                  |
//! | 2xx, anything else               | `FetchError::Unavailable` (malformed)   |
//! | 401                              | `FetchError::Unauthenticated`           |
//! | 403                              | `FetchError::Forbidden`                 |
//! | other status / network failure   | `FetchError::Unavailable`               |
//!
//! The server's `error` string, when present, travels as the failure reason. Nothing is
//! cached.

use crate::config::RetryPolicy;
use crate::constants::{CREATE_SEGMENT, DEFAULT_REJECTION};
use crate::error::{FetchError, FetchResult};
use crate::record::Record;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use clinic_types::Identifier;
use serde_json::Value;
use std::rc::Rc;

/// A collection endpoint and the name of the field its payload lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
    field: String,
}

impl Endpoint {
    /// `path` is relative to the API base and ends with `/` (`pacientes/`).
    pub fn new(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field: field.into(),
        }
    }

    /// The single-item endpoint beneath this collection (`pacientes/12/` reading `paciente`).
    pub fn item(&self, id: &Identifier, field: impl Into<String>) -> Endpoint {
        Endpoint {
            path: format!("{}{}/", self.path, id),
            field: field.into(),
        }
    }

    /// The create endpoint of this collection (`pacientes/crear/`).
    pub fn create(&self) -> Endpoint {
        Endpoint {
            path: format!("{}{}", self.path, CREATE_SEGMENT),
            field: self.field.clone(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Ordered query filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// A decoded 2xx body and the status it came with.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub status: u16,
    pub body: Record,
}

impl Document {
    /// A body that decoded but lacks what the caller expected.
    pub fn malformed(&self, detail: impl std::fmt::Display) -> FetchError {
        FetchError::malformed(self.status, detail)
    }
}

/// Backend access shared by every controller of a page.
pub struct ApiClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reads a whole response body. Detail pages use this to reach sibling fields
    /// (`citas` next to `paciente`).
    ///
    /// Transient failures are retried per the configured [`RetryPolicy`].
    pub async fn fetch_document(&self, path: &str, query: &Query) -> FetchResult<Document> {
        let mut attempt = 1;
        loop {
            let request = ApiRequest::get(path, query.pairs().to_vec());
            let result = match self.transport.send(request).await {
                Ok(response) => interpret(&response).map(|body| Document {
                    status: response.status,
                    body,
                }),
                Err(err) => Err(FetchError::from(err)),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts() => {
                    tracing::warn!(
                        path,
                        attempt,
                        error = %err,
                        "transient read failure, retrying"
                    );
                    attempt += 1;
                    if !self.retry.backoff().is_zero() {
                        tokio::time::sleep(self.retry.backoff()).await;
                    }
                }
                other => return other,
            }
        }
    }

    /// Reads `{ <field>: [Record, ...] }`. An explicit `null` reads as an empty collection.
    pub async fn fetch_collection(
        &self,
        endpoint: &Endpoint,
        query: &Query,
    ) -> FetchResult<Vec<Record>> {
        let document = self.fetch_document(endpoint.path(), query).await?;
        match document.body.get(endpoint.field()) {
            Some(Value::Array(items)) => {
                let records: Vec<Record> = items
                    .iter()
                    .filter_map(|item| Record::from_value(item.clone()))
                    .collect();
                if records.len() < items.len() {
                    tracing::warn!(
                        path = endpoint.path(),
                        skipped = items.len() - records.len(),
                        "dropping collection entries that are not objects"
                    );
                }
                Ok(records)
            }
            Some(Value::Null) => Ok(Vec::new()),
            Some(_) => Err(document.malformed(format!("{} is not a list", endpoint.field()))),
            None => Err(document.malformed(format!("missing field {}", endpoint.field()))),
        }
    }

    /// Reads `{ <field>: Record }`.
    pub async fn fetch_item(&self, endpoint: &Endpoint) -> FetchResult<Record> {
        let document = self.fetch_document(endpoint.path(), &Query::new()).await?;
        document
            .body
            .record(endpoint.field())
            .ok_or_else(|| document.malformed(format!("missing object {}", endpoint.field())))
    }

    /// Posts `payload` and returns the response body (the created record or the
    /// `{ success, ... }` envelope). Never retried.
    pub async fn submit(&self, endpoint: &Endpoint, payload: &Value) -> FetchResult<Record> {
        self.post(endpoint.path(), payload).await
    }

    /// Posts to an arbitrary path, with the same status mapping as [`ApiClient::submit`].
    pub async fn post(&self, path: &str, payload: &Value) -> FetchResult<Record> {
        let response = self
            .transport
            .send(ApiRequest::post(path, payload.clone()))
            .await?;
        let body = interpret(&response)?;

        if body.bool("success") == Some(false) {
            return Err(FetchError::Rejected {
                reason: body
                    .text("error")
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_owned()),
            });
        }

        tracing::debug!(path, status = response.status, "write accepted");
        Ok(body)
    }
}

/// Maps a raw response to a record or the error taxonomy.
pub(crate) fn interpret(response: &ApiResponse) -> FetchResult<Record> {
    match response.status {
        401 => Err(FetchError::Unauthenticated),
        403 => Err(FetchError::Forbidden {
            reason: error_reason(&response.body),
        }),
        _ if response.is_success() => {
            let value: Value = serde_json::from_str(&response.body)
                .map_err(|e| FetchError::malformed(response.status, e))?;
            Record::from_value(value)
                .ok_or_else(|| FetchError::malformed(response.status, "body is not an object"))
        }
        status => Err(FetchError::Unavailable {
            status: Some(status),
            reason: error_reason(&response.body),
        }),
    }
}

pub(crate) fn error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(Record::from_value)
        .and_then(|record| record.text("error"))
}

/// One collection endpoint bound to a client.
pub struct RemoteResource<T> {
    api: Rc<ApiClient<T>>,
    endpoint: Endpoint,
}

impl<T> Clone for RemoteResource<T> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<T: Transport> RemoteResource<T> {
    pub fn new(api: Rc<ApiClient<T>>, endpoint: Endpoint) -> Self {
        Self { api, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn api(&self) -> &Rc<ApiClient<T>> {
        &self.api
    }

    pub async fn fetch_collection(&self, query: &Query) -> FetchResult<Vec<Record>> {
        self.api.fetch_collection(&self.endpoint, query).await
    }

    /// Posts to this collection's create endpoint.
    pub async fn submit(&self, payload: &Value) -> FetchResult<Record> {
        self.api.submit(&self.endpoint.create(), payload).await
    }

    /// Reads one item beneath this collection.
    pub async fn fetch_item(&self, id: &Identifier, field: &str) -> FetchResult<Record> {
        self.api.fetch_item(&self.endpoint.item(id, field)).await
    }

    /// Reads the whole body of one item, for detail views with sibling collections.
    pub async fn fetch_item_document(&self, id: &Identifier) -> FetchResult<Document> {
        let item = self.endpoint.item(id, self.endpoint.field());
        self.api.fetch_document(item.path(), &Query::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::time::Duration;

    fn client(transport: &Rc<ScriptedTransport>) -> ApiClient<Rc<ScriptedTransport>> {
        ApiClient::new(Rc::clone(transport), RetryPolicy::single_attempt())
    }

    #[tokio::test]
    async fn collection_is_extracted_from_named_field() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get(
            "sedes/",
            200,
            json!({"sedes": [{"id": 1, "nombre": "Norte"}, {"id": 2, "nombre": "Sur"}]}),
        );

        let sedes = client(&transport)
            .fetch_collection(&Endpoint::new("sedes/", "sedes"), &Query::new())
            .await
            .expect("fetch should succeed");

        assert_eq!(sedes.len(), 2);
        assert_eq!(sedes[1].text("nombre").as_deref(), Some("Sur"));
    }

    #[tokio::test]
    async fn query_filters_are_sent() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("departamentos/", 200, json!({"departamentos": []}));

        client(&transport)
            .fetch_collection(
                &Endpoint::new("departamentos/", "departamentos"),
                &Query::new().with("sede_id", "S1"),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(
            requests[0].query,
            vec![("sede_id".to_owned(), "S1".to_owned())]
        );
    }

    #[tokio::test]
    async fn status_codes_map_to_taxonomy() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("perfil/", 401, json!({"error": "No autenticado"}));
        transport.on_get(
            "auditoria/accesos/",
            403,
            json!({"error": "No tiene permisos para ver auditoría"}),
        );
        transport.on_get("citas/", 500, json!({"error": "Error al consultar citas"}));
        transport.on_get("historias/", 502, "<html>bad gateway</html>");
        let api = client(&transport);

        assert_eq!(
            api.fetch_item(&Endpoint::new("perfil/", "perfil")).await,
            Err(FetchError::Unauthenticated)
        );
        assert_eq!(
            api.fetch_collection(&Endpoint::new("auditoria/accesos/", "auditoria"), &Query::new())
                .await,
            Err(FetchError::Forbidden {
                reason: Some("No tiene permisos para ver auditoría".into())
            })
        );
        assert_eq!(
            api.fetch_collection(&Endpoint::new("citas/", "citas"), &Query::new())
                .await,
            Err(FetchError::Unavailable {
                status: Some(500),
                reason: Some("Error al consultar citas".into())
            })
        );
        assert_eq!(
            api.fetch_collection(&Endpoint::new("historias/", "historias"), &Query::new())
                .await,
            Err(FetchError::Unavailable {
                status: Some(502),
                reason: None
            })
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_unavailable() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("sedes/", 200, "not json");
        transport.on_get("medicos/", 200, json!({"otra_cosa": []}));
        let api = client(&transport);

        let err = api
            .fetch_collection(&Endpoint::new("sedes/", "sedes"), &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Unavailable {
                status: Some(200),
                ..
            }
        ));

        let err = api
            .fetch_collection(&Endpoint::new("medicos/", "medicos"), &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "malformed response: missing field medicos");
    }

    #[tokio::test]
    async fn malformed_body_keeps_its_success_status() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("equipamiento/", 201, json!({"equipos": []}));
        transport.on_get("perfil/", 203, json!({"otro": {}}));
        let api = client(&transport);

        let err = api
            .fetch_collection(&Endpoint::new("equipamiento/", "equipamiento"), &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(201));

        let err = api
            .fetch_item(&Endpoint::new("perfil/", "perfil"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(203));
        assert_eq!(err.to_string(), "malformed response: missing object perfil");
    }

    #[tokio::test]
    async fn non_object_entries_are_skipped() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get(
            "sedes/",
            200,
            json!({"sedes": [{"id": 1}, "Sede Sur", 7, null, {"id": 2}]}),
        );

        let sedes = client(&transport)
            .fetch_collection(&Endpoint::new("sedes/", "sedes"), &Query::new())
            .await
            .unwrap();
        assert_eq!(sedes.len(), 2);
        assert_eq!(sedes[1].display("id"), "2");
    }

    #[tokio::test]
    async fn null_collection_is_empty() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("historias/", 200, json!({"historias": null}));

        let items = client(&transport)
            .fetch_collection(&Endpoint::new("historias/", "historias"), &Query::new())
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn network_failure_is_unavailable_without_status() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.fail_get("sedes/", crate::error::TransportError::Timeout);

        let err = client(&transport)
            .fetch_collection(&Endpoint::new("sedes/", "sedes"), &Query::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Unavailable {
                status: None,
                reason: Some("request timed out".into())
            }
        );
    }

    #[tokio::test]
    async fn submit_success_false_is_rejected_verbatim() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_post("citas/crear/", 200, json!({"success": false, "error": "X"}));

        let resource = RemoteResource::new(
            Rc::new(client(&transport)),
            Endpoint::new("citas/", "citas"),
        );
        let err = resource.submit(&json!({"motivo": "control"})).await.unwrap_err();
        assert_eq!(err, FetchError::Rejected { reason: "X".into() });
    }

    #[tokio::test]
    async fn submit_returns_created_body() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_post("citas/crear/", 200, json!({"success": true, "id_cita": 41}));

        let resource = RemoteResource::new(
            Rc::new(client(&transport)),
            Endpoint::new("citas/", "citas"),
        );
        let created = resource.submit(&json!({})).await.unwrap();
        assert_eq!(created.text("id_cita").as_deref(), Some("41"));
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reads_retry_transient_failures_only() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get_once("sedes/", 503, json!({"error": "busy"}));
        transport.on_get("sedes/", 200, json!({"sedes": [{"id": 1}]}));
        transport.on_get("perfil/", 404, json!({"error": "Perfil no encontrado"}));

        let api = ApiClient::new(
            Rc::clone(&transport),
            RetryPolicy::new(3, Duration::from_millis(100)).unwrap(),
        );

        let sedes = api
            .fetch_collection(&Endpoint::new("sedes/", "sedes"), &Query::new())
            .await
            .expect("second attempt should succeed");
        assert_eq!(sedes.len(), 1);
        assert_eq!(transport.request_count("sedes/"), 2);

        let err = api
            .fetch_item(&Endpoint::new("perfil/", "perfil"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.request_count("perfil/"), 1);
    }

    #[tokio::test]
    async fn writes_are_never_retried() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_post("equipamiento/crear/", 503, json!({"error": "busy"}));

        let api = ApiClient::new(
            Rc::clone(&transport),
            RetryPolicy::new(3, Duration::ZERO).unwrap(),
        );
        let err = api
            .submit(&Endpoint::new("equipamiento/crear/", "equipamiento"), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "busy");
        assert_eq!(transport.request_count("equipamiento/crear/"), 1);
    }

    #[test]
    fn endpoints_derive_item_and_create_paths() {
        let patients = Endpoint::new("pacientes/", "pacientes");
        let item = patients.item(&Identifier::new("12").unwrap(), "paciente");
        assert_eq!(item.path(), "pacientes/12/");
        assert_eq!(item.field(), "paciente");
        assert_eq!(patients.create().path(), "pacientes/crear/");
    }
}
