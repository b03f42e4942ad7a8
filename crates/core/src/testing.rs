//! Scripted transport for controller tests.
//!
//! Routes are matched in registration order on method, path and (optionally) the exact query.
//! A route registered with a use count stops matching once used up. Unmatched requests get a
//! 404 so a missing script shows up as an `Unavailable` failure instead of a hang.

use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::time::Duration;

/// Anything usable as a scripted response body.
pub trait IntoBody {
    fn into_body(self) -> String;
}

impl IntoBody for Value {
    fn into_body(self) -> String {
        self.to_string()
    }
}

impl IntoBody for &str {
    fn into_body(self) -> String {
        self.to_owned()
    }
}

struct Route {
    method: Method,
    path: String,
    query: Option<Vec<(String, String)>>,
    reply: Result<ApiResponse, TransportError>,
    delay: Duration,
    remaining: Option<usize>,
}

impl Route {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.path == request.path
            && self.remaining != Some(0)
            && self
                .query
                .as_ref()
                .map_or(true, |query| *query == request.query)
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: RefCell<Vec<Route>>,
    log: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, route: Route) {
        self.routes.borrow_mut().push(route);
    }

    fn reply(
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        status: u16,
        body: impl IntoBody,
    ) -> Route {
        Route {
            method,
            path: path.to_owned(),
            query: query.map(|pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect()
            }),
            reply: Ok(ApiResponse::new(status, body.into_body())),
            delay: Duration::ZERO,
            remaining: None,
        }
    }

    pub fn on_get(&self, path: &str, status: u16, body: impl IntoBody) {
        self.push(Self::reply(Method::Get, path, None, status, body));
    }

    /// Answers only the first matching GET.
    pub fn on_get_once(&self, path: &str, status: u16, body: impl IntoBody) {
        let mut route = Self::reply(Method::Get, path, None, status, body);
        route.remaining = Some(1);
        self.push(route);
    }

    /// Answers GETs carrying exactly `query`.
    pub fn on_get_with(&self, path: &str, query: &[(&str, &str)], status: u16, body: impl IntoBody) {
        self.push(Self::reply(Method::Get, path, Some(query), status, body));
    }

    /// Like [`ScriptedTransport::on_get_with`], answering after `delay`.
    pub fn on_get_delayed(
        &self,
        path: &str,
        query: &[(&str, &str)],
        delay: Duration,
        status: u16,
        body: impl IntoBody,
    ) {
        let mut route = Self::reply(Method::Get, path, Some(query), status, body);
        route.delay = delay;
        self.push(route);
    }

    pub fn fail_get(&self, path: &str, error: TransportError) {
        self.push(Route {
            method: Method::Get,
            path: path.to_owned(),
            query: None,
            reply: Err(error),
            delay: Duration::ZERO,
            remaining: None,
        });
    }

    pub fn on_post(&self, path: &str, status: u16, body: impl IntoBody) {
        self.push(Self::reply(Method::Post, path, None, status, body));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.borrow().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.log.borrow().iter().filter(|r| r.path == path).count()
    }

    pub fn post_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.method == Method::Post)
            .count()
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.borrow_mut().push(request.clone());

        let scripted = {
            let mut routes = self.routes.borrow_mut();
            routes
                .iter_mut()
                .find(|route| route.matches(&request))
                .map(|route| {
                    if let Some(remaining) = route.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    (route.reply.clone(), route.delay)
                })
        };

        match scripted {
            Some((reply, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Ok(ApiResponse::new(
                404,
                serde_json::json!({ "error": format!("no scripted route for {}", request.path) })
                    .to_string(),
            )),
        }
    }
}
