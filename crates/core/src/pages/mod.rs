//! Page controllers.
//!
//! Each page of the clinic front end is a controller built from the shared pieces: a
//! [`RemoteResource`] per collection, a [`ViewPanelSwitcher`] for its panels and, for forms, a
//! [`CascadeFormController`](crate::cascade::CascadeFormController). Pages return view models
//! from [`crate::render`]; failures are turned into [`UserSignal`]s, never swallowed.
//!
//! Every page is constructed from a [`PageContext`], which carries the logged-in session. There
//! is no page without a session.

pub mod appointments;
pub mod audit;
pub mod dashboard;
pub mod equipment;
pub mod histories;
pub mod new_appointment;
pub mod patients;
pub mod pharmacy;
pub mod prescriptions;
pub mod profile;
pub mod reports;

use crate::cascade::PostSubmit;
use crate::constants::LOAD_FAILURE;
use crate::error::{FetchError, FetchResult, UserSignal};
use crate::panels::{PanelLoader, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Cell, DetailView, TableView};
use crate::resource::{ApiClient, Endpoint, Query, RemoteResource};
use crate::session::Session;
use crate::transport::Transport;
use async_trait::async_trait;
use clinic_types::{Identifier, PanelName};
use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

/// What every page is built from: the shared client and the session it runs under.
pub struct PageContext<T> {
    api: Rc<ApiClient<T>>,
    session: Rc<Session>,
}

impl<T> Clone for PageContext<T> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            session: Rc::clone(&self.session),
        }
    }
}

impl<T: Transport> PageContext<T> {
    pub fn new(api: Rc<ApiClient<T>>, session: Rc<Session>) -> Self {
        Self { api, session }
    }

    pub fn api(&self) -> &Rc<ApiClient<T>> {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn resource(&self, path: &str, field: &str) -> RemoteResource<T> {
        RemoteResource::new(Rc::clone(&self.api), Endpoint::new(path, field))
    }
}

/// Columns, empty-state text and row renderer of one table.
#[derive(Clone, Copy)]
pub struct TableSpec {
    pub columns: &'static [&'static str],
    pub empty: &'static str,
    pub row: fn(&Record) -> Vec<Cell>,
}

impl TableSpec {
    pub fn render(&self, records: &[Record]) -> TableView {
        TableView::from_records(self.columns, records, self.empty, self.row)
    }

    pub fn failed(&self, err: &FetchError) -> TableView {
        TableView::failed(self.columns, table_signal(err))
    }
}

/// Signal shown in place of a table. A failure without a server message gets the generic
/// load-failure text instead of a bare status line.
pub fn table_signal(err: &FetchError) -> UserSignal {
    match err {
        FetchError::Unavailable { reason: None, .. } => UserSignal::Inline(LOAD_FAILURE.to_owned()),
        other => other.user_signal(),
    }
}

/// Fetches a collection into a table; a failure becomes the table's failed state.
pub async fn load_table<T: Transport>(
    resource: &RemoteResource<T>,
    query: &Query,
    spec: &TableSpec,
) -> TableView {
    match resource.fetch_collection(query).await {
        Ok(records) => spec.render(&records),
        Err(err) => {
            tracing::debug!(path = resource.endpoint().path(), error = %err, "table load failed");
            spec.failed(&err)
        }
    }
}

/// Name of the panel holding a listing's table.
pub const LIST_PANEL: &str = "list";

/// A reloadable list and the panel set it lives in.
///
/// The list remembers its last query so a reload (after a create, for instance) shows the same
/// filter. Loads are tagged with a generation; an older load finishing late does not overwrite
/// a newer table.
pub struct Listing<T, L: PanelLoader> {
    resource: RemoteResource<T>,
    spec: TableSpec,
    query: RefCell<Query>,
    table: RefCell<TableView>,
    generation: StdCell<u64>,
    panels: ViewPanelSwitcher<L>,
}

impl<T: Transport, L: PanelLoader> Listing<T, L> {
    pub fn new(resource: RemoteResource<T>, spec: TableSpec, panels: ViewPanelSwitcher<L>) -> Self {
        Self {
            resource,
            spec,
            query: RefCell::new(Query::new()),
            table: RefCell::new(spec.render(&[])),
            generation: StdCell::new(0),
            panels,
        }
    }

    pub fn resource(&self) -> &RemoteResource<T> {
        &self.resource
    }

    pub fn panels(&self) -> &ViewPanelSwitcher<L> {
        &self.panels
    }

    pub async fn load(&self, query: Query) -> TableView {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.query.borrow_mut() = query.clone();

        let table = load_table(&self.resource, &query, &self.spec).await;
        if self.generation.get() == generation {
            *self.table.borrow_mut() = table.clone();
        } else {
            tracing::warn!(path = self.resource.endpoint().path(), "discarding stale list");
        }
        table
    }

    /// Loads again with the last query.
    pub async fn reload(&self) -> TableView {
        let query = self.query.borrow().clone();
        self.load(query).await
    }

    pub fn table(&self) -> TableView {
        self.table.borrow().clone()
    }
}

/// After a create: back to the list, then reload it.
#[async_trait(?Send)]
impl<T: Transport, L: PanelLoader> PostSubmit for Listing<T, L> {
    async fn after_submit(&self, _created: &Record) {
        if let Err(err) = self.panels.navigate(LIST_PANEL, None).await {
            tracing::warn!(error = %err, "listing has no list panel");
        }
        self.reload().await;
    }
}

/// Loads a detail panel from the whole body of `<collection>/<id>/`.
pub struct DetailLoader<T> {
    resource: RemoteResource<T>,
    render: fn(&Record) -> Option<DetailView>,
}

impl<T> DetailLoader<T> {
    /// `render` returns `None` when the body lacks the expected record.
    pub fn new(resource: RemoteResource<T>, render: fn(&Record) -> Option<DetailView>) -> Self {
        Self { resource, render }
    }
}

#[async_trait(?Send)]
impl<T: Transport> PanelLoader for DetailLoader<T> {
    type Content = DetailView;

    async fn load(&self, panel: &PanelName, id: Option<&Identifier>) -> FetchResult<DetailView> {
        let Some(id) = id else {
            return Ok(DetailView::default());
        };
        let document = self.resource.fetch_item_document(id).await?;
        (self.render)(&document.body)
            .ok_or_else(|| document.malformed(format!("no record for panel {panel}")))
    }
}

/// Loader for panel sets that never fetch (forms and static tabs).
pub struct StaticPanels;

#[async_trait(?Send)]
impl PanelLoader for StaticPanels {
    type Content = ();

    async fn load(&self, _panel: &PanelName, _id: Option<&Identifier>) -> FetchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::session::SessionUser;
    use crate::testing::ScriptedTransport;
    use clinic_types::Role;

    pub type TestContext = PageContext<Rc<ScriptedTransport>>;

    pub fn context(transport: &Rc<ScriptedTransport>, role: &str) -> TestContext {
        let api = Rc::new(ApiClient::new(
            Rc::clone(transport),
            RetryPolicy::single_attempt(),
        ));
        let session = Session::new(SessionUser {
            employee_id: Identifier::new("4").unwrap(),
            site_id: Some(Identifier::new("1").unwrap()),
            name: "Ana Ruiz".into(),
            role: Some(Role::new(role).unwrap()),
            email: Some("ana@clinica.co".into()),
            site_name: Some("Sede Norte".into()),
        });
        PageContext::new(api, Rc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexplained_failures_use_generic_text() {
        assert_eq!(
            table_signal(&FetchError::Unavailable {
                status: Some(502),
                reason: None
            }),
            UserSignal::Inline(LOAD_FAILURE.into())
        );
        assert_eq!(
            table_signal(&FetchError::Unauthenticated),
            UserSignal::RedirectToLogin
        );
        assert_eq!(
            table_signal(&FetchError::Unavailable {
                status: Some(500),
                reason: Some("Error al consultar citas".into())
            }),
            UserSignal::Inline("Error al consultar citas".into())
        );
    }
}
