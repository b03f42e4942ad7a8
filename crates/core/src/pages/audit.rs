//! Access audit log. Only some roles may read it; the rest see a permission message in place
//! of the table.

use super::{PageContext, TableSpec};
use crate::constants::{AUDIT_ACCESS_PATH, LOAD_FAILURE};
use crate::error::{FetchError, UserSignal};
use crate::record::Record;
use crate::render::{Cell, TableView};
use crate::resource::{Query, RemoteResource};
use crate::transport::Transport;

pub const AUDIT_FORBIDDEN: &str = "No tiene permisos para ver auditoría";

fn row(entry: &Record) -> Vec<Cell> {
    vec![
        Cell::field(entry, "fecha"),
        Cell::field(entry, "empleado"),
        Cell::field(entry, "rol"),
        Cell::field(entry, "accion"),
        Cell::field(entry, "tabla"),
        Cell::field(entry, "registro_id"),
        Cell::field(entry, "ip"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &["Fecha", "Empleado", "Rol", "Acción", "Tabla", "Registro", "IP"],
    empty: "No hay registros de auditoría",
    row,
};

fn signal(err: &FetchError) -> UserSignal {
    match err {
        FetchError::Unauthenticated => UserSignal::RedirectToLogin,
        FetchError::Forbidden { .. } => UserSignal::PermissionDenied(AUDIT_FORBIDDEN.to_owned()),
        _ => UserSignal::Inline(LOAD_FAILURE.to_owned()),
    }
}

pub struct AuditPage<T> {
    resource: RemoteResource<T>,
}

impl<T: Transport> AuditPage<T> {
    pub fn new(ctx: &PageContext<T>) -> Self {
        Self {
            resource: ctx.resource(AUDIT_ACCESS_PATH, "auditoria"),
        }
    }

    pub async fn load(&self) -> TableView {
        match self.resource.fetch_collection(&Query::new()).await {
            Ok(records) => TABLE.render(&records),
            Err(err) => {
                tracing::debug!(error = %err, "audit log load failed");
                TableView::failed(TABLE.columns, signal(&err))
            }
        }
    }
}
