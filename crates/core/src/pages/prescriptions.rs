//! Read-only prescription list.

use super::{PageContext, TableSpec};
use crate::constants::{LOAD_FAILURE, PRESCRIPTIONS_PATH};
use crate::error::{FetchError, UserSignal};
use crate::record::Record;
use crate::render::{Cell, TableView};
use crate::resource::{Query, RemoteResource};
use crate::transport::Transport;

fn row(prescription: &Record) -> Vec<Cell> {
    vec![
        Cell::field(prescription, "fecha_emision"),
        Cell::field(prescription, "paciente"),
        Cell::field(prescription, "medico"),
        Cell::field(prescription, "medicamento"),
        Cell::field(prescription, "dosis"),
        Cell::field(prescription, "frecuencia"),
        Cell::field(prescription, "duracion_dias"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &[
        "Fecha", "Paciente", "Médico", "Medicamento", "Dosis", "Frecuencia", "Días",
    ],
    empty: "No hay prescripciones registradas",
    row,
};

pub struct PrescriptionsPage<T> {
    resource: RemoteResource<T>,
}

impl<T: Transport> PrescriptionsPage<T> {
    pub fn new(ctx: &PageContext<T>) -> Self {
        Self {
            resource: ctx.resource(PRESCRIPTIONS_PATH, "prescripciones"),
        }
    }

    /// An expired session redirects; every other failure shows the generic load error.
    pub async fn load(&self) -> TableView {
        match self.resource.fetch_collection(&Query::new()).await {
            Ok(records) => TABLE.render(&records),
            Err(FetchError::Unauthenticated) => {
                TableView::failed(TABLE.columns, UserSignal::RedirectToLogin)
            }
            Err(err) => {
                tracing::debug!(error = %err, "prescriptions load failed");
                TableView::failed(TABLE.columns, UserSignal::Inline(LOAD_FAILURE.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::context;
    use crate::render::TableBody;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use std::rc::Rc;

    #[tokio::test]
    async fn rows_render_with_dashes() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get(
            "prescripciones/",
            200,
            json!({"prescripciones": [{
                "fecha_emision": "2025-02-01",
                "paciente": "Ana Ruiz",
                "medicamento": "Amoxicilina",
                "dosis": "500mg",
                "duracion_dias": 7
            }]}),
        );
        let page = PrescriptionsPage::new(&context(&transport, "Medico"));

        let table = page.load().await;
        let row = &table.rows()[0];
        assert_eq!(row[2], Cell::text("-"));
        assert_eq!(row[5], Cell::text("-"));
        assert_eq!(row[6], Cell::text("7"));
    }

    #[tokio::test]
    async fn server_errors_show_generic_text() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get("prescripciones/", 500, json!({"error": "relation does not exist"}));
        let page = PrescriptionsPage::new(&context(&transport, "Medico"));

        let table = page.load().await;
        assert_eq!(table.failure(), Some(&UserSignal::Inline(LOAD_FAILURE.into())));
    }

    #[tokio::test]
    async fn empty_and_expired_are_distinct() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get_once("prescripciones/", 200, json!({"prescripciones": []}));
        transport.on_get("prescripciones/", 401, json!({"error": "No autenticado"}));
        let page = PrescriptionsPage::new(&context(&transport, "Medico"));

        assert_eq!(
            page.load().await.body,
            TableBody::Empty("No hay prescripciones registradas".into())
        );
        assert_eq!(page.load().await.failure(), Some(&UserSignal::RedirectToLogin));
    }
}
