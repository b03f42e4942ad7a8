//! Management reports, one tab each. A tab fetches its report the first time it is opened and
//! keeps it afterwards; a failed fetch is tried again on the next visit.

use super::{PageContext, TableSpec};
use crate::constants::{
    LOAD_FAILURE, MISSING_CELL, REPORT_CONSULTATIONS_PATH, REPORT_DISEASES_PATH,
    REPORT_PRESCRIBED_PATH,
};
use crate::error::{ClientResult, FetchError, FetchResult, NavigationError};
use crate::panels::{LoadPolicy, NavigationOutcome, PanelContent, PanelLoader, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Cell, TableView};
use crate::resource::{Query, RemoteResource};
use crate::transport::Transport;
use async_trait::async_trait;
use clinic_types::{Identifier, PanelName};

pub const PRESCRIBED_PANEL: &str = "medicamentos";
pub const CONSULTATIONS_PANEL: &str = "medicos";
pub const DISEASES_PANEL: &str = "enfermedades";

const NO_DATA: &str = "No hay datos disponibles";

/// `YYYY-MM` part of a month timestamp.
fn month(record: &Record) -> Cell {
    match record.text("mes") {
        Some(mes) => Cell::text(mes.chars().take(7).collect::<String>()),
        None => Cell::text(MISSING_CELL),
    }
}

fn count(record: &Record, field: &str) -> Cell {
    Cell::text(record.display_or(field, "0"))
}

fn prescribed_row(r: &Record) -> Vec<Cell> {
    vec![
        Cell::field(r, "sede"),
        Cell::field(r, "medicamento"),
        count(r, "total_prescripciones"),
        count(r, "cantidad_total"),
        month(r),
    ]
}

fn consultations_row(r: &Record) -> Vec<Cell> {
    vec![
        Cell::field(r, "medico"),
        Cell::field(r, "sede"),
        Cell::field(r, "departamento"),
        Cell::text(r.display_or("especialidad", "N/A")),
        count(r, "total_consultas"),
    ]
}

fn diseases_row(r: &Record) -> Vec<Cell> {
    vec![
        Cell::field(r, "sede"),
        Cell::field(r, "enfermedad"),
        count(r, "total_diagnosticos"),
        count(r, "pacientes_afectados"),
        month(r),
    ]
}

const PRESCRIBED_TABLE: TableSpec = TableSpec {
    columns: &["Sede", "Medicamento", "Prescripciones", "Cantidad total", "Mes"],
    empty: NO_DATA,
    row: prescribed_row,
};

const CONSULTATIONS_TABLE: TableSpec = TableSpec {
    columns: &["Médico", "Sede", "Departamento", "Especialidad", "Consultas"],
    empty: NO_DATA,
    row: consultations_row,
};

const DISEASES_TABLE: TableSpec = TableSpec {
    columns: &["Sede", "Enfermedad", "Diagnósticos", "Pacientes", "Mes"],
    empty: NO_DATA,
    row: diseases_row,
};

/// Fetches the report behind each tab.
pub struct ReportLoader<T> {
    reports: Vec<(&'static str, RemoteResource<T>, TableSpec)>,
}

#[async_trait(?Send)]
impl<T: Transport> PanelLoader for ReportLoader<T> {
    type Content = TableView;

    async fn load(&self, panel: &PanelName, _id: Option<&Identifier>) -> FetchResult<TableView> {
        let (_, resource, spec) = self
            .reports
            .iter()
            .find(|(name, _, _)| *name == panel.as_str())
            .ok_or_else(|| FetchError::Unavailable {
                status: None,
                reason: Some(format!("no report behind panel {panel}")),
            })?;
        match resource.fetch_collection(&Query::new()).await {
            Ok(records) => Ok(spec.render(&records)),
            Err(FetchError::Unauthenticated) => Err(FetchError::Unauthenticated),
            Err(err) => {
                tracing::debug!(panel = %panel, error = %err, "report load failed");
                Err(FetchError::Unavailable {
                    status: err.status(),
                    reason: Some(LOAD_FAILURE.to_owned()),
                })
            }
        }
    }
}

pub struct ReportsPage<T: Transport> {
    panels: ViewPanelSwitcher<ReportLoader<T>>,
}

impl<T: Transport> ReportsPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let loader = ReportLoader {
            reports: vec![
                (
                    PRESCRIBED_PANEL,
                    ctx.resource(REPORT_PRESCRIBED_PATH, "medicamentos"),
                    PRESCRIBED_TABLE,
                ),
                (
                    CONSULTATIONS_PANEL,
                    ctx.resource(REPORT_CONSULTATIONS_PATH, "medicos"),
                    CONSULTATIONS_TABLE,
                ),
                (
                    DISEASES_PANEL,
                    ctx.resource(REPORT_DISEASES_PATH, "enfermedades"),
                    DISEASES_TABLE,
                ),
            ],
        };
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(PRESCRIBED_PANEL)?
                    .with_title("Medicamentos recetados")
                    .with_load(LoadPolicy::OnceOnEnter),
                PanelSpec::new(CONSULTATIONS_PANEL)?
                    .with_title("Consultas por médico")
                    .with_load(LoadPolicy::OnceOnEnter),
                PanelSpec::new(DISEASES_PANEL)?
                    .with_title("Enfermedades diagnosticadas")
                    .with_load(LoadPolicy::OnceOnEnter),
            ],
            loader,
        )?;
        Ok(Self { panels })
    }

    /// Opens a report tab, fetching it on first entry.
    pub async fn show_view(&self, name: &str) -> Result<NavigationOutcome, NavigationError> {
        self.panels.navigate(name, None).await
    }

    pub fn visible_panel(&self) -> String {
        self.panels.visible().to_string()
    }

    /// The visible report; blank before its first load.
    pub fn report(&self) -> PanelContent<TableView> {
        self.panels.visible_content()
    }

    /// Drops a tab's cached report so the next visit fetches it again.
    pub fn refresh(&self, name: &str) -> Result<(), NavigationError> {
        self.panels.invalidate(name)
    }
}
