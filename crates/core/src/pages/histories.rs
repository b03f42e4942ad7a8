//! Clinical histories: list and per-history detail with every appointment's diagnosis and
//! prescriptions.

use super::{DetailLoader, Listing, PageContext, TableSpec, LIST_PANEL};
use crate::constants::HISTORIES_PATH;
use crate::error::{ClientResult, NavigationError};
use crate::panels::{LoadPolicy, NavigationOutcome, PanelContent, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Cell, DetailView, TableView};
use crate::resource::Query;
use crate::transport::Transport;
use clinic_types::Identifier;

pub const DETAIL_PANEL: &str = "detail";

const NO_DIAGNOSIS: &str = "Sin Diagnóstico";
const NO_PRESCRIPTIONS: &str = "Ninguno";
const PRESCRIPTION_SEPARATOR: &str = " || ";

fn row(history: &Record) -> Vec<Cell> {
    vec![
        Cell::field(history, "cod_hist"),
        Cell::field(history, "paciente"),
        Cell::field(history, "documento"),
        Cell::field(history, "fecha_registro"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &["Código", "Paciente", "Documento", "Fecha de registro"],
    empty: "No hay historias clínicas registradas",
    row,
};

/// `medicamento (dosis)` entries joined by ` || `, or `Ninguno`.
fn prescriptions_text(cita: &Record) -> String {
    let prescriptions = cita.records("prescripciones").unwrap_or_default();
    if prescriptions.is_empty() {
        return NO_PRESCRIPTIONS.to_owned();
    }
    prescriptions
        .iter()
        .map(|p| format!("{} ({})", p.display("medicamento"), p.display("dosis")))
        .collect::<Vec<_>>()
        .join(PRESCRIPTION_SEPARATOR)
}

fn diagnosis_text(cita: &Record) -> String {
    match cita.record("diagnostico") {
        Some(diagnosis) => diagnosis.display("enfermedad"),
        None => NO_DIAGNOSIS.to_owned(),
    }
}

fn visit_row(cita: &Record) -> Vec<Cell> {
    vec![
        Cell::field(cita, "id_cita"),
        Cell::field(cita, "medico"),
        Cell::text(diagnosis_text(cita)),
        Cell::text(prescriptions_text(cita)),
    ]
}

fn detail(body: &Record) -> Option<DetailView> {
    let history = body.record("historia")?;
    let visits = body.records("citas").unwrap_or_default();

    let mut view = DetailView::new(format!("Historia #{}", history.display("cod_hist")))
        .field("Paciente", history.display("paciente"))
        .field("Documento", history.display("documento"))
        .field("Fecha de registro", history.display("fecha_registro"));

    // The summary block describes the first appointment only.
    if let Some(first) = visits.first() {
        let diagnosis = first.record("diagnostico").unwrap_or_default();
        view = view
            .field("Cita", format!("#{}", first.display("id_cita")))
            .field("Médico", first.display("medico"))
            .field("Sede", first.display("sede"))
            .field("Departamento", first.display("departamento"))
            .field("Enfermedad", diagnosis.display("enfermedad"))
            .field("Observaciones", diagnosis.display("observaciones"));
    }

    Some(view.table(
        "Citas",
        TableView::from_records(
            &["Cita", "Médico", "Diagnóstico", "Prescripciones"],
            &visits,
            "No hay registros",
            visit_row,
        ),
    ))
}

pub struct HistoriesPage<T: Transport> {
    listing: Listing<T, DetailLoader<T>>,
}

impl<T: Transport> HistoriesPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let resource = ctx.resource(HISTORIES_PATH, "historias");
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(LIST_PANEL)?.with_title("Historias clínicas"),
                PanelSpec::new(DETAIL_PANEL)?
                    .with_parent(LIST_PANEL)?
                    .with_title("Detalle de la historia")
                    .with_load(LoadPolicy::OnIdentifier),
            ],
            DetailLoader::new(resource.clone(), detail),
        )?;
        Ok(Self {
            listing: Listing::new(resource, TABLE, panels),
        })
    }

    pub async fn load(&self) -> TableView {
        self.listing.load(Query::new()).await
    }

    pub async fn show_detail(&self, id: Identifier) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(DETAIL_PANEL, Some(id)).await
    }

    pub async fn show_list(&self) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().back().await
    }

    pub fn detail(&self) -> PanelContent<DetailView> {
        self.listing
            .panels()
            .content(DETAIL_PANEL)
            .unwrap_or(PanelContent::Blank)
    }

    pub fn visible_panel(&self) -> String {
        self.listing.panels().visible().to_string()
    }
}
