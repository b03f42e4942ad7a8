//! Appointment list with status filter and a detail panel.

use super::{DetailLoader, Listing, PageContext, TableSpec, LIST_PANEL};
use crate::constants::APPOINTMENTS_PATH;
use crate::error::{ClientResult, NavigationError};
use crate::panels::{LoadPolicy, NavigationOutcome, PanelContent, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Badge, Cell, DetailView, TableView, Tone};
use crate::resource::Query;
use crate::transport::Transport;
use clinic_types::Identifier;
use std::rc::Rc;

pub const DETAIL_PANEL: &str = "detail";

/// Which appointments the list shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppointmentFilter {
    #[default]
    All,
    /// Upper-cased status (`PROGRAMADA`, `COMPLETADA`, `CANCELADA`).
    Status(String),
}

impl AppointmentFilter {
    /// `todas` (or blank) shows everything; any other value filters by that status.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("todas") {
            AppointmentFilter::All
        } else {
            AppointmentFilter::Status(value.to_uppercase())
        }
    }

    fn query(&self) -> Query {
        match self {
            AppointmentFilter::All => Query::new(),
            AppointmentFilter::Status(status) => Query::new().with("estado", status.clone()),
        }
    }
}

pub fn status_badge(status: Option<String>) -> Badge {
    let tone = match status.as_deref() {
        Some("COMPLETADA") => Tone::Success,
        Some("CANCELADA") => Tone::Danger,
        Some("PROGRAMADA") => Tone::Warning,
        _ => Tone::Secondary,
    };
    Badge::new(status.unwrap_or_else(|| "-".to_owned()), tone)
}

fn row(cita: &Record) -> Vec<Cell> {
    vec![
        Cell::field(cita, "id_cita"),
        Cell::field(cita, "fecha_hora"),
        Cell::field(cita, "paciente"),
        Cell::field(cita, "tipo_servicio"),
        Cell::Badge(status_badge(cita.text("estado"))),
        Cell::field(cita, "motivo"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &["Id", "Fecha", "Paciente", "Servicio", "Estado", "Motivo"],
    empty: "No hay citas registradas",
    row,
};

fn detail(body: &Record) -> Option<DetailView> {
    let cita = body.record("cita")?;
    Some(
        DetailView::new(format!("Cita #{}", cita.display("id_cita")))
            .field("Paciente", cita.display("paciente"))
            .field("Médico", cita.display("medico"))
            .field("Sede", cita.display("sede"))
            .field("Departamento", cita.display("departamento"))
            .field("Fecha", cita.display("fecha_hora"))
            .field("Servicio", cita.display("tipo_servicio"))
            .field("Estado", cita.display("estado"))
            .field("Motivo", cita.display("motivo")),
    )
}

pub type AppointmentListing<T> = Listing<T, DetailLoader<T>>;

pub struct AppointmentsPage<T: Transport> {
    listing: Rc<AppointmentListing<T>>,
}

impl<T: Transport> AppointmentsPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let resource = ctx.resource(APPOINTMENTS_PATH, "citas");
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(LIST_PANEL)?.with_title("Citas"),
                PanelSpec::new(DETAIL_PANEL)?
                    .with_parent(LIST_PANEL)?
                    .with_title("Detalle de la cita")
                    .with_load(LoadPolicy::OnIdentifier),
            ],
            DetailLoader::new(resource.clone(), detail),
        )?;
        Ok(Self {
            listing: Rc::new(Listing::new(resource, TABLE, panels)),
        })
    }

    /// The list, shared with forms that return here after creating an appointment.
    pub fn listing(&self) -> Rc<AppointmentListing<T>> {
        Rc::clone(&self.listing)
    }

    pub async fn load(&self, filter: &AppointmentFilter) -> TableView {
        self.listing.load(filter.query()).await
    }

    pub fn table(&self) -> TableView {
        self.listing.table()
    }

    pub async fn show_detail(&self, id: Identifier) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(DETAIL_PANEL, Some(id)).await
    }

    /// Back to the list; the appointment id is dropped from the navigation context.
    pub async fn back(&self) -> Result<NavigationOutcome, NavigationError> {
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

    pub fn selected(&self) -> Option<Identifier> {
        self.listing.panels().context()
    }
}
