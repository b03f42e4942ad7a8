//! Patient search, registration and detail with visit history.

use super::{DetailLoader, Listing, PageContext, TableSpec, LIST_PANEL};
use crate::cascade::{CascadeFormController, FieldKind, FieldSpec};
use crate::constants::PATIENTS_PATH;
use crate::error::{ClientResult, NavigationError, SubmitError, ValidationError};
use crate::panels::{LoadPolicy, NavigationOutcome, PanelContent, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Cell, DetailView, TableView};
use crate::resource::Query;
use crate::transport::Transport;
use clinic_types::Identifier;
use std::rc::Rc;

pub const CREATE_PANEL: &str = "create";
pub const DETAIL_PANEL: &str = "detail";

/// Registration fields, in form order. The first three are mandatory.
pub const REGISTRATION_FIELDS: [(&str, FieldKind, bool); 13] = [
    ("nom_persona", FieldKind::Text, true),
    ("apellido_persona", FieldKind::Text, true),
    ("num_doc", FieldKind::Text, true),
    ("tipo_doc", FieldKind::Text, false),
    ("fecha_nac", FieldKind::Date, false),
    ("genero", FieldKind::Text, false),
    ("dir_persona", FieldKind::Text, false),
    ("tel_persona", FieldKind::Text, false),
    ("email_persona", FieldKind::Email, false),
    ("ciudad_residencia", FieldKind::Text, false),
    ("tipo_sangre", FieldKind::Text, false),
    ("alergias", FieldKind::Text, false),
    ("contacto_emergencia", FieldKind::Text, false),
];

fn full_name(patient: &Record) -> String {
    patient
        .joined(&["nombre", "apellido"])
        .unwrap_or_else(|| patient.display("nombre"))
}

fn row(patient: &Record) -> Vec<Cell> {
    vec![
        Cell::field(patient, "cod_pac"),
        Cell::text(full_name(patient)),
        Cell::field(patient, "cedula"),
        Cell::field(patient, "telefono"),
        Cell::field(patient, "email"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &["Código", "Nombre", "Documento", "Teléfono", "Email"],
    empty: "No se encontraron pacientes",
    row,
};

fn visit_row(cita: &Record) -> Vec<Cell> {
    vec![
        Cell::field(cita, "id_cita"),
        Cell::field(cita, "fecha_hora"),
        Cell::field(cita, "tipo_servicio"),
        Cell::field(cita, "estado"),
        Cell::field(cita, "medico"),
    ]
}

fn detail(body: &Record) -> Option<DetailView> {
    let patient = body.record("paciente")?;
    let visits = body.records("citas").unwrap_or_default();
    Some(
        DetailView::new(full_name(&patient))
            .field("Documento", patient.display("cedula"))
            .field("Email", patient.display("email"))
            .field("Teléfono", patient.display("telefono"))
            .field("Dirección", patient.display("direccion"))
            .table(
                "Historial de citas",
                TableView::from_records(
                    &["Cita", "Fecha", "Servicio", "Estado", "Médico"],
                    &visits,
                    "Sin citas registradas",
                    visit_row,
                ),
            ),
    )
}

pub struct PatientsPage<T: Transport> {
    listing: Rc<Listing<T, DetailLoader<T>>>,
    registration: CascadeFormController<T>,
}

impl<T: Transport + 'static> PatientsPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let resource = ctx.resource(PATIENTS_PATH, "pacientes");
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(LIST_PANEL)?.with_title("Pacientes"),
                PanelSpec::new(CREATE_PANEL)?
                    .with_parent(LIST_PANEL)?
                    .with_title("Registrar paciente"),
                PanelSpec::new(DETAIL_PANEL)?
                    .with_parent(LIST_PANEL)?
                    .with_title("Detalle del paciente")
                    .with_load(LoadPolicy::OnIdentifier),
            ],
            DetailLoader::new(resource.clone(), detail),
        )?;
        let listing = Rc::new(Listing::new(resource.clone(), TABLE, panels));

        let mut registration = CascadeFormController::new(resource);
        for (name, kind, required) in REGISTRATION_FIELDS {
            registration.add_field(if required {
                FieldSpec::required(name, kind)
            } else {
                FieldSpec::optional(name, kind)
            });
        }
        registration.set_post_submit(listing.clone());

        Ok(Self {
            listing,
            registration,
        })
    }

    /// Lists patients, filtered by `busqueda` when a search term is given.
    pub async fn search(&self, term: Option<&str>) -> TableView {
        let query = match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => Query::new().with("busqueda", term),
            None => Query::new(),
        };
        self.listing.load(query).await
    }

    pub fn table(&self) -> TableView {
        self.listing.table()
    }

    pub async fn show_create(&self) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(CREATE_PANEL, None).await
    }

    pub async fn show_detail(&self, id: Identifier) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(DETAIL_PANEL, Some(id)).await
    }

    pub async fn show_list(&self) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(LIST_PANEL, None).await
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

    pub fn set_field(&self, name: &str, value: &str) -> Result<(), ValidationError> {
        self.registration.set_field(name, value)
    }

    pub fn field(&self, name: &str) -> Option<String> {
        self.registration.field(name)
    }

    /// Registers the patient; on success the list is shown again and reloaded.
    pub async fn register(&self) -> Result<Record, SubmitError> {
        self.registration.submit().await
    }
}
