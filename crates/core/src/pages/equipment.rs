//! Medical equipment list and registration.

use super::{Listing, PageContext, StaticPanels, TableSpec, LIST_PANEL};
use crate::cascade::{CascadeFormController, FieldKind, FieldSpec};
use crate::constants::{EQUIPMENT_PATH, MISSING_CELL};
use crate::error::{ClientResult, NavigationError, SubmitError, ValidationError};
use crate::panels::{NavigationOutcome, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Badge, Cell, TableView, Tone};
use crate::resource::Query;
use crate::transport::Transport;
use std::rc::Rc;

pub const CREATE_PANEL: &str = "create";

pub fn status_badge(status: Option<String>) -> Badge {
    let tone = match status.as_deref() {
        Some("Disponible" | "OPERATIVO") => Tone::Success,
        Some("En Mantenimiento" | "MANTENIMIENTO") => Tone::Warning,
        Some("Fuera de Servicio") => Tone::Danger,
        _ => Tone::Secondary,
    };
    Badge::new(status.unwrap_or_else(|| MISSING_CELL.to_owned()), tone)
}

fn row(item: &Record) -> Vec<Cell> {
    vec![
        Cell::field(item, "nombre"),
        Cell::text(
            item.text("marca")
                .or_else(|| item.text("tipo"))
                .unwrap_or_else(|| MISSING_CELL.to_owned()),
        ),
        Cell::field(item, "sede"),
        Cell::field(item, "departamento"),
        Cell::Badge(status_badge(item.text("estado"))),
        Cell::field(item, "ultimo_mantenimiento"),
        Cell::field(item, "responsable"),
    ]
}

const TABLE: TableSpec = TableSpec {
    columns: &[
        "Nombre",
        "Marca",
        "Sede",
        "Departamento",
        "Estado",
        "Último mantenimiento",
        "Responsable",
    ],
    empty: "No hay equipamiento registrado",
    row,
};

pub struct EquipmentPage<T: Transport> {
    listing: Rc<Listing<T, StaticPanels>>,
    registration: CascadeFormController<T>,
}

impl<T: Transport + 'static> EquipmentPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let resource = ctx.resource(EQUIPMENT_PATH, "equipamiento");
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(LIST_PANEL)?.with_title("Equipamiento"),
                PanelSpec::new(CREATE_PANEL)?
                    .with_parent(LIST_PANEL)?
                    .with_title("Registrar equipo"),
            ],
            StaticPanels,
        )?;
        let listing = Rc::new(Listing::new(resource.clone(), TABLE, panels));

        // The backend assigns the department from the session.
        let mut registration = CascadeFormController::new(resource);
        registration.add_field(FieldSpec::required("nom_eq", FieldKind::Text));
        registration.add_field(FieldSpec::optional("marca_modelo", FieldKind::Text));
        registration.add_field(FieldSpec::optional("estado_equipo", FieldKind::Text));
        registration.add_field(FieldSpec::optional("fecha_ultimo_maint", FieldKind::Date));
        registration.set_post_submit(listing.clone());

        Ok(Self {
            listing,
            registration,
        })
    }

    pub async fn load(&self) -> TableView {
        self.listing.load(Query::new()).await
    }

    pub fn table(&self) -> TableView {
        self.listing.table()
    }

    pub async fn show_create(&self) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(CREATE_PANEL, None).await
    }

    pub async fn show_list(&self) -> Result<NavigationOutcome, NavigationError> {
        self.listing.panels().navigate(LIST_PANEL, None).await
    }

    pub fn visible_panel(&self) -> String {
        self.listing.panels().visible().to_string()
    }

    pub fn set_field(&self, name: &str, value: &str) -> Result<(), ValidationError> {
        self.registration.set_field(name, value)
    }

    pub async fn register(&self) -> Result<Record, SubmitError> {
        self.registration.submit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, UserSignal};
    use crate::testing::ScriptedTransport;
    use crate::pages::fixtures::context;
    use serde_json::json;

    #[test]
    fn badges_follow_status() {
        assert_eq!(status_badge(Some("OPERATIVO".into())).tone, Tone::Success);
        assert_eq!(status_badge(Some("Disponible".into())).tone, Tone::Success);
        assert_eq!(status_badge(Some("MANTENIMIENTO".into())).tone, Tone::Warning);
        assert_eq!(status_badge(Some("Fuera de Servicio".into())).tone, Tone::Danger);
        assert_eq!(status_badge(Some("BAJA".into())).tone, Tone::Secondary);
        assert_eq!(status_badge(None), Badge::new("-", Tone::Secondary));
    }

    #[tokio::test]
    async fn brand_falls_back_to_type() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_get(
            "equipamiento/",
            200,
            json!({"equipamiento": [
                {"nombre": "Ecógrafo", "marca": "GE", "estado": "OPERATIVO"},
                {"nombre": "Camilla", "tipo": "Mobiliario"},
                {"nombre": "Monitor"}
            ]}),
        );
        let page = EquipmentPage::new(&context(&transport, "Administrador")).unwrap();

        let table = page.load().await;
        assert_eq!(table.rows()[0][1], Cell::text("GE"));
        assert_eq!(table.rows()[1][1], Cell::text("Mobiliario"));
        assert_eq!(table.rows()[2][1], Cell::text("-"));
    }

    #[tokio::test]
    async fn registration_returns_to_reloaded_list() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_post("equipamiento/crear/", 200, json!({"success": true}));
        transport.on_get(
            "equipamiento/",
            200,
            json!({"equipamiento": [{"nombre": "Desfibrilador", "estado": "Disponible"}]}),
        );
        let page = EquipmentPage::new(&context(&transport, "Administrador")).unwrap();

        page.show_create().await.unwrap();
        page.set_field("nom_eq", "Desfibrilador").unwrap();
        page.set_field("fecha_ultimo_maint", "2025-01-15").unwrap();
        page.register().await.expect("registration should succeed");

        assert_eq!(page.visible_panel(), LIST_PANEL);
        assert_eq!(page.table().rows().len(), 1);
        assert_eq!(transport.request_count("equipamiento/"), 1);
    }

    #[tokio::test]
    async fn refusal_without_reason_uses_default_text() {
        let transport = Rc::new(ScriptedTransport::new());
        transport.on_post("equipamiento/crear/", 200, json!({"success": false}));
        let page = EquipmentPage::new(&context(&transport, "Administrador")).unwrap();

        page.show_create().await.unwrap();
        page.set_field("nom_eq", "Desfibrilador").unwrap();
        let err = page.register().await.unwrap_err();

        assert!(matches!(err, SubmitError::Fetch(FetchError::Rejected { .. })));
        assert_eq!(
            err.user_signal(),
            UserSignal::Inline(crate::constants::DEFAULT_REJECTION.into())
        );
        assert_eq!(page.visible_panel(), CREATE_PANEL);
    }
}
