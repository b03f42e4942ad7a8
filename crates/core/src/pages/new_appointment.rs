//! Booking form: site → department → doctor, plus the patient.

use super::PageContext;
use crate::binder::{SelectorSpec, SelectorView};
use crate::cascade::{CascadeFormController, FieldKind, FieldSpec, PostSubmit};
use crate::constants::{APPOINTMENTS_PATH, DEPARTMENTS_PATH, DOCTORS_PATH, PATIENTS_PATH, SITES_PATH};
use crate::error::{ClientResult, SelectionError, SubmitError, ValidationError};
use crate::record::{Projection, Record};
use crate::transport::Transport;
use std::rc::Rc;

pub const SITE: &str = "site";
pub const DEPARTMENT: &str = "department";
pub const DOCTOR: &str = "doctor";
pub const PATIENT: &str = "patient";

pub const WHEN: &str = "fecha_hora";
pub const SERVICE: &str = "tipo_servicio";
pub const REASON: &str = "motivo";

pub struct NewAppointmentPage<T> {
    form: CascadeFormController<T>,
}

impl<T: Transport> NewAppointmentPage<T> {
    /// `after_submit` usually returns to the appointment list and reloads it.
    pub fn new(ctx: &PageContext<T>, after_submit: Option<Rc<dyn PostSubmit>>) -> ClientResult<Self> {
        let mut form = CascadeFormController::new(ctx.resource(APPOINTMENTS_PATH, "cita"));

        let site = form.add_selector(
            SelectorSpec::new(SITE, ctx.resource(SITES_PATH, "sedes"), Projection::new("id", "nombre"))
                .filter_param("sede_id")
                .placeholder("Seleccione una sede"),
            None,
            "id_sede",
        )?;
        let department = form.add_selector(
            SelectorSpec::new(
                DEPARTMENT,
                ctx.resource(DEPARTMENTS_PATH, "departamentos"),
                Projection::new("id", "nombre"),
            )
            .filter_param("dept_id")
            .placeholder("Seleccione un departamento"),
            Some(site),
            "id_dept",
        )?;
        form.add_selector(
            SelectorSpec::new(DOCTOR, ctx.resource(DOCTORS_PATH, "medicos"), Projection::new("id", "nombre"))
                .placeholder("Seleccione un médico"),
            Some(department),
            "id_emp",
        )?;
        form.add_selector(
            SelectorSpec::new(
                PATIENT,
                ctx.resource(PATIENTS_PATH, "pacientes"),
                Projection::with_label_fields("cod_pac", &["nombre", "apellido"]),
            )
            .placeholder("Seleccione un paciente"),
            None,
            "cod_pac",
        )?;

        form.add_field(FieldSpec::required(WHEN, FieldKind::DateTime));
        form.add_field(FieldSpec::optional(SERVICE, FieldKind::Text));
        form.add_field(FieldSpec::optional(REASON, FieldKind::Text));

        if let Some(action) = after_submit {
            form.set_post_submit(action);
        }
        Ok(Self { form })
    }

    /// Loads sites and patients.
    pub async fn load(&self) -> Result<(), SelectionError> {
        self.form.load_roots().await
    }

    pub async fn choose(&self, selector: &str, value: Option<&str>) -> Result<(), SelectionError> {
        self.form.select_by_name(selector, value).await
    }

    pub fn set_field(&self, name: &str, value: &str) -> Result<(), ValidationError> {
        self.form.set_field(name, value)
    }

    pub fn selector(&self, name: &str) -> Option<SelectorView> {
        let graph = self.form.graph();
        graph.find(name).and_then(|id| graph.view(id))
    }

    pub async fn submit(&self) -> Result<Record, SubmitError> {
        self.form.submit().await
    }

    pub fn form(&self) -> &CascadeFormController<T> {
        &self.form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::OptionsState;
    use crate::error::{FetchError, UserSignal};
    use crate::pages::appointments::AppointmentsPage;
    use crate::pages::fixtures::context;
    use crate::pages::LIST_PANEL;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn script(transport: &ScriptedTransport) {
        transport.on_get("sedes/", 200, json!({"sedes": [{"id": 1, "nombre": "Sede Norte"}]}));
        transport.on_get(
            "pacientes/",
            200,
            json!({"pacientes": [{"cod_pac": 12, "nombre": "Ana", "apellido": "Ruiz"}]}),
        );
        transport.on_get_with(
            "departamentos/",
            &[("sede_id", "1")],
            200,
            json!({"departamentos": [{"id": 3, "nombre": "Pediatría"}]}),
        );
        transport.on_get_with(
            "medicos/",
            &[("sede_id", "1"), ("dept_id", "3")],
            200,
            json!({"medicos": [{"id": 8, "nombre": "Dra. Paz"}]}),
        );
    }

    async fn fill(page: &NewAppointmentPage<Rc<ScriptedTransport>>) {
        page.load().await.unwrap();
        page.choose(SITE, Some("1")).await.unwrap();
        page.choose(DEPARTMENT, Some("3")).await.unwrap();
        page.choose(DOCTOR, Some("8")).await.unwrap();
        page.choose(PATIENT, Some("12")).await.unwrap();
        page.set_field(WHEN, "2025-04-02T10:15").unwrap();
        page.set_field(REASON, "Control anual").unwrap();
    }

    #[tokio::test]
    async fn patient_labels_join_name_and_surname() {
        let transport = Rc::new(ScriptedTransport::new());
        script(&transport);
        let page = NewAppointmentPage::new(&context(&transport, "Recepcionista"), None).unwrap();

        page.load().await.unwrap();
        let patients = page.selector(PATIENT).unwrap();
        assert_eq!(patients.options()[0].label, "Ana Ruiz");
        assert_eq!(
            page.selector(DOCTOR).unwrap().state,
            OptionsState::Placeholder("Seleccione un médico".into())
        );
    }

    #[tokio::test]
    async fn booking_returns_to_reloaded_list() {
        let transport = Rc::new(ScriptedTransport::new());
        script(&transport);
        transport.on_post("citas/crear/", 200, json!({"success": true, "id_cita": 30}));
        transport.on_get("citas/", 200, json!({"citas": [{"id_cita": 30, "estado": "PROGRAMADA"}]}));
        let ctx = context(&transport, "Recepcionista");

        let appointments = AppointmentsPage::new(&ctx).unwrap();
        appointments
            .show_detail(clinic_types::Identifier::new("5").unwrap())
            .await
            .unwrap();
        let back_to_list: Rc<dyn PostSubmit> = appointments.listing();
        let page = NewAppointmentPage::new(&ctx, Some(back_to_list)).unwrap();

        fill(&page).await;
        page.submit().await.expect("booking should succeed");

        let post = transport
            .requests()
            .into_iter()
            .find(|r| r.path == "citas/crear/")
            .unwrap();
        assert_eq!(
            post.body,
            Some(json!({
                "id_sede": "1",
                "id_dept": "3",
                "id_emp": "8",
                "cod_pac": "12",
                "fecha_hora": "2025-04-02T10:15",
                "motivo": "Control anual"
            }))
        );
        assert_eq!(appointments.visible_panel(), LIST_PANEL);
        assert_eq!(appointments.table().rows().len(), 1);
        assert!(page.selector(SITE).unwrap().value.is_none());
    }

    #[tokio::test]
    async fn server_refusal_is_shown_verbatim_and_form_kept() {
        let transport = Rc::new(ScriptedTransport::new());
        script(&transport);
        transport.on_post(
            "citas/crear/",
            200,
            json!({"success": false, "error": "El médico no tiene disponibilidad"}),
        );
        let page = NewAppointmentPage::new(&context(&transport, "Recepcionista"), None).unwrap();

        fill(&page).await;
        let err = page.submit().await.unwrap_err();

        assert_eq!(
            err.user_signal(),
            UserSignal::Inline("El médico no tiene disponibilidad".into())
        );
        assert!(matches!(err, SubmitError::Fetch(FetchError::Rejected { .. })));
        assert_eq!(page.form().field(WHEN).as_deref(), Some("2025-04-02T10:15"));
        assert!(page.selector(DOCTOR).unwrap().value.is_some());
    }

    #[tokio::test]
    async fn unselected_department_blocks_booking() {
        let transport = Rc::new(ScriptedTransport::new());
        script(&transport);
        let page = NewAppointmentPage::new(&context(&transport, "Recepcionista"), None).unwrap();

        page.load().await.unwrap();
        page.choose(SITE, Some("1")).await.unwrap();
        page.choose(PATIENT, Some("12")).await.unwrap();
        page.set_field(WHEN, "2025-04-02T10:15").unwrap();

        let err = page.submit().await.unwrap_err();
        assert_eq!(
            err,
            SubmitError::IncompleteSelection {
                missing: vec![DEPARTMENT.to_owned(), DOCTOR.to_owned()]
            }
        );
        assert_eq!(transport.post_count(), 0);
    }
}
