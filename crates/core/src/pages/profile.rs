//! The logged-in employee's own profile.

use super::{PageContext, StaticPanels};
use crate::constants::PROFILE_PATH;
use crate::error::{ClientResult, NavigationError};
use crate::panels::{NavigationOutcome, PanelContent, PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::DetailView;
use crate::resource::Endpoint;
use crate::transport::Transport;

pub const PROFILE_PANEL: &str = "profile";
pub const PASSWORD_PANEL: &str = "password";

const NOT_SPECIFIED: &str = "No especificado";
const NOT_ASSIGNED: &str = "No asignado";

/// Full gender label for the backend's one-letter code; unknown codes pass through.
pub fn gender_label(code: &str) -> &str {
    match code {
        "M" => "Masculino",
        "F" => "Femenino",
        "O" => "Otro",
        other => other,
    }
}

fn view(profile: &Record) -> DetailView {
    let or_unspecified = |field: &str| profile.display_or(field, NOT_SPECIFIED);
    let document = format!(
        "{} - {}",
        profile.text("tipo_doc").unwrap_or_default(),
        profile.text("num_doc").unwrap_or_default()
    );
    let gender = profile
        .text("genero")
        .map_or_else(|| NOT_SPECIFIED.to_owned(), |g| gender_label(&g).to_owned());

    DetailView::new(profile.joined(&["nombre", "apellido"]).unwrap_or_default())
        .field("Documento", document)
        .field("Fecha de nacimiento", or_unspecified("fecha_nac"))
        .field("Género", gender)
        .field("Dirección", or_unspecified("direccion"))
        .field("Teléfono", or_unspecified("telefono"))
        .field("Email", or_unspecified("email"))
        .field("Ciudad", or_unspecified("ciudad"))
        .field("Rol", or_unspecified("rol"))
        .field("Sede", or_unspecified("sede"))
        .field("Departamento", profile.display_or("departamento", NOT_ASSIGNED))
}

pub struct ProfilePage<T> {
    ctx: PageContext<T>,
    panels: ViewPanelSwitcher<StaticPanels>,
}

impl<T: Transport> ProfilePage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(PROFILE_PANEL)?.with_title("Mi perfil"),
                PanelSpec::new(PASSWORD_PANEL)?
                    .with_parent(PROFILE_PANEL)?
                    .with_title("Cambiar contraseña"),
            ],
            StaticPanels,
        )?;
        Ok(Self {
            ctx: ctx.clone(),
            panels,
        })
    }

    pub async fn load(&self) -> PanelContent<DetailView> {
        let endpoint = Endpoint::new(PROFILE_PATH, "perfil");
        match self.ctx.api().fetch_item(&endpoint).await {
            Ok(profile) => PanelContent::Ready(view(&profile)),
            Err(err) => {
                tracing::debug!(error = %err, "profile load failed");
                PanelContent::Failed(err.user_signal())
            }
        }
    }

    pub async fn show_change_password(&self) -> Result<NavigationOutcome, NavigationError> {
        self.panels.navigate(PASSWORD_PANEL, None).await
    }

    pub async fn show_profile(&self) -> Result<NavigationOutcome, NavigationError> {
        self.panels.navigate(PROFILE_PANEL, None).await
    }

    pub fn visible_panel(&self) -> String {
        self.panels.visible().to_string()
    }
}
