use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_core::clinic_types::Identifier;
use clinic_core::pages::appointments::{AppointmentFilter, AppointmentsPage};
use clinic_core::pages::audit::AuditPage;
use clinic_core::pages::dashboard::DashboardPage;
use clinic_core::pages::equipment::EquipmentPage;
use clinic_core::pages::histories::HistoriesPage;
use clinic_core::pages::new_appointment::{
    NewAppointmentPage, DEPARTMENT, DOCTOR, PATIENT, REASON, SERVICE, SITE, WHEN,
};
use clinic_core::pages::patients::PatientsPage;
use clinic_core::pages::pharmacy::PharmacyPage;
use clinic_core::pages::prescriptions::PrescriptionsPage;
use clinic_core::pages::profile::ProfilePage;
use clinic_core::pages::reports::{ReportsPage, PRESCRIBED_PANEL};
use clinic_core::panels::{NavigationOutcome, PanelContent};
use clinic_core::render::{DetailView, TableView};
use clinic_core::{
    login, logout, ApiClient, ClientConfig, EnvValues, HttpTransport, PageContext, UserSignal,
};

type Context = PageContext<HttpTransport>;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic management client")]
struct Cli {
    /// Login email
    #[arg(long, env = "CLINIC_EMAIL")]
    email: String,
    /// Login password
    #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
    password: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Header, visible menu entries and today's figures
    Dashboard,
    /// List appointments, or show one
    Appointments {
        /// `todas` or a status (programada, completada, cancelada)
        #[arg(long)]
        filter: Option<String>,
        /// Appointment id to show in detail
        #[arg(long)]
        id: Option<String>,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        site: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        doctor: String,
        #[arg(long)]
        patient: String,
        /// Date and time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        when: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Search patients, or show one with their visits
    Patients {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// List clinical histories, or show one
    Histories {
        #[arg(long)]
        id: Option<String>,
    },
    /// Pharmacy inventory, stock alerts or catalogue
    Pharmacy {
        /// inventario, alertas or catalogo
        #[arg(long)]
        view: Option<String>,
    },
    /// List medical equipment
    Equipment,
    /// List prescriptions
    Prescriptions,
    /// Show the access audit log
    Audit,
    /// Management reports
    Reports {
        /// medicamentos, medicos or enfermedades
        #[arg(long)]
        view: Option<String>,
    },
    /// Show your profile
    Profile,
}

/// Main entry point for the clinic client
///
/// Logs in, runs one page and logs out again.
///
/// # Environment Variables
/// - `CLINIC_API_BASE`: backend API base (default: "http://127.0.0.1:8000/api/v2")
/// - `CLINIC_REQUEST_TIMEOUT_SECS`, `CLINIC_MAX_ATTEMPTS`, `CLINIC_RETRY_BACKOFF_MS`
/// - `CLINIC_ROLE_RULES`: YAML file of role-gated menu entries
/// - `CLINIC_EMAIL`, `CLINIC_PASSWORD`: credentials when not given as flags
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("clinic=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let cfg = ClientConfig::from_env_values(EnvValues {
        api_base: std::env::var("CLINIC_API_BASE").ok(),
        request_timeout_secs: std::env::var("CLINIC_REQUEST_TIMEOUT_SECS").ok(),
        max_attempts: std::env::var("CLINIC_MAX_ATTEMPTS").ok(),
        retry_backoff_ms: std::env::var("CLINIC_RETRY_BACKOFF_MS").ok(),
        role_rules_path: std::env::var("CLINIC_ROLE_RULES").ok().map(PathBuf::from),
    })?;
    tracing::info!("++ Using clinic API at {}", cfg.base_url());

    let api = Rc::new(ApiClient::new(HttpTransport::new(&cfg)?, cfg.retry()));
    let session = login(&api, &cli.email, &cli.password).await?;
    let ctx = PageContext::new(Rc::clone(&api), Rc::new(session.clone()));

    let signed_in = run(cli.command, &ctx, &cfg).await?;
    if !signed_in {
        eprintln!("Your session has expired. Log in again.");
        return Ok(ExitCode::from(2));
    }

    if let Err(e) = logout(&api, session).await {
        tracing::warn!("Logout failed: {}", e);
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs one page. Returns `false` when the backend no longer recognises the session.
async fn run(command: Commands, ctx: &Context, cfg: &ClientConfig) -> anyhow::Result<bool> {
    match command {
        Commands::Dashboard => {
            let page = DashboardPage::new(ctx, cfg.role_rules().to_vec());
            println!("{}", page.header());
            let menu = page.menu();
            for entry in menu.visible() {
                println!("  menu: {entry}");
            }
            match page.stats().await {
                Ok(tiles) => {
                    for tile in tiles {
                        println!("{tile}");
                    }
                }
                Err(signal) => return Ok(report_signal(&signal)),
            }
        }
        Commands::Appointments { filter, id } => {
            let page = AppointmentsPage::new(ctx)?;
            match id {
                Some(id) => {
                    let outcome = page.show_detail(Identifier::new(id)?).await?;
                    return Ok(print_detail(outcome, page.detail()));
                }
                None => {
                    let filter = AppointmentFilter::parse(filter.as_deref().unwrap_or_default());
                    return Ok(print_table(&page.load(&filter).await));
                }
            }
        }
        Commands::Book {
            site,
            department,
            doctor,
            patient,
            when,
            service,
            reason,
        } => {
            let page = NewAppointmentPage::new(ctx, None)?;
            page.load().await?;
            page.choose(SITE, Some(&site)).await?;
            page.choose(DEPARTMENT, Some(&department)).await?;
            page.choose(DOCTOR, Some(&doctor)).await?;
            page.choose(PATIENT, Some(&patient)).await?;
            page.set_field(WHEN, &when)?;
            if let Some(service) = service {
                page.set_field(SERVICE, &service)?;
            }
            if let Some(reason) = reason {
                page.set_field(REASON, &reason)?;
            }
            match page.submit().await {
                Ok(created) => println!("Cita creada: {}", created.display("id_cita")),
                Err(e) => return Ok(report_signal(&e.user_signal())),
            }
        }
        Commands::Patients { search, id } => {
            let page = PatientsPage::new(ctx)?;
            match id {
                Some(id) => {
                    let outcome = page.show_detail(Identifier::new(id)?).await?;
                    return Ok(print_detail(outcome, page.detail()));
                }
                None => return Ok(print_table(&page.search(search.as_deref()).await)),
            }
        }
        Commands::Histories { id } => {
            let page = HistoriesPage::new(ctx)?;
            match id {
                Some(id) => {
                    let outcome = page.show_detail(Identifier::new(id)?).await?;
                    return Ok(print_detail(outcome, page.detail()));
                }
                None => return Ok(print_table(&page.load().await)),
            }
        }
        Commands::Pharmacy { view } => {
            let page = PharmacyPage::new(ctx)?;
            page.load().await;
            if let Some(view) = view {
                println!("{}", page.show_view(&view).await?);
            }
            return Ok(print_table(&page.visible_table()));
        }
        Commands::Equipment => {
            let page = EquipmentPage::new(ctx)?;
            return Ok(print_table(&page.load().await));
        }
        Commands::Prescriptions => {
            return Ok(print_table(&PrescriptionsPage::new(ctx).load().await));
        }
        Commands::Audit => {
            return Ok(print_table(&AuditPage::new(ctx).load().await));
        }
        Commands::Reports { view } => {
            let page = ReportsPage::new(ctx)?;
            let outcome = page
                .show_view(view.as_deref().unwrap_or(PRESCRIBED_PANEL))
                .await?;
            if outcome == NavigationOutcome::RedirectToLogin {
                return Ok(false);
            }
            match page.report() {
                PanelContent::Ready(table) => return Ok(print_table(&table)),
                PanelContent::Failed(signal) => return Ok(report_signal(&signal)),
                PanelContent::Blank => {}
            }
        }
        Commands::Profile => {
            let page = ProfilePage::new(ctx)?;
            return Ok(print_detail(NavigationOutcome::Shown, page.load().await));
        }
    }
    Ok(true)
}

fn report_signal(signal: &UserSignal) -> bool {
    if signal.is_redirect() {
        return false;
    }
    eprintln!("Error: {signal}");
    true
}

fn print_table(table: &TableView) -> bool {
    match table.failure() {
        Some(signal) => report_signal(signal),
        None => {
            print!("{table}");
            true
        }
    }
}

fn print_detail(outcome: NavigationOutcome, content: PanelContent<DetailView>) -> bool {
    if outcome == NavigationOutcome::RedirectToLogin {
        return false;
    }
    match content {
        PanelContent::Ready(detail) => {
            print!("{detail}");
            true
        }
        PanelContent::Failed(signal) => report_signal(&signal),
        PanelContent::Blank => true,
    }
}
