//! Constants used throughout the clinic core crate.
//!
//! Endpoint paths are relative to the configured API base and always end with `/`, matching
//! the backend's routing.

/// Default API base when no explicit base is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api/v2";

/// Default request timeout for the HTTP transport, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per read (one attempt, retries are user-triggered).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Default pause between read attempts when retries are enabled, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Text rendered for a missing or blank cell.
pub const MISSING_CELL: &str = "-";

/// Reason shown when a submission is refused without a server-provided message.
pub const DEFAULT_REJECTION: &str = "No se pudo completar la operación";

/// Reason shown when login fails without a server-provided message.
pub const DEFAULT_LOGIN_FAILURE: &str = "Credenciales inválidas";

/// Stock strictly below this quantity is critical.
pub const CRITICAL_STOCK_THRESHOLD: f64 = 10.0;

/// Stock strictly below this quantity is low and raises an alert.
pub const LOW_STOCK_THRESHOLD: f64 = 50.0;

/// Shown in place of a table whose fetch failed without a server message.
pub const LOAD_FAILURE: &str = "Error al cargar datos";

/// Suffix appended to a collection path to form its create endpoint.
pub const CREATE_SEGMENT: &str = "crear/";

// Session
pub const LOGIN_PATH: &str = "login/";
pub const LOGOUT_PATH: &str = "logout/";
pub const PROFILE_PATH: &str = "perfil/";
pub const DASHBOARD_STATS_PATH: &str = "dashboard/stats/";

// Lookup data
pub const SITES_PATH: &str = "sedes/";
pub const DEPARTMENTS_PATH: &str = "departamentos/";
pub const DOCTORS_PATH: &str = "medicos/";

// Clinical
pub const PATIENTS_PATH: &str = "pacientes/";
pub const APPOINTMENTS_PATH: &str = "citas/";
pub const HISTORIES_PATH: &str = "historias/";
pub const PRESCRIPTIONS_PATH: &str = "prescripciones/";

// Pharmacy and equipment
pub const INVENTORY_PATH: &str = "inventario/";
pub const MEDICATIONS_PATH: &str = "medicamentos/";
pub const EQUIPMENT_PATH: &str = "equipamiento/";

// Oversight
pub const AUDIT_ACCESS_PATH: &str = "auditoria/accesos/";
pub const REPORT_PRESCRIBED_PATH: &str = "reportes/medicamentos-recetados/";
pub const REPORT_CONSULTATIONS_PATH: &str = "reportes/medicos-consultas/";
pub const REPORT_DISEASES_PATH: &str = "reportes/enfermedades/";
