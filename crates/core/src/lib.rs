//! # Clinic Core
//!
//! Client-side controllers for the clinic management front end.
//!
//! This crate talks to the clinic backend over JSON and turns its answers into view models:
//! - [`resource`]: typed access to backend collections, with the status-to-error mapping
//! - [`binder`]: dependent selectors whose options follow their parent's value
//! - [`panels`]: mutually exclusive view panels with entity-scoped loading
//! - [`cascade`]: forms built from selectors and plain fields
//! - [`role_gate`]: role-based visibility of menu entries
//! - [`pages`]: one controller per page of the application
//!
//! **No rendering concerns**: pages produce tables and detail views from [`render`]; drawing
//! them (terminal, web) belongs to the binary.
//!
//! Everything runs on a single thread. Controllers share state through `Rc` and interior
//! mutability; a `RefCell` borrow is never held across an `.await`.

pub mod binder;
pub mod cascade;
pub mod config;
pub mod constants;
pub mod error;
pub mod pages;
pub mod panels;
pub mod record;
pub mod render;
pub mod resource;
pub mod role_gate;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use clinic_types;

pub use config::{ClientConfig, EnvValues, RetryPolicy};
pub use error::{
    ClientError, ConfigError, FetchError, LoginError, NavigationError, SelectionError,
    SubmitError, UserSignal, ValidationError,
};
pub use pages::PageContext;
pub use record::Record;
pub use resource::{ApiClient, Document, Endpoint, Query, RemoteResource};
pub use session::{login, logout, Session, SessionUser};
pub use transport::{HttpTransport, Transport};
