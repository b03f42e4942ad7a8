//! Forms built from dependent selectors and plain fields.
//!
//! [`CascadeFormController::submit`] checks everything client-side before any network call:
//! first that every required selector has a value, then the plain fields. On success the form
//! forgets its transient state and runs its post-submit action; on failure every entered value
//! stays where it was.

use crate::binder::{SelectorGraph, SelectorId, SelectorSpec};
use crate::error::{SelectionError, SubmitError, ValidationError};
use crate::record::Record;
use crate::resource::RemoteResource;
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use clinic_types::{EmailAddress, Identifier};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Accepted shapes of a date-time field (`datetime-local` first).
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    DateTime,
    Email,
}

/// A plain (non-selector) form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    fn validate(&self, value: Option<&str>) -> Result<(), ValidationError> {
        let Some(value) = value else {
            return if self.required {
                Err(ValidationError::new(&self.name, "is required"))
            } else {
                Ok(())
            };
        };

        let valid = match self.kind {
            FieldKind::Text => true,
            FieldKind::Date => NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok(),
            FieldKind::DateTime => DATE_TIME_FORMATS
                .iter()
                .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok()),
            FieldKind::Email => EmailAddress::parse(value).is_ok(),
        };
        if valid {
            Ok(())
        } else {
            let expected = match self.kind {
                FieldKind::Text => "text",
                FieldKind::Date => "a date (YYYY-MM-DD)",
                FieldKind::DateTime => "a date and time (YYYY-MM-DDTHH:MM)",
                FieldKind::Email => "an email address",
            };
            Err(ValidationError::new(
                &self.name,
                format!("expected {expected}, got {value:?}"),
            ))
        }
    }
}

/// What happens after a successful submission (return to a list, reload it).
#[async_trait(?Send)]
pub trait PostSubmit {
    async fn after_submit(&self, created: &Record);
}

pub struct CascadeFormController<T> {
    graph: SelectorGraph<T>,
    target: RemoteResource<T>,
    /// Selector and the payload key its value is sent under, in declaration order.
    selectors: Vec<(SelectorId, String)>,
    fields: Vec<FieldSpec>,
    values: RefCell<BTreeMap<String, String>>,
    post_submit: Option<Rc<dyn PostSubmit>>,
}

impl<T: Transport> CascadeFormController<T> {
    /// A form posting to `target`'s create endpoint.
    pub fn new(target: RemoteResource<T>) -> Self {
        Self {
            graph: SelectorGraph::new(),
            target,
            selectors: Vec::new(),
            fields: Vec::new(),
            values: RefCell::new(BTreeMap::new()),
            post_submit: None,
        }
    }

    /// Adds a selector whose value is sent as `payload_key`.
    pub fn add_selector(
        &mut self,
        spec: SelectorSpec<T>,
        parent: Option<SelectorId>,
        payload_key: impl Into<String>,
    ) -> Result<SelectorId, SelectionError> {
        let id = self.graph.bind(spec, parent)?;
        self.selectors.push((id, payload_key.into()));
        Ok(id)
    }

    pub fn add_field(&mut self, field: FieldSpec) {
        self.fields.push(field);
    }

    pub fn set_post_submit(&mut self, action: Rc<dyn PostSubmit>) {
        self.post_submit = Some(action);
    }

    pub fn graph(&self) -> &SelectorGraph<T> {
        &self.graph
    }

    pub async fn load_roots(&self) -> Result<(), SelectionError> {
        self.graph.load_roots().await
    }

    pub async fn select(
        &self,
        id: SelectorId,
        value: Option<Identifier>,
    ) -> Result<(), SelectionError> {
        self.graph.select(id, value).await
    }

    /// Selects by selector name and raw value; blank values clear the selector.
    pub async fn select_by_name(
        &self,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), SelectionError> {
        let id = self
            .graph
            .find(name)
            .ok_or_else(|| SelectionError::UnknownSelector(name.to_owned()))?;
        let value = value.and_then(|v| Identifier::new(v).ok());
        self.graph.select(id, value).await
    }

    pub fn selection(&self, name: &str) -> Option<Identifier> {
        self.graph
            .find(name)
            .and_then(|id| self.graph.current_selection(id))
    }

    /// Sets a plain field. Blank input clears it.
    ///
    /// # Errors
    ///
    /// `ValidationError` if the form declares no field called `name`.
    pub fn set_field(&self, name: &str, value: &str) -> Result<(), ValidationError> {
        if !self.fields.iter().any(|field| field.name == name) {
            return Err(ValidationError::new(name, "unknown field"));
        }
        let mut values = self.values.borrow_mut();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            values.remove(name);
        } else {
            values.insert(name.to_owned(), trimmed.to_owned());
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    /// Validates, assembles and posts the form.
    ///
    /// # Errors
    ///
    /// - `SubmitError::IncompleteSelection` naming every required selector without a value
    /// - `SubmitError::Validation` for the first invalid plain field
    /// - `SubmitError::Fetch` when the backend fails or refuses the record; the reason is the
    ///   server's message verbatim
    pub async fn submit(&self) -> Result<Record, SubmitError> {
        let missing: Vec<String> = self
            .selectors
            .iter()
            .filter(|(id, _)| {
                self.graph.is_required(*id) && self.graph.current_selection(*id).is_none()
            })
            .filter_map(|(id, _)| self.graph.name(*id))
            .collect();
        if !missing.is_empty() {
            return Err(SubmitError::IncompleteSelection { missing });
        }

        let payload = {
            let values = self.values.borrow();
            for field in &self.fields {
                field.validate(values.get(&field.name).map(String::as_str))?;
            }

            let mut payload = Map::new();
            for (id, key) in &self.selectors {
                if let Some(value) = self.graph.current_selection(*id) {
                    payload.insert(key.clone(), Value::String(value.to_string()));
                }
            }
            for field in &self.fields {
                if let Some(value) = values.get(&field.name) {
                    payload.insert(field.name.clone(), Value::String(value.clone()));
                }
            }
            Value::Object(payload)
        };

        let created = self.target.submit(&payload).await?;
        tracing::info!(endpoint = %self.target.endpoint().path(), "form submitted");

        self.values.borrow_mut().clear();
        self.graph.clear_all();

        if let Some(action) = &self.post_submit {
            action.after_submit(&created).await;
        }
        Ok(created)
    }
}
