//! Role-based visibility of UI elements.
//!
//! A [`RoleRule`] names an element and the roles allowed to see it. Evaluation fails closed: a
//! rule whose role list is missing or cannot be parsed hides its element from everyone, and a
//! session without a recognised role sees no gated element at all.
//!
//! Rules are static configuration. They can be declared in code or loaded from YAML:
//!
//! ```yaml
//! - element: menu.audit
//!   roles: Administrador,Auditor
//! - element: menu.pharmacy
//!   roles: [Farmaceutico, Administrador]
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::session::Session;
use clinic_types::{ElementRef, Role, TextError};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use uuid::Uuid;

/// Who may see one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    element: ElementRef,
    /// `None` when the declared list was absent or unparseable; such a rule allows nobody.
    allowed: Option<BTreeSet<Role>>,
}

impl RoleRule {
    pub fn new(element: ElementRef, allowed: impl IntoIterator<Item = Role>) -> Self {
        let allowed: BTreeSet<Role> = allowed.into_iter().collect();
        Self {
            element,
            allowed: (!allowed.is_empty()).then_some(allowed),
        }
    }

    /// Builds a rule from a comma separated attribute value (`"Medico,Administrador"`).
    ///
    /// A missing attribute, or one with a blank entry, yields a rule that denies everyone.
    ///
    /// # Errors
    ///
    /// `TextError::Empty` if `element` is blank.
    pub fn from_attribute(element: &str, roles: Option<&str>) -> Result<Self, TextError> {
        let element = ElementRef::new(element)?;
        let allowed = roles.and_then(|list| parse_roles(list.split(',')));
        Ok(Self { element, allowed })
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn allowed(&self) -> Option<&BTreeSet<Role>> {
        self.allowed.as_ref()
    }

    pub fn allows(&self, role: Option<&Role>) -> bool {
        match (&self.allowed, role) {
            (Some(allowed), Some(role)) => allowed.contains(role),
            _ => false,
        }
    }
}

fn parse_roles<'a>(entries: impl Iterator<Item = &'a str>) -> Option<BTreeSet<Role>> {
    let roles = entries
        .map(Role::new)
        .collect::<Result<BTreeSet<Role>, _>>()
        .ok()?;
    (!roles.is_empty()).then_some(roles)
}

#[derive(Deserialize)]
struct RawRule {
    element: String,
    #[serde(default)]
    roles: Option<RawRoles>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    List(Vec<String>),
    Attribute(String),
}

/// Loads rules from a YAML file.
///
/// # Errors
///
/// - `ConfigError::RoleRulesRead` if the file cannot be read
/// - `ConfigError::RoleRulesParse` if it is not a list of `{element, roles}` entries
/// - `ConfigError::RoleRule` if an element name is blank
pub fn load_role_rules(path: &Path) -> ConfigResult<Vec<RoleRule>> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::RoleRulesRead)?;
    parse_role_rules(&text)
}

/// Parses rules from YAML text. See [`load_role_rules`].
pub fn parse_role_rules(text: &str) -> ConfigResult<Vec<RoleRule>> {
    let raw: Vec<RawRule> = serde_yaml::from_str(text).map_err(ConfigError::RoleRulesParse)?;
    raw.into_iter()
        .map(|rule| -> ConfigResult<RoleRule> {
            let element = ElementRef::new(&rule.element)?;
            let allowed = match rule.roles {
                Some(RawRoles::Attribute(list)) => parse_roles(list.split(',')),
                Some(RawRoles::List(list)) => parse_roles(list.iter().map(String::as_str)),
                None => None,
            };
            Ok(RoleRule { element, allowed })
        })
        .collect()
}

/// Visibility decided for every gated element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateDecisions(BTreeMap<ElementRef, bool>);

impl GateDecisions {
    /// Elements without a rule are not gated and always visible.
    pub fn is_visible(&self, element: &str) -> bool {
        self.0.get(element).copied().unwrap_or(true)
    }

    pub fn hidden(&self) -> impl Iterator<Item = &ElementRef> {
        self.0
            .iter()
            .filter(|(_, visible)| !**visible)
            .map(|(name, _)| name)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ElementRef> {
        self.0
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(name, _)| name)
    }
}

/// Evaluates `rules` for `role`. An element with several rules is visible only if all allow it.
pub fn apply(rules: &[RoleRule], role: Option<&Role>) -> GateDecisions {
    let mut decisions = BTreeMap::new();
    for rule in rules {
        let allowed = rule.allows(role);
        decisions
            .entry(rule.element.clone())
            .and_modify(|visible: &mut bool| *visible &= allowed)
            .or_insert(allowed);
    }
    GateDecisions(decisions)
}

/// Applies rules once per session.
///
/// The role is fixed for the lifetime of a session, so decisions are cached against the session
/// id and only recomputed when a different session is presented.
#[derive(Debug, Clone)]
pub struct RoleGate {
    rules: Vec<RoleRule>,
    applied: Option<(Uuid, GateDecisions)>,
}

impl RoleGate {
    pub fn new(rules: Vec<RoleRule>) -> Self {
        Self {
            rules,
            applied: None,
        }
    }

    pub fn apply(&mut self, session: &Session) -> &GateDecisions {
        if matches!(&self.applied, Some((id, _)) if *id != session.id()) {
            self.applied = None;
        }
        let rules = &self.rules;
        let (_, decisions) = self.applied.get_or_insert_with(|| {
            tracing::debug!(session = %session.id(), "evaluating role rules");
            (session.id(), apply(rules, session.role()))
        });
        decisions
    }
}
