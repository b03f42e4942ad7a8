//! Landing page: who is logged in, which menu entries their role may see and today's figures.

use super::PageContext;
use crate::constants::DASHBOARD_STATS_PATH;
use crate::error::UserSignal;
use crate::record::Record;
use crate::resource::Endpoint;
use crate::role_gate::{GateDecisions, RoleGate, RoleRule};
use crate::transport::Transport;
use std::cell::RefCell;
use std::fmt;

/// Header strip shown on every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub role: String,
    pub site: String,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.role, self.site)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTile {
    pub label: &'static str,
    pub value: String,
    /// Drawn in the alert colour.
    pub highlighted: bool,
}

impl fmt::Display for StatTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.highlighted {
            write!(f, "{}: *{}*", self.label, self.value)
        } else {
            write!(f, "{}: {}", self.label, self.value)
        }
    }
}

fn tiles(stats: &Record) -> Vec<StatTile> {
    let tile = |label, field: &str| StatTile {
        label,
        value: stats.display(field),
        highlighted: false,
    };
    vec![
        tile("Citas hoy", "citas_hoy"),
        tile("Pacientes atendidos", "pacientes_atendidos"),
        tile("Citas pendientes", "citas_pendientes"),
        StatTile {
            highlighted: stats.number("alertas_stock").is_some_and(|n| n > 0.0),
            ..tile("Alertas de stock", "alertas_stock")
        },
    ]
}

pub struct DashboardPage<T> {
    ctx: PageContext<T>,
    gate: RefCell<RoleGate>,
}

impl<T: Transport> DashboardPage<T> {
    pub fn new(ctx: &PageContext<T>, rules: Vec<RoleRule>) -> Self {
        Self {
            ctx: ctx.clone(),
            gate: RefCell::new(RoleGate::new(rules)),
        }
    }

    pub fn header(&self) -> Header {
        let user = self.ctx.session().user();
        Header {
            name: user.name.clone(),
            role: user
                .role
                .as_ref()
                .map_or_else(|| "N/A".to_owned(), ToString::to_string),
            site: user.site_name.clone().unwrap_or_else(|| "N/A".to_owned()),
        }
    }

    /// Visibility of every role-gated menu entry for this session.
    pub fn menu(&self) -> GateDecisions {
        self.gate.borrow_mut().apply(self.ctx.session()).clone()
    }

    /// # Errors
    ///
    /// The user signal for a failed stats fetch; an expired session asks for a redirect.
    pub async fn stats(&self) -> Result<Vec<StatTile>, UserSignal> {
        let endpoint = Endpoint::new(DASHBOARD_STATS_PATH, "stats");
        match self.ctx.api().fetch_item(&endpoint).await {
            Ok(stats) => Ok(tiles(&stats)),
            Err(err) => {
                tracing::warn!(error = %err, "dashboard stats unavailable");
                Err(err.user_signal())
            }
        }
    }
}
