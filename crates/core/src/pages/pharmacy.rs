//! Pharmacy: consolidated inventory, low-stock alerts and the medication catalogue, each in
//! its own panel.

use super::{load_table, PageContext, StaticPanels, TableSpec};
use crate::constants::{
    CRITICAL_STOCK_THRESHOLD, INVENTORY_PATH, LOW_STOCK_THRESHOLD, MEDICATIONS_PATH, MISSING_CELL,
};
use crate::error::{ClientResult, NavigationError};
use crate::panels::{PanelSpec, ViewPanelSwitcher};
use crate::record::Record;
use crate::render::{Badge, Cell, TableView, Tone};
use crate::resource::{Query, RemoteResource};
use crate::transport::Transport;
use std::cell::RefCell;

pub const INVENTORY_PANEL: &str = "inventario";
pub const ALERTS_PANEL: &str = "alertas";
pub const CATALOG_PANEL: &str = "catalogo";

/// Stock classification of one inventory line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Critical,
    Low,
    Optimal,
}

impl StockLevel {
    pub fn of(quantity: f64) -> Self {
        if quantity < CRITICAL_STOCK_THRESHOLD {
            StockLevel::Critical
        } else if quantity < LOW_STOCK_THRESHOLD {
            StockLevel::Low
        } else {
            StockLevel::Optimal
        }
    }

    pub fn badge(self) -> Badge {
        match self {
            StockLevel::Critical => Badge::new("CRÍTICO", Tone::Danger),
            StockLevel::Low => Badge::new("BAJO", Tone::Warning),
            StockLevel::Optimal => Badge::new("ÓPTIMO", Tone::Success),
        }
    }
}

/// Lines below the low-stock threshold. Lines without a quantity never alert.
pub fn stock_alerts(inventory: &[Record]) -> Vec<Record> {
    inventory
        .iter()
        .filter(|line| {
            line.number("cantidad")
                .is_some_and(|quantity| quantity < LOW_STOCK_THRESHOLD)
        })
        .cloned()
        .collect()
}

fn inventory_row(line: &Record) -> Vec<Cell> {
    let level = match line.number("cantidad") {
        Some(quantity) => StockLevel::of(quantity).badge(),
        None => Badge::new(MISSING_CELL, Tone::Secondary),
    };
    vec![
        Cell::field(line, "sede"),
        Cell::field(line, "medicamento"),
        Cell::field(line, "principio_activo"),
        Cell::field(line, "cantidad"),
        Cell::Badge(level),
        Cell::field(line, "fecha_actualizacion"),
    ]
}

const INVENTORY_TABLE: TableSpec = TableSpec {
    columns: &[
        "Sede",
        "Medicamento",
        "Principio activo",
        "Cantidad",
        "Estado",
        "Actualización",
    ],
    empty: "No hay inventario registrado",
    row: inventory_row,
};

fn alert_row(line: &Record) -> Vec<Cell> {
    vec![
        Cell::field(line, "sede"),
        Cell::field(line, "medicamento"),
        Cell::Emphasis(line.display("cantidad")),
        Cell::Badge(Badge::new("BAJO", Tone::Danger)),
    ]
}

const ALERTS_TABLE: TableSpec = TableSpec {
    columns: &["Sede", "Medicamento", "Cantidad", "Estado"],
    empty: "No hay alertas de stock",
    row: alert_row,
};

fn catalog_row(medication: &Record) -> Vec<Cell> {
    vec![
        Cell::field(medication, "cod_med"),
        Cell::field(medication, "nombre"),
        Cell::field(medication, "principio_activo"),
        Cell::field(medication, "unidad"),
        Cell::field(medication, "proveedor"),
    ]
}

const CATALOG_TABLE: TableSpec = TableSpec {
    columns: &["Código", "Nombre", "Principio activo", "Unidad", "Proveedor"],
    empty: "No hay medicamentos en el catálogo",
    row: catalog_row,
};

pub struct PharmacyPage<T> {
    inventory: RemoteResource<T>,
    catalog: RemoteResource<T>,
    panels: ViewPanelSwitcher<StaticPanels>,
    tables: RefCell<PharmacyTables>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PharmacyTables {
    pub inventory: TableView,
    pub alerts: TableView,
    pub catalog: TableView,
}

impl<T: Transport> PharmacyPage<T> {
    pub fn new(ctx: &PageContext<T>) -> ClientResult<Self> {
        let panels = ViewPanelSwitcher::new(
            vec![
                PanelSpec::new(INVENTORY_PANEL)?.with_title("Inventario Consolidado"),
                PanelSpec::new(ALERTS_PANEL)?.with_title("Alertas De Stock"),
                PanelSpec::new(CATALOG_PANEL)?.with_title("Catálogo de Medicamentos"),
            ],
            StaticPanels,
        )?;
        Ok(Self {
            inventory: ctx.resource(INVENTORY_PATH, "inventario"),
            catalog: ctx.resource(MEDICATIONS_PATH, "medicamentos"),
            panels,
            tables: RefCell::new(PharmacyTables {
                inventory: INVENTORY_TABLE.render(&[]),
                alerts: ALERTS_TABLE.render(&[]),
                catalog: CATALOG_TABLE.render(&[]),
            }),
        })
    }

    /// Loads inventory (and the alerts derived from it) and the catalogue.
    pub async fn load(&self) -> PharmacyTables {
        let (inventory, alerts) = match self.inventory.fetch_collection(&Query::new()).await {
            Ok(lines) => (
                INVENTORY_TABLE.render(&lines),
                ALERTS_TABLE.render(&stock_alerts(&lines)),
            ),
            Err(err) => {
                tracing::debug!(error = %err, "inventory load failed");
                (INVENTORY_TABLE.failed(&err), ALERTS_TABLE.failed(&err))
            }
        };
        let catalog = load_table(&self.catalog, &Query::new(), &CATALOG_TABLE).await;

        let tables = PharmacyTables {
            inventory,
            alerts,
            catalog,
        };
        *self.tables.borrow_mut() = tables.clone();
        tables
    }

    /// Switches tab and returns its title.
    pub async fn show_view(&self, name: &str) -> Result<String, NavigationError> {
        self.panels.navigate(name, None).await?;
        Ok(self.panels.title().unwrap_or_default())
    }

    pub fn visible_panel(&self) -> String {
        self.panels.visible().to_string()
    }

    pub fn visible_table(&self) -> TableView {
        let tables = self.tables.borrow();
        match self.panels.visible().as_str() {
            ALERTS_PANEL => tables.alerts.clone(),
            CATALOG_PANEL => tables.catalog.clone(),
            _ => tables.inventory.clone(),
        }
    }
}
