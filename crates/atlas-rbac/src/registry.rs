//! Static module/feature registry.
//!
//! The registry is the universe of keys a permission check can ever name.
//! Lookups never fail: unknown modules yield `None` or empty lists, and an
//! unknown key simply never matches a grant.

use crate::keys::FeatureKey;
use serde::Serialize;

/// A feature or dashboard entry inside a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: &'static str,
    pub label: &'static str,
}

/// A top-level ERP module.
#[derive(Debug, Clone, Copy)]
pub struct Module {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub features: &'static [Entry],
    pub dashboards: &'static [Entry],
}

/// An entry resolved against its module, as handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub canonical_key: String,
    pub label: String,
}

const fn entry(key: &'static str, label: &'static str) -> Entry {
    Entry { key, label }
}

static MODULES: &[Module] = &[
    Module {
        key: "home",
        name: "Home",
        icon: "home",
        features: &[
            entry("overview", "Overview"),
            entry("notifications", "Notifications"),
            entry("tasks", "My Tasks"),
        ],
        dashboards: &[entry("kpis", "Company KPIs")],
    },
    Module {
        key: "sales",
        name: "Sales",
        icon: "shopping-cart",
        features: &[
            entry("customers", "Customers"),
            entry("quotations", "Quotations"),
            entry("orders", "Sales Orders"),
            entry("invoices", "Invoices"),
            entry("returns", "Sales Returns"),
            entry("price-lists", "Price Lists"),
        ],
        dashboards: &[
            entry("sales-overview", "Sales Overview"),
            entry("pipeline", "Pipeline"),
        ],
    },
    Module {
        key: "purchase",
        name: "Purchase",
        icon: "truck",
        features: &[
            entry("suppliers", "Suppliers"),
            entry("requisitions", "Purchase Requisitions"),
            entry("orders", "Purchase Orders"),
            entry("direct-purchase", "Direct Purchase"),
            entry("receipts", "Goods Receipts"),
            entry("bills", "Supplier Bills"),
        ],
        dashboards: &[entry("purchase-overview", "Purchase Overview")],
    },
    Module {
        key: "inventory",
        name: "Inventory",
        icon: "package",
        features: &[
            entry("items", "Items"),
            entry("warehouses", "Warehouses"),
            entry("stock-transfers", "Stock Transfers"),
            entry("adjustments", "Stock Adjustments"),
            entry("batches", "Batches & Serials"),
        ],
        dashboards: &[
            entry("stock-levels", "Stock Levels"),
            entry("valuation", "Stock Valuation"),
        ],
    },
    Module {
        key: "finance",
        name: "Finance",
        icon: "landmark",
        features: &[
            entry("accounts", "Chart of Accounts"),
            entry("journals", "Journal Entries"),
            entry("payments", "Payments"),
            entry("receipts", "Receipts"),
            entry("bank-reconciliation", "Bank Reconciliation"),
            entry("taxes", "Taxes"),
        ],
        dashboards: &[
            entry("cash-flow", "Cash Flow"),
            entry("profit-loss", "Profit & Loss"),
        ],
    },
    Module {
        key: "hr",
        name: "Human Resources",
        icon: "users",
        features: &[
            entry("employees", "Employees"),
            entry("attendance", "Attendance"),
            entry("leave", "Leave"),
            entry("payroll", "Payroll"),
            entry("departments", "Departments"),
        ],
        dashboards: &[entry("headcount", "Headcount")],
    },
    Module {
        key: "maintenance",
        name: "Maintenance",
        icon: "wrench",
        features: &[
            entry("assets", "Assets"),
            entry("work-orders", "Work Orders"),
            entry("schedules", "Preventive Schedules"),
        ],
        dashboards: &[entry("downtime", "Downtime")],
    },
    Module {
        key: "production",
        name: "Production",
        icon: "factory",
        features: &[
            entry("boms", "Bills of Materials"),
            entry("work-orders", "Production Orders"),
            entry("routings", "Routings"),
            entry("quality", "Quality Checks"),
        ],
        dashboards: &[entry("output", "Production Output")],
    },
    Module {
        key: "service",
        name: "Service Management",
        icon: "headset",
        features: &[
            entry("tickets", "Tickets"),
            entry("contracts", "Service Contracts"),
            entry("visits", "Field Visits"),
        ],
        dashboards: &[entry("sla", "SLA Compliance")],
    },
    Module {
        key: "bi",
        name: "Business Intelligence",
        icon: "bar-chart",
        features: &[
            entry("reports", "Reports"),
            entry("exports", "Data Exports"),
        ],
        dashboards: &[
            entry("executive", "Executive"),
            entry("operations", "Operations"),
        ],
    },
    Module {
        key: "admin",
        name: "Administration",
        icon: "shield",
        features: &[
            entry("users", "Users"),
            entry("roles", "Roles"),
            entry("permissions", "Permissions"),
            entry("audit-log", "Audit Log"),
        ],
        dashboards: &[],
    },
];

/// Read-only view over the module registry.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    modules: &'static [Module],
}

impl Registry {
    /// The built-in ERP registry.
    pub fn builtin() -> Self {
        Self { modules: MODULES }
    }

    /// A registry over caller-provided modules.
    pub fn from_static(modules: &'static [Module]) -> Self {
        Self { modules }
    }

    pub fn get_module(&self, key: &str) -> Option<&'static Module> {
        self.modules.iter().find(|m| m.key == key)
    }

    pub fn modules(&self) -> &'static [Module] {
        self.modules
    }

    pub fn list_module_keys(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.key).collect()
    }

    pub fn list_features(&self, module_key: &str) -> Vec<EntryInfo> {
        self.get_module(module_key)
            .map(|m| resolve(m.key, m.features))
            .unwrap_or_default()
    }

    pub fn list_dashboards(&self, module_key: &str) -> Vec<EntryInfo> {
        self.get_module(module_key)
            .map(|m| resolve(m.key, m.dashboards))
            .unwrap_or_default()
    }

    /// True when `segment` names a feature or dashboard of `module_key`.
    pub fn is_known_segment(&self, module_key: &str, segment: &str) -> bool {
        self.get_module(module_key).is_some_and(|m| {
            m.features.iter().any(|e| e.key == segment)
                || m.dashboards.iter().any(|e| e.key == segment)
        })
    }

    /// First module declaring a feature or dashboard with this bare key.
    pub fn module_for_feature(&self, feature_key: &str) -> Option<&'static str> {
        self.modules
            .iter()
            .find(|m| {
                m.features.iter().any(|e| e.key == feature_key)
                    || m.dashboards.iter().any(|e| e.key == feature_key)
            })
            .map(|m| m.key)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn resolve(module_key: &str, entries: &[Entry]) -> Vec<EntryInfo> {
    entries
        .iter()
        .map(|e| EntryInfo {
            key: e.key.to_string(),
            canonical_key: FeatureKey::canonical(module_key, e.key).into_string(),
            label: e.label.to_string(),
        })
        .collect()
}
