use serde::{Deserialize, Serialize};

/// Alert severity. The ordering matters: score deductions and status
/// derivation compare severities, so `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Audit category. `ALL` fixes the evaluation (and report) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ports,
    Authentication,
    Firewall,
    Vulnerabilities,
    Network,
    Permissions,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Ports,
        Category::Authentication,
        Category::Firewall,
        Category::Vulnerabilities,
        Category::Network,
        Category::Permissions,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Ports => write!(f, "ports"),
            Category::Authentication => write!(f, "authentication"),
            Category::Firewall => write!(f, "firewall"),
            Category::Vulnerabilities => write!(f, "vulnerabilities"),
            Category::Network => write!(f, "network"),
            Category::Permissions => write!(f, "permissions"),
        }
    }
}

/// A single actionable finding. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Alert {
    pub fn new(category: Category, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            details: None,
            recommendation: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}
