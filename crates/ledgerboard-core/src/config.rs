use ledgerboard_loader::DatePolicy;
use serde::{Deserialize, Serialize};

/// How transactions referencing an unknown employee participate in the
/// company-wide totals. They are never dropped from the joined table and
/// never aggregated per group; this only decides whether they count toward
/// `total_sales` / `total_cost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    KeepInTotals,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Per-group performance ratio at or above which a group counts as
    /// well-performing.
    pub well_performing_threshold: f64,
    pub unmatched_policy: UnmatchedPolicy,
    pub date_policy: DatePolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            well_performing_threshold: 3.0,
            unmatched_policy: UnmatchedPolicy::default(),
            date_policy: DatePolicy::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
