use ledgerboard_loader::columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::JoinedRecords;

/// Explicit filter state passed into every pipeline run. Equality on
/// year/month, membership on the id lists; `None`/empty means unrestricted.
/// Replaces the implicit "last clicked" session state of the dashboard
/// variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub branch_ids: Vec<String>,
    pub employee_ids: Vec<String>,
}

impl FilterState {
    pub fn is_unrestricted(&self) -> bool {
        self.year.is_none()
            && self.month.is_none()
            && self.branch_ids.is_empty()
            && self.employee_ids.is_empty()
    }
}

/// Restricts the joined table to rows matching the filter. Branch membership
/// matches the joined (post-lookup) branch id; employee membership matches
/// the transaction's own employee reference.
pub fn apply_filter(joined: &JoinedRecords, filter: &FilterState) -> Result<JoinedRecords> {
    if filter.is_unrestricted() {
        return Ok(joined.clone());
    }

    let df = &joined.df;
    let years = df.column(columns::YEAR)?.i32()?;
    let months = df.column(columns::MONTH)?.i32()?;
    let branch_ids = df.column(columns::BRANCH_ID)?.str()?;
    let employee_ids = df.column(columns::EMPLOYEE_ID)?.str()?;

    let mut mask = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut keep = true;

        if let Some(wanted) = filter.year {
            keep &= years.get(idx) == Some(wanted);
        }
        if let Some(wanted) = filter.month {
            keep &= months.get(idx) == Some(wanted);
        }
        if !filter.branch_ids.is_empty() {
            keep &= branch_ids
                .get(idx)
                .map(|id| filter.branch_ids.iter().any(|wanted| wanted == id))
                .unwrap_or(false);
        }
        if !filter.employee_ids.is_empty() {
            keep &= employee_ids
                .get(idx)
                .map(|id| filter.employee_ids.iter().any(|wanted| wanted == id))
                .unwrap_or(false);
        }

        mask.push(keep);
    }

    let mask = BooleanChunked::from_slice("filter_mask".into(), &mask);
    let df = df.filter(&mask)?;

    Ok(JoinedRecords { df })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_unrestricted() {
        assert!(FilterState::default().is_unrestricted());
        assert!(!FilterState {
            year: Some(2024),
            ..FilterState::default()
        }
        .is_unrestricted());
    }
}
