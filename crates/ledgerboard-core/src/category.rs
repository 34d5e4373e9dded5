use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Broad class a transaction category belongs to. Categories are an open
/// set; anything outside the synonym table classifies as `Other` and still
/// gets its own pivot column, but contributes nothing to net income or the
/// sales/cost totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryClass {
    Revenue,
    Expense,
    Compensation,
    Other,
}

impl CategoryClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryClass::Revenue => "revenue",
            CategoryClass::Expense => "expense",
            CategoryClass::Compensation => "compensation",
            CategoryClass::Other => "other",
        }
    }
}

impl fmt::Display for CategoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static SYNONYMS: Lazy<HashMap<&'static str, CategoryClass>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for name in ["revenue", "sales", "sale", "income"] {
        map.insert(name, CategoryClass::Revenue);
    }
    for name in ["expense", "expenses", "cost", "costs"] {
        map.insert(name, CategoryClass::Expense);
    }
    for name in ["salary", "salaries", "compensation", "payroll", "wages"] {
        map.insert(name, CategoryClass::Compensation);
    }
    map
});

pub fn classify(category: &str) -> CategoryClass {
    let normalized = category.trim().to_ascii_lowercase();
    SYNONYMS
        .get(normalized.as_str())
        .copied()
        .unwrap_or(CategoryClass::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_synonyms() {
        assert_eq!(classify("Revenue"), CategoryClass::Revenue);
        assert_eq!(classify("SALES"), CategoryClass::Revenue);
        assert_eq!(classify("expense"), CategoryClass::Expense);
        assert_eq!(classify("Salary"), CategoryClass::Compensation);
        assert_eq!(classify(" payroll "), CategoryClass::Compensation);
    }

    #[test]
    fn unknown_categories_fall_through_to_other() {
        assert_eq!(classify("Misc"), CategoryClass::Other);
        assert_eq!(classify(""), CategoryClass::Other);
    }
}
