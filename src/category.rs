//! Category names for transactions.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, transaction::TransactionType};

const INCOME_CATEGORIES: &[&str] = &["Salary", "Business", "Investment", "Gift"];

const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Utilities",
    "Shopping",
    "Entertainment",
    "Health",
    "Education",
    "Other",
];

/// The categories offered by default for transactions of type `kind`.
///
/// Categories are free text, so these are suggestions rather than a closed set.
pub fn default_categories(kind: TransactionType) -> &'static [&'static str] {
    match kind {
        TransactionType::Income => INCOME_CATEGORIES,
        TransactionType::Expense => EXPENSE_CATEGORIES,
    }
}

/// A validated, non-empty category name, e.g. "Food & Dining".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategory] if `name` is empty
    /// or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategory)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub(crate) fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl TryFrom<String> for CategoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CategoryName::new(&value)
    }
}

impl From<CategoryName> for String {
    fn from(value: CategoryName) -> Self {
        value.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, TransactionType, category::CategoryName, default_categories};

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(CategoryName::new(""), Err(Error::EmptyCategory));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(CategoryName::new("\n\t \r"), Err(Error::EmptyCategory));
    }

    #[test]
    fn new_trims_whitespace() {
        let name = CategoryName::new("  Health ").unwrap();

        assert_eq!(name.as_ref(), "Health");
    }

    #[test]
    fn deserialize_rejects_empty_name() {
        let result = serde_json::from_str::<CategoryName>("\"  \"");

        assert!(result.is_err());
    }

    #[test]
    fn default_sets_differ_per_type() {
        let income = default_categories(TransactionType::Income);
        let expense = default_categories(TransactionType::Expense);

        assert!(income.contains(&"Salary"));
        assert!(expense.contains(&"Food & Dining"));
        assert!(income.iter().all(|category| !expense.contains(category)));
    }
}
