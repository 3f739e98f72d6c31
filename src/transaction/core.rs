//! Defines the core data models for transactions.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, category::CategoryName, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
///
/// The direction of a stored transaction is never saved on its own, it is
/// always derived from the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money earned, stored as a positive (or zero) amount.
    Income,
    /// Money spent, stored as a negative amount.
    Expense,
}

impl TransactionType {
    /// The direction implied by a signed `amount`.
    ///
    /// Zero counts as income.
    pub fn of_amount(amount: f64) -> Self {
        if amount < 0.0 {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }

    /// Apply this direction to the magnitude of `amount`.
    pub fn signed(self, amount: f64) -> f64 {
        let magnitude = amount.abs();

        match self {
            TransactionType::Income => magnitude,
            TransactionType::Expense if magnitude == 0.0 => 0.0,
            TransactionType::Expense => -magnitude,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "INCOME"),
            TransactionType::Expense => write!(f, "EXPENSE"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

/// A validated, non-empty display label for a transaction, e.g. "Groceries".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    /// Create a label.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyLabel] if `label` is empty or
    /// only whitespace.
    pub fn new(label: &str) -> Result<Self, Error> {
        let label = label.trim();

        if label.is_empty() {
            Err(Error::EmptyLabel)
        } else {
            Ok(Self(label.to_string()))
        }
    }

    /// Create a label without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub(crate) fn new_unchecked(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Label {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Label::new(&value)
    }
}

impl From<Label> for String {
    fn from(value: Label) -> Self {
        value.0
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are read from the database. To create a new one, use
/// [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// What the transaction was for.
    pub label: Label,
    /// The amount of money earned (positive) or spent (negative).
    pub amount: f64,
    /// The category the transaction belongs to.
    pub category: CategoryName,
    /// Optional free text notes.
    pub description: Option<String>,
    /// When the transaction was recorded, with millisecond precision.
    pub date: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// `amount` is treated as a magnitude and its sign is set from `kind`, so
    /// `build("Rent", 1200.0, TransactionType::Expense, "Utilities")` records
    /// an amount of `-1200.0`.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        label: &str,
        amount: f64,
        kind: TransactionType,
        category: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            label: label.to_owned(),
            amount,
            kind,
            category: category.to_owned(),
            description: None,
            date: OffsetDateTime::now_utc(),
        }
    }

    /// Whether this transaction is income or an expense.
    pub fn kind(&self) -> TransactionType {
        TransactionType::of_amount(self.amount)
    }

    /// A builder prefilled with this transaction's fields, for editing.
    pub fn to_builder(&self) -> TransactionBuilder {
        TransactionBuilder {
            label: self.label.to_string(),
            amount: self.amount,
            kind: self.kind(),
            category: self.category.to_string(),
            description: self.description.clone(),
            date: self.date,
        }
    }
}

/// A builder for creating [NewTransaction] instances.
///
/// # Examples
///
/// ```
/// use time::macros::datetime;
/// use wealthwave::{Transaction, TransactionType};
///
/// let transaction = Transaction::build("Lunch", 12.5, TransactionType::Expense, "Food & Dining")
///     .description("Noodles with Sam")
///     .date(datetime!(2025-01-15 12:30 UTC))
///     .finalise()
///     .unwrap();
///
/// assert_eq!(transaction.amount(), -12.5);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    label: String,
    amount: f64,
    kind: TransactionType,
    category: String,
    description: Option<String>,
    date: OffsetDateTime,
}

impl TransactionBuilder {
    /// Set the free text description. Empty text clears the description.
    pub fn description(mut self, description: &str) -> Self {
        let description = description.trim();
        self.description = (!description.is_empty()).then(|| description.to_owned());
        self
    }

    /// Set the label.
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    /// Set the magnitude of the amount.
    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// Set whether this is income or an expense.
    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = kind;
        self
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set when the transaction happened. Defaults to now.
    pub fn date(mut self, date: OffsetDateTime) -> Self {
        self.date = date;
        self
    }

    /// Validate the fields and create the transaction.
    ///
    /// The date is converted to UTC and truncated to whole milliseconds, the
    /// precision it is stored with.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyLabel] if the label is empty,
    /// - [Error::EmptyCategory] if the category is empty,
    /// - or [Error::InvalidAmount] if the amount is NaN or infinite.
    pub fn finalise(self) -> Result<NewTransaction, Error> {
        let label = Label::new(&self.label)?;
        let category = CategoryName::new(&self.category)?;

        if !self.amount.is_finite() {
            return Err(Error::InvalidAmount(self.amount.to_string()));
        }

        Ok(NewTransaction {
            label,
            amount: self.kind.signed(self.amount),
            category,
            description: self.description,
            date: truncate_to_millis(self.date),
        })
    }
}

/// A validated transaction that has not been saved yet.
///
/// Since it has no ID, a caller cannot choose the ID of a stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    label: Label,
    amount: f64,
    category: CategoryName,
    description: Option<String>,
    date: OffsetDateTime,
}

impl NewTransaction {
    /// The display label.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// The signed amount, negative for expenses.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Whether this transaction is income or an expense.
    pub fn kind(&self) -> TransactionType {
        TransactionType::of_amount(self.amount)
    }

    /// The category.
    pub fn category(&self) -> &CategoryName {
        &self.category
    }

    /// The optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// When the transaction happened.
    pub fn date(&self) -> OffsetDateTime {
        self.date
    }
}

/// Parse a user-entered amount such as "12.50".
///
/// # Errors
/// Returns [Error::InvalidAmount] if `text` is empty, is not a number, or is
/// not finite.
pub fn parse_amount(text: &str) -> Result<f64, Error> {
    let text = text.trim();

    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(Error::InvalidAmount(text.to_owned())),
    }
}

// ============================================================================
// EPOCH MILLISECONDS
// ============================================================================

/// Convert `date` to milliseconds since the Unix epoch.
pub(crate) fn to_epoch_millis(date: OffsetDateTime) -> i64 {
    (date.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Convert milliseconds since the Unix epoch to a UTC date time.
///
/// # Errors
/// Returns an error if `millis` is outside the range `time` can represent.
pub(crate) fn from_epoch_millis(
    millis: i64,
) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
}

fn truncate_to_millis(date: OffsetDateTime) -> OffsetDateTime {
    let date = date.to_offset(UtcOffset::UTC);
    let millis = date.millisecond();

    date.replace_nanosecond(millis as u32 * 1_000_000)
        .unwrap_or(date)
}

/// Serde helpers for encoding date times as epoch milliseconds.
pub(crate) mod epoch_millis {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        date: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::to_epoch_millis(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;

        super::from_epoch_millis(millis).map_err(de::Error::custom)
    }
}
