//! The monthly budget and how current spending compares to it.

use rusqlite::Connection;
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    setting::{MONTHLY_BUDGET_KEY, get_setting, set_setting},
    transaction::to_epoch_millis,
};

/// The fraction of the budget left at or below which a warning is raised.
pub const WARNING_THRESHOLD: f64 = 0.20;

/// Whether setting the budget created it or changed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetChange {
    /// There was no budget before (it was zero).
    Added,
    /// An existing budget was replaced.
    Updated,
}

/// How this month's spending compares to the monthly budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetStatus {
    /// No budget has been set, so there is nothing to check.
    Unset,
    /// More than [WARNING_THRESHOLD] of the budget is left.
    WithinBudget,
    /// At most [WARNING_THRESHOLD] of the budget is left.
    Warning {
        /// The percentage of the budget still available, e.g. `15.0`.
        remaining_percentage: f64,
    },
    /// Spending is over the budget.
    Exceeded {
        /// How much spending is over the budget.
        by: f64,
    },
}

/// The budget figures for the current month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetSummary {
    /// The monthly budget, zero if unset.
    pub budget: f64,
    /// The total spent this month.
    pub expenses: f64,
    /// `budget - expenses`, negative when over budget.
    pub remaining: f64,
    /// The remaining budget as a percentage of the budget, `None` if unset.
    pub remaining_percentage: Option<f64>,
    /// The classification of the figures above.
    pub status: BudgetStatus,
}

/// Set the monthly budget.
///
/// An amount of zero unsets the budget.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeBudget] if `amount` is less than zero,
/// - [Error::InvalidAmount] if `amount` is NaN or infinite,
/// - or [Error::SqlError] if the budget could not be saved.
///
/// A stored budget that is not a number is treated as unset and replaced.
///
/// The stored budget is unchanged when an error is returned.
pub fn set_monthly_budget(amount: f64, connection: &Connection) -> Result<BudgetChange, Error> {
    if !amount.is_finite() {
        return Err(Error::InvalidAmount(amount.to_string()));
    }

    if amount < 0.0 {
        return Err(Error::NegativeBudget(amount));
    }

    let previous = match get_monthly_budget(connection) {
        Ok(previous) => previous,
        Err(Error::InvalidAmount(text)) => {
            tracing::warn!("replacing invalid stored monthly budget {text:?}");
            0.0
        }
        Err(error) => return Err(error),
    };
    set_setting(MONTHLY_BUDGET_KEY, &amount.to_string(), connection)?;

    let change = if previous == 0.0 {
        BudgetChange::Added
    } else {
        BudgetChange::Updated
    };

    tracing::info!("monthly budget set to {amount} (previously {previous}): {change:?}");

    Ok(change)
}

/// Get the monthly budget, zero if it has never been set.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the stored value is not a number,
/// - or [Error::SqlError] if the query fails.
pub fn get_monthly_budget(connection: &Connection) -> Result<f64, Error> {
    match get_setting(MONTHLY_BUDGET_KEY, connection)? {
        Some(text) => text.parse().map_err(|_| Error::InvalidAmount(text)),
        None => Ok(0.0),
    }
}

/// The total spent in the calendar month containing `now`.
///
/// The month boundaries are taken in `now`'s UTC offset, so pass the local
/// time. Expenses are summed as positive values.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn current_month_expenses(now: OffsetDateTime, connection: &Connection) -> Result<f64, Error> {
    let (start, end) = month_bounds(now)?;

    connection
        .query_row(
            "SELECT COALESCE(SUM(-amount), 0.0) FROM \"transaction\"
             WHERE amount < 0 AND date >= ?1 AND date < ?2",
            (to_epoch_millis(start), to_epoch_millis(end)),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Classify this month's spending against the monthly budget.
///
/// `now` should be the local time, see [current_month_expenses].
///
/// # Errors
/// Returns an error if the budget or expenses could not be read.
pub fn check_budget_status(
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<BudgetStatus, Error> {
    let budget = get_monthly_budget(connection)?;

    if budget == 0.0 {
        tracing::debug!("no monthly budget set");
        return Ok(BudgetStatus::Unset);
    }

    let expenses = current_month_expenses(now, connection)?;
    tracing::debug!("current month expenses: {expenses}, monthly budget: {budget}");

    let status = classify_budget(budget, expenses);
    match status {
        BudgetStatus::Exceeded { by } => tracing::info!("budget exceeded by {by}"),
        BudgetStatus::Warning {
            remaining_percentage,
        } => tracing::info!("budget warning: {remaining_percentage:.0}% remaining"),
        _ => {}
    }

    Ok(status)
}

/// Get the budget, spending and remaining amount for the month containing `now`.
///
/// # Errors
/// Returns an error if the budget or expenses could not be read.
pub fn get_budget_summary(
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<BudgetSummary, Error> {
    let budget = get_monthly_budget(connection)?;
    let expenses = current_month_expenses(now, connection)?;
    let remaining = budget - expenses;

    Ok(BudgetSummary {
        budget,
        expenses,
        remaining,
        remaining_percentage: (budget > 0.0).then(|| remaining * 100.0 / budget),
        status: classify_budget(budget, expenses),
    })
}

/// Classify `expenses` against `budget`.
///
/// Going over the budget takes precedence over the low budget warning.
///
/// # Examples
/// ```
/// use wealthwave::{BudgetStatus, classify_budget};
///
/// assert_eq!(classify_budget(0.0, 50.0), BudgetStatus::Unset);
/// assert_eq!(classify_budget(1000.0, 1050.0), BudgetStatus::Exceeded { by: 50.0 });
/// assert_eq!(classify_budget(1000.0, 100.0), BudgetStatus::WithinBudget);
/// ```
pub fn classify_budget(budget: f64, expenses: f64) -> BudgetStatus {
    if budget <= 0.0 {
        return BudgetStatus::Unset;
    }

    let remaining = budget - expenses;
    let remaining_fraction = remaining / budget;

    if remaining < 0.0 {
        BudgetStatus::Exceeded { by: -remaining }
    } else if remaining_fraction <= WARNING_THRESHOLD {
        BudgetStatus::Warning {
            remaining_percentage: remaining * 100.0 / budget,
        }
    } else {
        BudgetStatus::WithinBudget
    }
}

/// The start (inclusive) and end (exclusive) of the calendar month containing
/// `now`, in `now`'s offset.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the month ends after the last
/// representable date.
fn month_bounds(now: OffsetDateTime) -> Result<(OffsetDateTime, OffsetDateTime), Error> {
    let date = now.date();
    let (next_year, next_month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        month => (date.year(), month.next()),
    };

    let first_day = |year, month| {
        Date::from_calendar_date(year, month, 1)
            .map(|day| day.midnight().assume_offset(now.offset()))
            .map_err(|error| Error::DateOutOfRange(format!("{year}-{month}: {error}")))
    };

    Ok((
        first_day(date.year(), date.month())?,
        first_day(next_year, next_month)?,
    ))
}
