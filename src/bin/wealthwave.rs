use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{Date, OffsetDateTime, UtcOffset, macros::format_description};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use wealthwave::{
    BackupDirectory, BudgetChange, BudgetStatus, Error, Transaction, TransactionId,
    TransactionType, clear_transactions, create_backup, create_transaction, default_categories,
    delete_transaction, expenses_by_category, get_all_transactions, get_budget_summary,
    get_currency, get_last_backup_time, get_transaction, get_transactions_in_range,
    initialize_db, now_in_timezone, parse_amount, restore_backup, run_daily_reminder,
    set_currency, set_monthly_budget, summarise, update_transaction,
};

/// A personal finance ledger with a monthly budget and JSON backups.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "WEALTHWAVE_DB", default_value = "wealthwave.db")]
    db_path: PathBuf,

    /// The directory backups are written to and restored from.
    #[arg(long, env = "WEALTHWAVE_BACKUP_DIR", default_value = "wealthwave_backups")]
    backup_dir: PathBuf,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, env = "WEALTHWAVE_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a new transaction.
    Add {
        /// A short name for the transaction.
        label: String,
        /// The amount, without a sign.
        amount: String,
        /// Either "income" or "expense".
        #[arg(long = "type", short = 't', default_value_t = TransactionType::Expense)]
        kind: TransactionType,
        /// The category, see `categories` for suggestions.
        #[arg(long, short)]
        category: String,
        #[arg(long, short)]
        description: Option<String>,
        /// The local date as YYYY-MM-DD, defaults to now.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// List transactions, newest first.
    List {
        /// Only show transactions on or after this local date.
        #[arg(long, value_parser = parse_date)]
        from: Option<Date>,
        /// Only show transactions before this local date.
        #[arg(long, value_parser = parse_date, requires = "from")]
        to: Option<Date>,
    },
    /// Change an existing transaction.
    Update {
        id: TransactionId,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long = "type", short = 't')]
        kind: Option<TransactionType>,
        #[arg(long, short)]
        category: Option<String>,
        /// Pass an empty string to remove the description.
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// Delete a transaction.
    Delete { id: TransactionId },
    /// Delete every transaction.
    Clear {
        /// Confirm that every transaction should be deleted.
        #[arg(long)]
        yes: bool,
    },
    /// Show or change the monthly budget.
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// Show totals and spending per category.
    Summary,
    /// Show the suggested categories.
    Categories {
        #[arg(long = "type", short = 't', default_value_t = TransactionType::Expense)]
        kind: TransactionType,
    },
    /// Create, list, restore and delete backups.
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Print the daily reminder if it has not been shown today.
    Remind,
    /// Show or change the currency symbol.
    Currency { symbol: Option<String> },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    /// Set the monthly budget, zero to unset it.
    Set { amount: String },
    /// Show this month's spending against the budget.
    Show,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    /// Write a backup of every transaction.
    Create,
    /// List backups, newest first.
    List,
    /// Replace every transaction with those in a backup.
    Restore {
        /// A backup file name or path.
        file: PathBuf,
    },
    /// Delete a backup file.
    Delete {
        /// A backup file name or path.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        eprintln!("Could not open log file: {error}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let now = now_in_timezone(&args.timezone);
    let currency = get_currency(&connection)?;
    let backups = BackupDirectory::new(args.backup_dir);

    match args.command {
        Command::Add {
            label,
            amount,
            kind,
            category,
            description,
            date,
        } => {
            let amount = parse_amount(&amount)?;
            let date = date.map_or(now, |date| start_of_day(date, now.offset()));
            let transaction = Transaction::build(&label, amount, kind, &category)
                .description(description.as_deref().unwrap_or_default())
                .date(date)
                .finalise()?;
            let transaction = create_transaction(transaction, &connection)?;

            println!("Added transaction {}", transaction.id);
        }
        Command::List { from, to } => {
            let transactions = match from {
                Some(from) => {
                    let start = start_of_day(from, now.offset());
                    let end = to.map_or(now + time::Duration::days(1), |to| {
                        start_of_day(to, now.offset())
                    });
                    get_transactions_in_range(start, end, &connection)?
                }
                None => get_all_transactions(&connection)?,
            };

            if transactions.is_empty() {
                println!("No transactions.");
            }

            for transaction in transactions {
                print_transaction(&transaction, now.offset(), &currency);
            }
        }
        Command::Update {
            id,
            label,
            amount,
            kind,
            category,
            description,
            date,
        } => {
            let mut builder = get_transaction(id, &connection)?.to_builder();

            if let Some(label) = label {
                builder = builder.label(&label);
            }
            if let Some(amount) = amount {
                builder = builder.amount(parse_amount(&amount)?);
            }
            if let Some(kind) = kind {
                builder = builder.kind(kind);
            }
            if let Some(category) = category {
                builder = builder.category(&category);
            }
            if let Some(description) = description {
                builder = builder.description(&description);
            }
            if let Some(date) = date {
                builder = builder.date(start_of_day(date, now.offset()));
            }

            match update_transaction(id, builder.finalise()?, &connection)? {
                0 => return Err(Error::NotFound),
                _ => println!("Updated transaction {id}"),
            }
        }
        Command::Delete { id } => match delete_transaction(id, &connection)? {
            0 => return Err(Error::NotFound),
            _ => println!("Deleted transaction {id}"),
        },
        Command::Clear { yes } => {
            if !yes {
                println!("Pass --yes to delete every transaction.");
                return Ok(());
            }

            let count = clear_transactions(&connection)?;
            println!("Deleted {count} transaction(s)");
        }
        Command::Budget(BudgetCommand::Set { amount }) => {
            let amount = parse_amount(&amount)?;

            match set_monthly_budget(amount, &connection)? {
                BudgetChange::Added => println!("Budget set to {}", money(amount, &currency)),
                BudgetChange::Updated => println!("Budget updated to {}", money(amount, &currency)),
            }
        }
        Command::Budget(BudgetCommand::Show) => {
            let summary = get_budget_summary(now, &connection)?;

            if summary.status == BudgetStatus::Unset {
                println!("No monthly budget set.");
                return Ok(());
            }

            println!("Budget:    {}", money(summary.budget, &currency));
            println!("Spent:     {}", money(summary.expenses, &currency));
            println!("Remaining: {}", money(summary.remaining, &currency));
            print_budget_status(summary.status, &currency);
        }
        Command::Summary => {
            let transactions = get_all_transactions(&connection)?;
            let summary = summarise(&transactions);

            println!("Income:   {}", money(summary.income, &currency));
            println!("Expenses: {}", money(summary.expenses, &currency));
            println!("Balance:  {}", money(summary.balance, &currency));

            let totals = expenses_by_category(&transactions);

            if !totals.is_empty() {
                println!();
            }

            for total in totals {
                println!("{:<20} {}", total.category, money(total.total, &currency));
            }
        }
        Command::Categories { kind } => {
            for category in default_categories(kind) {
                println!("{category}");
            }
        }
        Command::Backup(BackupCommand::Create) => {
            let path = create_backup(now, &backups, &connection)?;
            println!("Backup written to {}", path.display());
        }
        Command::Backup(BackupCommand::List) => {
            let files = backups.list()?;

            if files.is_empty() {
                println!("No backups in {}", backups.path().display());
            }

            for file in files {
                println!("{} ({} bytes)", file.name, file.size);
            }

            if let Some(last_backup) = get_last_backup_time(&connection)? {
                println!("Last backup: {}", format_local(last_backup, now.offset()));
            }
        }
        Command::Backup(BackupCommand::Restore { file }) => {
            let backup = backups.read(&file)?;
            let count = restore_backup(&backup, &connection)?;
            println!("Restored {count} transaction(s)");
        }
        Command::Backup(BackupCommand::Delete { file }) => {
            if backups.delete(&file) {
                println!("Deleted {}", file.display());
            } else {
                println!("Could not delete {}", file.display());
            }
        }
        Command::Remind => {
            let fired = run_daily_reminder(now.date(), &connection, || {
                println!("Don't forget to record today's expenses!");
            })?;

            if !fired {
                tracing::debug!("reminder already shown today");
            }
        }
        Command::Currency { symbol: None } => println!("{currency}"),
        Command::Currency {
            symbol: Some(symbol),
        } => {
            set_currency(&symbol, &connection)?;
            println!("Currency set to {}", get_currency(&connection)?);
        }
    }

    Ok(())
}

fn setup_logging(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(debug_log)
        .init();

    Ok(())
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn start_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.midnight().assume_offset(offset)
}

fn format_local(date: OffsetDateTime, offset: UtcOffset) -> String {
    let local = date.to_offset(offset);

    format!(
        "{} {:02}:{:02}",
        local.date(),
        local.hour(),
        local.minute()
    )
}

fn money(amount: f64, currency: &str) -> String {
    if amount < 0.0 {
        format!("-{currency}{:.2}", -amount)
    } else {
        format!("{currency}{amount:.2}")
    }
}

fn print_transaction(transaction: &Transaction, offset: UtcOffset, currency: &str) {
    println!(
        "{:>5}  {}  {:<24} {:>12}  {}",
        transaction.id,
        format_local(transaction.date, offset),
        transaction.label.as_ref(),
        money(transaction.amount, currency),
        transaction.category,
    );

    if let Some(description) = &transaction.description {
        println!("       {description}");
    }
}

fn print_budget_status(status: BudgetStatus, currency: &str) {
    match status {
        BudgetStatus::Unset | BudgetStatus::WithinBudget => {}
        BudgetStatus::Warning {
            remaining_percentage,
        } => println!("Warning: only {remaining_percentage:.1}% of your budget is left."),
        BudgetStatus::Exceeded { by } => {
            println!("Budget exceeded by {}!", money(by, currency))
        }
    }
}
