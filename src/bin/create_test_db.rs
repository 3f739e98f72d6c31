use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use wealthwave::{
    Transaction, TransactionType, create_transaction, initialize_db, set_monthly_budget,
};

/// A utility for creating a test database for wealthwave.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The monthly budget to set.
    #[arg(long, short, default_value_t = 1000.0)]
    budget: f64,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test transactions...");

    let now = OffsetDateTime::now_utc();
    let sample = [
        ("Salary", 3200.0, TransactionType::Income, "Salary", 0),
        ("Groceries", 84.3, TransactionType::Expense, "Food & Dining", 1),
        ("Bus pass", 45.0, TransactionType::Expense, "Transportation", 2),
        ("Power bill", 162.75, TransactionType::Expense, "Utilities", 3),
        ("Movie night", 38.0, TransactionType::Expense, "Entertainment", 5),
        ("Birthday money", 50.0, TransactionType::Income, "Gift", 8),
        ("Pharmacy", 22.4, TransactionType::Expense, "Health", 13),
        ("Textbook", 95.0, TransactionType::Expense, "Education", 21),
        ("New shoes", 129.99, TransactionType::Expense, "Shopping", 34),
    ];

    for (label, amount, kind, category, days_ago) in sample {
        let transaction = Transaction::build(label, amount, kind, category)
            .date(now - Duration::days(days_ago))
            .finalise()?;

        create_transaction(transaction, &conn)?;
    }

    println!("Setting the monthly budget to {:.2}...", args.budget);
    set_monthly_budget(args.budget, &conn)?;

    println!("Success!");

    Ok(())
}
