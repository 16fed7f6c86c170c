use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::application::{Outcome, SyncStatus, TrackerService};
use crate::domain::{Cents, TransactionKind, format_cents, parse_user_amount, shift_month};
use crate::io::{Exporter, Importer, backup_file_name};
use crate::storage::SqliteStore;

type Service = TrackerService<SqliteStore>;

/// Tallybook - bills, income and savings on top of a starting balance
#[derive(Parser)]
#[command(name = "tallybook")]
#[command(about = "Track bills, income and savings against a starting balance")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TALLYBOOK_DB", default_value = "tallybook.db")]
    pub database: String,

    /// Whose ledger to open
    #[arg(short, long, env = "TALLYBOOK_USER", default_value = "local")]
    pub user: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Add a bill or an income
    Add {
        /// Display name (e.g. "Rent")
        name: String,

        /// Amount (e.g. "1200" or "$1,200.00")
        amount: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Transaction type: expense, income
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: TransactionKind,
    },

    /// Replace the details of a transaction (keeps its paid status)
    Edit {
        /// Transaction ID
        id: i64,

        name: String,

        amount: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Transaction type: expense, income
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: TransactionKind,
    },

    /// Delete a transaction
    Remove {
        /// Transaction ID
        id: i64,
    },

    /// Mark a bill paid (or an income received), or undo it
    Toggle {
        /// Transaction ID
        id: i64,
    },

    /// List transactions by due date
    List,

    /// Show totals and the projected balance
    Summary,

    /// Starting balance commands
    #[command(subcommand)]
    Balance(BalanceCommands),

    /// Mark or unmark a day on the calendar
    Clean {
        /// Day to toggle (YYYY-MM-DD)
        date: String,
    },

    /// Show a month with cleaned days and due dates
    Calendar {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Months to move from there (e.g. -1 for the previous month)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset: i32,
    },

    /// Largest income and expense entries grouped by name
    Breakdown {
        /// Groups to show per side
        #[arg(short, long, default_value = "4")]
        limit: usize,
    },

    /// Savings account commands
    #[command(subcommand)]
    Savings(SavingsCommands),

    /// Export a backup (JSON) or the transaction list (CSV)
    Export {
        /// Output file ("-" for stdout, defaults to a dated file name)
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
    },

    /// Restore a JSON backup, replacing all current data
    Import {
        /// Backup file
        input: String,
    },

    /// List everyone with saved data in this database
    Users,

    /// Delete all data for this user
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Set the starting balance
    Set {
        /// Amount (e.g. "500" or "-20.50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Reset the starting balance to zero
    Reset,
}

#[derive(Subcommand)]
pub enum SavingsCommands {
    /// List savings accounts
    List,

    /// Open a savings account with its current balance
    Add {
        name: String,

        /// Current balance
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Deposit cash or outside money (does not touch checking)
    Deposit {
        /// Account number as shown by `savings list`
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        account: u64,

        amount: String,
    },

    /// Move money from checking into an account
    Transfer {
        /// Account number as shown by `savings list`
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        account: u64,

        amount: String,
    },

    /// Move money from an account back to checking
    Withdraw {
        /// Account number as shown by `savings list`
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        account: u64,

        amount: String,
    },

    /// Close an account (past transfers stay in the transaction list)
    Remove {
        /// Account number as shown by `savings list`
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        account: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl Cli {
    /// Install the log subscriber. `RUST_LOG` takes precedence over `--verbose`.
    pub fn init_tracing(&self) {
        let default = if self.verbose {
            "tallybook=debug"
        } else {
            "tallybook=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub async fn run(self) -> Result<()> {
        let mut service = TrackerService::init(&self.database, &self.user).await?;
        if let Some(err) = service.load_error() {
            eprintln!("Warning: could not load saved data ({}), starting empty", err);
        }

        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.database);
            }

            Commands::Add {
                name,
                amount,
                due,
                kind,
            } => {
                let amount = parse_amount(&amount)?;
                let due = due.as_deref().map(parse_date).transpose()?;
                let outcome = service.add_transaction(&name, amount, due, kind).await?;
                if let Some(id) = outcome.value {
                    println!("Added {} {}: {} ({})", kind, name.trim(), format_cents(amount), id);
                }
                report_sync(&outcome);
                print_summary(&service);
            }

            Commands::Edit {
                id,
                name,
                amount,
                due,
                kind,
            } => {
                let amount = parse_amount(&amount)?;
                let due = due.as_deref().map(parse_date).transpose()?;
                let outcome = service
                    .update_transaction(id, &name, amount, due, kind)
                    .await?;
                match outcome.value {
                    Some(()) => println!("Updated transaction {}", id),
                    None => println!("No transaction with ID {}, nothing changed", id),
                }
                report_sync(&outcome);
                print_summary(&service);
            }

            Commands::Remove { id } => {
                let outcome = service.remove_transaction(id).await?;
                match &outcome.value {
                    Some(tx) => println!("Removed {} ({})", tx.name, format_cents(tx.amount)),
                    None => println!("No transaction with ID {}, nothing changed", id),
                }
                report_sync(&outcome);
                print_summary(&service);
            }

            Commands::Toggle { id } => {
                let outcome = service.toggle_status(id).await?;
                match outcome.value {
                    Some(_) => {
                        if let Some(tx) = service.ledger().get(id) {
                            println!("{}: {}", tx.name, tx.status_label());
                        }
                    }
                    None => println!("No transaction with ID {}, nothing changed", id),
                }
                report_sync(&outcome);
                print_summary(&service);
            }

            Commands::List => {
                print_transactions(&service);
            }

            Commands::Summary => {
                print_summary(&service);
                println!("  Total savings:       {}", format_cents(service.total_savings()));
            }

            Commands::Balance(cmd) => {
                let outcome = match cmd {
                    BalanceCommands::Set { amount } => {
                        let amount = parse_amount(&amount)?;
                        service.set_initial_balance(amount).await
                    }
                    BalanceCommands::Reset => service.reset_initial_balance().await,
                };
                println!(
                    "Starting balance: {}",
                    format_cents(service.ledger().initial_balance())
                );
                report_sync(&outcome);
                print_summary(&service);
            }

            Commands::Clean { date } => {
                let date = parse_date(&date)?;
                let outcome = service.toggle_cleaned_day(date).await;
                if outcome.value == Some(true) {
                    println!("Marked {}", date);
                } else {
                    println!("Unmarked {}", date);
                }
                report_sync(&outcome);
            }

            Commands::Calendar { month, offset } => {
                let (year, month) = match month {
                    Some(m) => parse_month(&m)?,
                    None => {
                        let today = Utc::now().date_naive();
                        (today.year(), today.month())
                    }
                };
                let (year, month) = shift_month(year, month, offset)
                    .context("Month is out of range")?;
                print_calendar(&service, year, month)?;
            }

            Commands::Breakdown { limit } => {
                print_breakdown(&service, limit);
            }

            Commands::Savings(cmd) => {
                run_savings_command(&mut service, cmd).await?;
            }

            Commands::Export { output, format } => {
                run_export_command(&service, output.as_deref(), format)?;
            }

            Commands::Import { input } => {
                let file = File::open(&input)
                    .with_context(|| format!("Failed to open backup file '{}'", input))?;
                let outcome = Importer::new(&mut service)
                    .restore(BufReader::new(file))
                    .await?;
                if let Some(summary) = &outcome.value {
                    println!("Data restored from {}", input);
                    println!(
                        "  {} transactions, {} savings accounts, {} marked days, starting balance {}",
                        summary.transactions,
                        summary.savings_accounts,
                        summary.cleaned_days,
                        format_cents(summary.initial_balance)
                    );
                }
                report_sync(&outcome);
            }

            Commands::Users => {
                let users = service.store().list_users().await?;
                if users.is_empty() {
                    println!("No saved data yet.");
                }
                for user in users {
                    let marker = if user == self.user { "*" } else { " " };
                    println!("{} {}", marker, user);
                }
            }

            Commands::Reset { yes } => {
                if !yes {
                    bail!("This deletes ALL data for '{}'. Re-run with --yes to confirm", self.user);
                }
                service.reset_all().await?;
                println!("All data deleted for {}", self.user);
            }
        }

        Ok(())
    }
}

async fn run_savings_command(service: &mut Service, cmd: SavingsCommands) -> Result<()> {
    match cmd {
        SavingsCommands::List => {
            print_savings(service);
        }

        SavingsCommands::Add { name, amount } => {
            let amount = parse_amount(&amount)?;
            let outcome = service.add_account(&name, amount).await?;
            if let Some(index) = outcome.value {
                println!("Opened #{} {} with {}", index + 1, name.trim(), format_cents(amount));
            }
            report_sync(&outcome);
            print_savings(service);
        }

        SavingsCommands::Deposit { account, amount } => {
            let amount = parse_amount(&amount)?;
            let outcome = service.deposit(account_index(account), amount).await?;
            match outcome.value {
                Some(balance) => println!("Deposited {}, balance now {}", format_cents(amount), format_cents(balance)),
                None => println!("No savings account #{}, nothing changed", account),
            }
            report_sync(&outcome);
            print_savings(service);
        }

        SavingsCommands::Transfer { account, amount } => {
            let amount = parse_amount(&amount)?;
            let outcome = service
                .transfer_from_checking(account_index(account), amount)
                .await?;
            match outcome.value {
                Some(_) => println!(
                    "Transferred {} to {}",
                    format_cents(amount),
                    service.savings_accounts()[account_index(account)].name
                ),
                None => println!("No savings account #{}, nothing changed", account),
            }
            report_sync(&outcome);
            print_savings(service);
            print_summary(service);
        }

        SavingsCommands::Withdraw { account, amount } => {
            let amount = parse_amount(&amount)?;
            let outcome = service
                .withdraw_to_checking(account_index(account), amount)
                .await?;
            match outcome.value {
                Some(_) => println!("Transferred {} back to checking", format_cents(amount)),
                None => println!("No savings account #{}, nothing changed", account),
            }
            report_sync(&outcome);
            print_savings(service);
            print_summary(service);
        }

        SavingsCommands::Remove { account } => {
            let outcome = service.remove_account(account_index(account)).await?;
            match &outcome.value {
                Some(removed) => println!("Closed {} ({})", removed.name, format_cents(removed.amount)),
                None => println!("No savings account #{}, nothing changed", account),
            }
            report_sync(&outcome);
            print_savings(service);
        }
    }

    Ok(())
}

fn run_export_command(service: &Service, output: Option<&str>, format: ExportFormat) -> Result<()> {
    let today = Utc::now().date_naive();
    let path = match (output, format) {
        (Some(path), _) => path.to_string(),
        (None, ExportFormat::Json) => backup_file_name(today),
        (None, ExportFormat::Csv) => format!("finance-tracker-transactions-{}.csv", today.format("%Y-%m-%d")),
    };

    let writer: Box<dyn Write> = if path == "-" {
        Box::new(std::io::stdout())
    } else {
        let file = File::create(&path).with_context(|| format!("Failed to create '{}'", path))?;
        Box::new(BufWriter::new(file))
    };

    let exporter = Exporter::new(service.ledger());
    match format {
        ExportFormat::Json => {
            let backup = exporter.export_backup_json(writer, Utc::now())?;
            if path != "-" {
                println!(
                    "Backup written to {} ({} transactions, {} savings accounts)",
                    path,
                    backup.record.transactions.len(),
                    backup.record.savings.len()
                );
            }
        }
        ExportFormat::Csv => {
            let count = exporter.export_transactions_csv(writer)?;
            if path != "-" {
                println!("Exported {} transactions to {}", count, path);
            }
        }
    }

    Ok(())
}

fn print_summary(service: &Service) {
    let totals = service.totals();
    println!();
    println!("  Total income:        {}", format_cents(totals.total_income));
    println!("  Total expenses:      {}", format_cents(totals.total_expenses));
    println!("    paid:              {}", format_cents(totals.paid_expenses));
    println!("    pending:           {}", format_cents(totals.remaining_expenses));
    println!("  Net balance:         {}", format_cents(totals.net_balance));
    println!("  Projected balance:   {}", format_cents(totals.projected_balance));
}

fn print_transactions(service: &Service) {
    let transactions = service.ordered_transactions();
    if transactions.is_empty() {
        println!("No transactions yet.");
        return;
    }

    println!(
        "{:<14} {:<8} {:<28} {:>12}  {:<8}",
        "ID", "DUE", "NAME", "AMOUNT", "STATUS"
    );
    println!("{}", "-".repeat(74));
    for tx in transactions {
        let amount = if tx.is_income() {
            format!("+{}", format_cents(tx.amount))
        } else {
            format_cents(tx.amount)
        };
        println!(
            "{:<14} {:<8} {:<28} {:>12}  {:<8}",
            tx.id,
            tx.due_label(),
            truncate(&tx.name, 28),
            amount,
            tx.status_label()
        );
    }
}

fn print_savings(service: &Service) {
    let accounts = service.savings_accounts();
    if accounts.is_empty() {
        println!("No savings accounts yet.");
        return;
    }

    println!("{:<4} {:<28} {:>12}", "#", "ACCOUNT", "BALANCE");
    println!("{}", "-".repeat(46));
    for (i, account) in accounts.iter().enumerate() {
        println!(
            "{:<4} {:<28} {:>12}",
            i + 1,
            truncate(&account.name, 28),
            format_cents(account.amount)
        );
    }
    println!("{}", "-".repeat(46));
    println!("{:<33} {:>12}", "Total", format_cents(service.total_savings()));
}

fn print_calendar(service: &Service, year: i32, month: u32) -> Result<()> {
    let view = service.calendar_month(year, month)?;
    let title = view
        .first_day()
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();

    println!("{:^35}", title);
    println!(" Su   Mo   Tu   We   Th   Fr   Sa");

    let mut line = "     ".repeat(view.leading_blanks as usize);
    let mut column = view.leading_blanks;
    for day in &view.days {
        let cleaned = if day.cleaned { '*' } else { ' ' };
        let due = if day.due_count > 0 { '$' } else { ' ' };
        line.push_str(&format!(" {:>2}{}{}", day.date.day(), cleaned, due));
        column += 1;
        if column == 7 {
            println!("{}", line.trim_end());
            line.clear();
            column = 0;
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }
    println!();
    println!("  * cleaned   $ payment due");
    Ok(())
}

fn print_breakdown(service: &Service, limit: usize) {
    for (title, kind) in [
        ("Income", TransactionKind::Income),
        ("Expenses", TransactionKind::Expense),
    ] {
        println!("{}", title);
        let groups = service.breakdown(kind, limit);
        if groups.is_empty() {
            println!("  No data");
        }
        for group in groups {
            println!("  {:<28} {:>12}", truncate(&group.name, 28), format_cents(group.total));
        }
    }
}

fn report_sync<T>(outcome: &Outcome<T>) {
    if let SyncStatus::Failed(reason) = &outcome.sync {
        eprintln!("Warning: changes were not saved ({})", reason);
    }
}

fn account_index(position: u64) -> usize {
    usize::try_from(position.saturating_sub(1)).unwrap_or(usize::MAX)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_user_amount(input)
        .with_context(|| format!("Invalid amount '{}'. Use a number like 50.00", input))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", input))
}

fn parse_month(input: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", input.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}'. Use YYYY-MM", input))?;
    Ok((first.year(), first.month()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from([
            "tallybook", "add", "Paycheck", "$2,000", "--due", "2024-01-15", "--type", "income",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { name, amount, due, kind } => {
                assert_eq!(name, "Paycheck");
                assert_eq!(parse_amount(&amount).unwrap(), 200000);
                assert_eq!(due.as_deref(), Some("2024-01-15"));
                assert_eq!(kind, TransactionKind::Income);
            }
            _ => panic!("expected add"),
        }
        assert_eq!(cli.user, "local");
    }

    #[test]
    fn test_savings_account_numbers_start_at_one() {
        assert!(Cli::try_parse_from(["tallybook", "savings", "deposit", "0", "5"]).is_err());
        assert!(Cli::try_parse_from(["tallybook", "savings", "deposit", "1", "5"]).is_ok());
        assert_eq!(account_index(1), 0);
    }

    #[test]
    fn test_negative_balance_argument() {
        let cli = Cli::try_parse_from(["tallybook", "balance", "set", "-25.50"]).unwrap();
        match cli.command {
            Commands::Balance(BalanceCommands::Set { amount }) => {
                assert_eq!(parse_amount(&amount).unwrap(), -2550);
            }
            _ => panic!("expected balance set"),
        }
    }

    #[test]
    fn test_users_command_takes_global_options() {
        let cli = Cli::try_parse_from(["tallybook", "users", "-d", "other.db"]).unwrap();
        assert!(matches!(cli.command, Commands::Users));
        assert_eq!(cli.database, "other.db");
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("feb").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Rent", 28), "Rent");
        assert_eq!(truncate("A very long transaction name", 10), "A very ...");
    }
}
