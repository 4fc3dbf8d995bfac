use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::stderr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};
use uuid::Uuid;

use crate::application::{LedgerService, NewTransaction, TransferRequest, WalletTotals};
use crate::domain::{CategoryType, MonthPeriod, TypeId, format_cents, parse_cents};
use crate::io::Exporter;

/// Walletbook - wallet and category based personal finance ledger
#[derive(Parser)]
#[command(name = "walletbook")]
#[command(about = "Track income and expenses per wallet with consistent running balances")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "WALLETBOOK_DB", default_value = "walletbook.db")]
    pub database: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, env = "WALLETBOOK_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Record an income or expense transaction
    Add {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Wallet name
        #[arg(short, long)]
        wallet: String,

        /// Category name within the wallet
        #[arg(short, long)]
        category: String,

        /// Title
        #[arg(short, long)]
        title: Option<String>,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,

        /// Date of the transaction (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Move money from one wallet to another
    Transfer {
        /// Amount to transfer
        amount: String,

        /// Source wallet name
        #[arg(long)]
        from: String,

        /// Destination wallet name
        #[arg(long)]
        to: String,

        /// Category of the source wallet for the outgoing leg
        #[arg(short, long)]
        category: String,

        /// Date of the transfer (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a transaction and revert its effect on the wallet balance
    Delete {
        /// Transaction ID
        id: String,
    },

    /// List transactions of a wallet for a month or a single day
    Transactions {
        /// Wallet name
        wallet: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Single day (YYYY-MM-DD), overrides --month
        #[arg(long)]
        day: Option<String>,
    },

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export a month of a wallet to CSV or JSON
    Export {
        /// Wallet name
        wallet: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Verify that stored balances match the transactions
    Check,
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a new wallet
    Create {
        /// Wallet name (must be unique)
        name: String,

        /// Initial balance
        #[arg(short, long, default_value = "0")]
        init_balance: String,
    },

    /// List all wallets
    List,

    /// Show detailed wallet information
    Show {
        /// Wallet name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category in a wallet
    Create {
        /// Wallet name
        #[arg(short, long)]
        wallet: String,

        /// Category name (unique within the wallet)
        name: String,

        /// Type: income, expense, or a numeric type id
        #[arg(short = 't', long = "type")]
        category_type: String,
    },

    /// List the categories of a wallet
    List {
        /// Wallet name
        wallet: String,
    },

    /// Delete a category, moving its transactions to another category of the same type
    Delete {
        /// Wallet name
        #[arg(short, long)]
        wallet: String,

        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Opening/ending balance, income and expense of a month
    Monthly {
        /// Wallet name
        wallet: String,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Income, expense and balance over all transactions
    Total {
        /// Wallet name (omit for all wallets)
        wallet: Option<String>,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    /// Install the stderr log subscriber. An explicit level wins over `--verbose`.
    pub fn init_logging(&self) {
        let level = match self.log_level.as_deref() {
            Some(level) => parse_log_level(level),
            None if self.verbose => LevelFilter::DEBUG,
            None => LevelFilter::WARN,
        };

        let terminal_log = fmt::layer()
            .with_target(false)
            .with_writer(stderr)
            .with_filter(level);

        tracing_subscriber::registry().with(terminal_log).init();
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Wallet(wallet_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_wallet_command(&service, wallet_cmd).await?;
            }

            Commands::Category(category_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_category_command(&service, category_cmd).await?;
            }

            Commands::Add {
                amount,
                wallet,
                category,
                title,
                note,
                date,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let wallet = service.get_wallet(&wallet).await?;
                let category = service.get_category_by_name(wallet.id, &category).await?;

                let result = service
                    .record_transaction(NewTransaction {
                        wallet_id: wallet.id,
                        category_id: category.id,
                        amount,
                        done_date: parse_optional_date(date)?,
                        title,
                        note,
                    })
                    .await?;

                println!(
                    "Recorded {} {} in {} ({}), balance now {}",
                    category
                        .category_type()
                        .map(|t| t.as_str())
                        .unwrap_or("untyped"),
                    format_cents(result.transaction.amount),
                    result.wallet.name,
                    result.transaction.id,
                    format_cents(result.wallet.current_balance)
                );
            }

            Commands::Transfer {
                amount,
                from,
                to,
                category,
                date,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let from_wallet = service.get_wallet(&from).await?;
                let to_wallet = service.get_wallet(&to).await?;
                let category = service
                    .get_category_by_name(from_wallet.id, &category)
                    .await?;

                let result = service
                    .transfer(TransferRequest {
                        from_wallet: from_wallet.id,
                        to_wallet: to_wallet.id,
                        amount,
                        category_id: category.id,
                        done_date: parse_optional_date(date)?,
                    })
                    .await?;

                println!(
                    "Transferred {} {} -> {}",
                    format_cents(amount),
                    result.from_wallet.name,
                    result.to_wallet.name
                );
                println!(
                    "  {}: {}",
                    result.from_wallet.name,
                    format_cents(result.from_wallet.current_balance)
                );
                println!(
                    "  {}: {}",
                    result.to_wallet.name,
                    format_cents(result.to_wallet.current_balance)
                );
            }

            Commands::Delete { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let id = Uuid::parse_str(&id).context("Invalid transaction ID")?;
                let result = service.reverse_transaction(id).await?;
                println!(
                    "Deleted transaction {} ({}), {} balance now {}",
                    result.transaction.id,
                    format_cents(result.transaction.amount),
                    result.wallet.name,
                    format_cents(result.wallet.current_balance)
                );
            }

            Commands::Transactions { wallet, month, day } => {
                let service = LedgerService::connect(&self.database).await?;
                run_transactions_command(&service, &wallet, month, day).await?;
            }

            Commands::Report(report_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_report_command(&service, report_cmd).await?;
            }

            Commands::Export {
                wallet,
                month,
                format,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let wallet = service.get_wallet(&wallet).await?;
                let period = parse_optional_month(month)?;
                let exporter = Exporter::new(&service);

                let writer: Box<dyn std::io::Write> = match &output {
                    Some(path) => Box::new(
                        File::create(path)
                            .with_context(|| format!("Failed to create {}", path))?,
                    ),
                    None => Box::new(std::io::stdout()),
                };

                match format.as_str() {
                    "json" => {
                        let statement = exporter.export_month_json(&wallet, period, writer).await?;
                        if output.is_some() {
                            println!(
                                "Exported {} transaction(s) of {}",
                                statement.transactions.len(),
                                period
                            );
                        }
                    }
                    "csv" => {
                        let count = exporter.export_month_csv(&wallet, period, writer).await?;
                        if output.is_some() {
                            println!("Exported {} transaction(s) of {}", count, period);
                        }
                    }
                    other => anyhow::bail!("Unknown export format '{}'. Use csv or json", other),
                }
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn run_wallet_command(service: &LedgerService, cmd: WalletCommands) -> Result<()> {
    match cmd {
        WalletCommands::Create { name, init_balance } => {
            let init_balance =
                parse_cents(&init_balance).context("Invalid initial balance")?;
            let wallet = service.create_wallet(name, init_balance).await?;
            println!(
                "Created wallet: {} (balance {})",
                wallet.name,
                format_cents(wallet.current_balance)
            );
        }

        WalletCommands::List => {
            let wallets = service.list_wallets().await?;
            if wallets.is_empty() {
                println!("No wallets found.");
            } else {
                println!("{:<20} {:>12} {:>12}", "NAME", "INITIAL", "BALANCE");
                println!("{}", "-".repeat(46));
                for wallet in wallets {
                    println!(
                        "{:<20} {:>12} {:>12}",
                        truncate(&wallet.name, 20),
                        format_cents(wallet.init_balance),
                        format_cents(wallet.current_balance)
                    );
                }
            }
        }

        WalletCommands::Show { name } => {
            let info = service.get_wallet_info(&name).await?;
            let wallet = &info.wallet;

            println!("Wallet: {}", wallet.name);
            println!("  ID:              {}", wallet.id);
            println!(
                "  Created:         {}",
                wallet.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Initial balance: {}", format_cents(wallet.init_balance));
            println!("  Balance:         {}", format_cents(wallet.current_balance));
            println!();
            println!("  Income:          {}", format_cents(info.totals.income));
            println!("  Expense:         {}", format_cents(info.totals.expense));
            println!("  Transactions:    {}", info.transaction_count);
            if let Some(last) = info.last_activity {
                println!("  Last activity:   {}", last.format("%Y-%m-%d"));
            }
        }
    }
    Ok(())
}

async fn run_category_command(service: &LedgerService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Create {
            wallet,
            name,
            category_type,
        } => {
            let type_id = parse_type_id(&category_type)?;
            let wallet = service.get_wallet(&wallet).await?;
            let category = service.create_category(wallet.id, name, type_id).await?;
            println!(
                "Created category: {} ({}) in {}",
                category.name,
                type_label(category.type_id),
                wallet.name
            );
        }

        CategoryCommands::List { wallet } => {
            let wallet = service.get_wallet(&wallet).await?;
            let categories = service.list_categories(wallet.id).await?;
            if categories.is_empty() {
                println!("No categories in {}.", wallet.name);
            } else {
                println!("{:<24} {:<10}", "NAME", "TYPE");
                println!("{}", "-".repeat(35));
                for category in categories {
                    println!(
                        "{:<24} {:<10}",
                        truncate(&category.name, 24),
                        type_label(category.type_id)
                    );
                }
            }
        }

        CategoryCommands::Delete { wallet, name } => {
            let wallet = service.get_wallet(&wallet).await?;
            let category = service.get_category_by_name(wallet.id, &name).await?;
            let result = service.delete_category(category.id).await?;
            println!(
                "Deleted category {}: moved {} transaction(s) to {}",
                category.name, result.moved, result.to_category.name
            );
        }
    }
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    wallet: &str,
    month: Option<String>,
    day: Option<String>,
) -> Result<()> {
    let wallet = service.get_wallet(wallet).await?;

    let transactions = match day {
        Some(day) => {
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .context("Day must be in YYYY-MM-DD format")?;
            service.transactions_of_day(wallet.id, day).await?
        }
        None => {
            let period = parse_optional_month(month)?;
            service.transactions_of_month(wallet.id, period).await?
        }
    };

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let categories = service.list_categories(wallet.id).await?;
    println!(
        "{:<12} {:>10} {:<16} {:<20} ID",
        "DATE", "AMOUNT", "CATEGORY", "TITLE"
    );
    println!("{}", "-".repeat(96));
    for entry in &transactions {
        let tx = &entry.transaction;
        let category = categories
            .iter()
            .find(|c| c.id == tx.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        let signed = match CategoryType::from_id(entry.type_id) {
            Some(CategoryType::Expense) => format!("-{}", format_cents(tx.amount)),
            _ => format_cents(tx.amount),
        };

        println!(
            "{:<12} {:>10} {:<16} {:<20} {}",
            tx.done_date.format("%Y-%m-%d"),
            signed,
            truncate(category, 16),
            truncate(tx.title.as_deref().unwrap_or(""), 20),
            tx.id
        );
    }
    Ok(())
}

async fn run_report_command(service: &LedgerService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Monthly {
            wallet,
            month,
            format,
        } => {
            let wallet = service.get_wallet(&wallet).await?;
            let period = parse_optional_month(month)?;
            let report = service.monthly_report(wallet.id, period).await?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!("Monthly report: {} {}", wallet.name, period);
                    println!();
                    println!("Opening balance: {:>15}", format_cents(report.opening_balance));
                    println!("Income:          {:>15}", format_cents(report.income));
                    println!("Expense:         {:>15}", format_cents(report.expense));
                    println!("{}", "-".repeat(32));
                    println!("Net:             {:>15}", format_cents(report.balance));
                    println!("Ending balance:  {:>15}", format_cents(report.ending_balance));
                }
            }
        }

        ReportCommands::Total { wallet, format } => {
            let totals = select_totals(service, wallet).await?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&totals)?),
                _ => {
                    if totals.is_empty() {
                        println!("No wallets found.");
                    } else {
                        println!(
                            "{:<20} {:>12} {:>12} {:>12} {:>12}",
                            "WALLET", "INCOME", "EXPENSE", "NET", "BALANCE"
                        );
                        println!("{}", "-".repeat(72));
                        for entry in totals {
                            println!(
                                "{:<20} {:>12} {:>12} {:>12} {:>12}",
                                truncate(&entry.wallet, 20),
                                format_cents(entry.totals.income),
                                format_cents(entry.totals.expense),
                                format_cents(entry.totals.balance),
                                format_cents(entry.current_balance)
                            );
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Totals of one named wallet, or of every wallet.
async fn select_totals(service: &LedgerService, wallet: Option<String>) -> Result<Vec<WalletTotals>> {
    match wallet {
        Some(name) => {
            let wallet = service.get_wallet(&name).await?;
            Ok(vec![WalletTotals {
                totals: service.total_report(wallet.id).await?,
                current_balance: wallet.current_balance,
                wallet: wallet.name,
            }])
        }
        None => Ok(service.all_wallet_totals().await?),
    }
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Wallets:      {}", report.wallet_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Deleted:      {}", report.deleted_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in report.issues() {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'warn'", level);
            LevelFilter::WARN
        }
    }
}

fn parse_type_id(input: &str) -> Result<TypeId> {
    if let Some(category_type) = CategoryType::from_str(input) {
        return Ok(category_type.id());
    }
    input.parse::<TypeId>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid category type '{}'. Use income, expense or a numeric type id",
            input
        )
    })
}

fn type_label(type_id: TypeId) -> String {
    match CategoryType::from_id(type_id) {
        Some(category_type) => category_type.to_string(),
        None => format!("type {}", type_id),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Parse `YYYY-MM-DD` as midnight UTC, or take the current time.
fn parse_optional_date(date: Option<String>) -> Result<DateTime<Utc>> {
    match date {
        Some(date_str) => {
            let naive_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))?;
            let naive_datetime = naive_date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
            Ok(naive_datetime.and_utc())
        }
        None => Ok(Utc::now()),
    }
}

/// Parse `YYYY-MM`, or take the current month.
fn parse_optional_month(month: Option<String>) -> Result<MonthPeriod> {
    match month {
        Some(month_str) => {
            let (year, month) = month_str
                .split_once('-')
                .ok_or_else(|| anyhow::anyhow!("Month must be in YYYY-MM format"))?;
            let year: i32 = year.parse().context("Invalid year")?;
            let month: u32 = month.parse().context("Invalid month")?;
            Ok(MonthPeriod::new(month, year)?)
        }
        None => Ok(MonthPeriod::containing(Utc::now())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_id() {
        assert_eq!(parse_type_id("income").unwrap(), 1);
        assert_eq!(parse_type_id("Expense").unwrap(), 2);
        assert_eq!(parse_type_id("3").unwrap(), 3);
        assert!(parse_type_id("savings").is_err());
    }

    #[test]
    fn test_parse_month() {
        let period = parse_optional_month(Some("2024-02".into())).unwrap();
        assert_eq!(period.month(), 2);
        assert_eq!(period.year(), 2024);
        assert!(parse_optional_month(Some("2024-13".into())).is_err());
        assert!(parse_optional_month(Some("202402".into())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Groceries", 20), "Groceries");
        assert_eq!(truncate("A very long category name", 10), "A very ...");
    }

    #[tokio::test]
    async fn test_select_totals_for_one_wallet() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cli.db");
        let service = LedgerService::init(db_path.to_str().unwrap()).await.unwrap();

        let cash = service.create_wallet("Cash".into(), 1000).await.unwrap();
        service.create_wallet("Bank".into(), 0).await.unwrap();
        let tips = service
            .create_category(cash.id, "Tips".into(), CategoryType::INCOME_ID)
            .await
            .unwrap();
        service
            .record_transaction(NewTransaction {
                wallet_id: cash.id,
                category_id: tips.id,
                amount: 250,
                done_date: Utc::now(),
                title: None,
                note: None,
            })
            .await
            .unwrap();

        let totals = select_totals(&service, Some("Cash".into())).await.unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].wallet, "Cash");
        assert_eq!(totals[0].current_balance, 1250);
        assert_eq!(totals[0].totals.income, 250);

        assert_eq!(select_totals(&service, None).await.unwrap().len(), 2);
        assert!(select_totals(&service, Some("Nope".into())).await.is_err());
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from([
            "walletbook",
            "transfer",
            "30",
            "--from",
            "Checking",
            "--to",
            "Savings",
            "--category",
            "Transfer out",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Transfer { .. }));
    }
}
