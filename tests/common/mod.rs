// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;
use walletbook::application::{LedgerService, NewTransaction, RecordResult};
use walletbook::domain::{Category, CategoryType, Cents, Wallet};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: two wallets with a handful of categories each.
///
/// Checking starts at 200.00 and Savings at 50.00.
pub struct StandardWallets {
    pub checking: Wallet,
    pub savings: Wallet,
    /// Checking, income
    pub salary: Category,
    /// Checking, expense
    pub groceries: Category,
    /// Checking, expense
    pub transfer_out: Category,
    /// Savings, income, used for incoming transfers
    pub transfer_in: Category,
    /// Savings, income
    pub interest: Category,
    /// Savings, expense
    pub rent: Category,
}

impl StandardWallets {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let checking = service.create_wallet("Checking".into(), 20000).await?;
        let savings = service.create_wallet("Savings".into(), 5000).await?;

        let income = CategoryType::Income.id();
        let expense = CategoryType::Expense.id();

        Ok(Self {
            salary: service
                .create_category(checking.id, "Salary".into(), income)
                .await?,
            groceries: service
                .create_category(checking.id, "Groceries".into(), expense)
                .await?,
            transfer_out: service
                .create_category(checking.id, "Transfer out".into(), expense)
                .await?,
            interest: service
                .create_category(savings.id, "Interest".into(), income)
                .await?,
            transfer_in: service
                .create_category(savings.id, "Transfer".into(), income)
                .await?,
            rent: service
                .create_category(savings.id, "Rent".into(), expense)
                .await?,
            checking,
            savings,
        })
    }
}

/// Record a transaction with no title or note.
pub async fn record(
    service: &LedgerService,
    wallet: &Wallet,
    category: &Category,
    amount: Cents,
    date: &str,
) -> Result<RecordResult> {
    Ok(service
        .record_transaction(NewTransaction {
            wallet_id: wallet.id,
            category_id: category.id,
            amount,
            done_date: parse_date(date),
            title: None,
            note: None,
        })
        .await?)
}

/// Make every statement matching the trigger condition fail, simulating a
/// store failure in the middle of an atomic unit.
pub async fn fail_when(
    service: &LedgerService,
    name: &str,
    event: &str,
    condition: &str,
) -> Result<()> {
    let sql = format!(
        "CREATE TRIGGER {name} BEFORE {event} WHEN {condition} \
         BEGIN SELECT RAISE(ABORT, 'simulated store failure'); END"
    );
    sqlx::query(&sql)
        .execute(service.repository().pool())
        .await?;
    Ok(())
}

pub async fn clear_failure(service: &LedgerService, name: &str) -> Result<()> {
    sqlx::query(&format!("DROP TRIGGER IF EXISTS {name}"))
        .execute(service.repository().pool())
        .await?;
    Ok(())
}

/// Current balance of a wallet as stored.
pub async fn balance_of(service: &LedgerService, wallet: &Wallet) -> Result<Cents> {
    Ok(service.get_wallet_by_id(wallet.id).await?.current_balance)
}

/// Assert that every stored balance equals its initial balance plus the
/// balance of its active transactions.
pub async fn assert_ledger_consistent(service: &LedgerService) -> Result<()> {
    let report = service.check_integrity().await?;
    assert!(
        report.is_healthy(),
        "ledger inconsistent: {:?}",
        report.issues()
    );
    Ok(())
}
