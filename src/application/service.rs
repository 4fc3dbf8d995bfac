use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    CategorizedTransaction, CategoryId, Cents, IncomeExpense, IntegrityReport, MonthPeriod,
    Transaction, TransactionId, Wallet, WalletId, balance_effect, check_wallet_consistency,
    compute_income_expense,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing the ledger operations.
/// This is the interface used by the CLI and by tests.
pub struct LedgerService {
    repo: Repository,
}

/// Input for recording a single income or expense entry.
pub struct NewTransaction {
    pub wallet_id: WalletId,
    pub category_id: CategoryId,
    pub amount: Cents,
    pub done_date: DateTime<Utc>,
    pub title: Option<String>,
    pub note: Option<String>,
}

/// Result of recording a transaction
#[derive(Debug)]
pub struct RecordResult {
    pub transaction: Transaction,
    pub wallet: Wallet,
}

/// Result of soft-deleting a transaction
#[derive(Debug)]
pub struct ReversalResult {
    pub transaction: Transaction,
    pub wallet: Wallet,
}

/// Detailed wallet information
pub struct WalletInfo {
    pub wallet: Wallet,
    pub totals: IncomeExpense,
    pub transaction_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

impl LedgerService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Wallet operations
    // ========================

    pub async fn create_wallet(&self, name: String, init_balance: Cents) -> Result<Wallet, AppError> {
        if self.repo.get_wallet_by_name(&name).await?.is_some() {
            return Err(AppError::WalletAlreadyExists(name));
        }

        let wallet = Wallet::new(name, init_balance);
        self.repo.save_wallet(&wallet).await?;
        info!(wallet = %wallet.name, init_balance, "created wallet");
        Ok(wallet)
    }

    /// Get a wallet by name.
    pub async fn get_wallet(&self, name: &str) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet_by_name(name)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(name.to_string()))
    }

    pub async fn get_wallet_by_id(&self, id: WalletId) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet(id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(id.to_string()))
    }

    pub async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        Ok(self.repo.list_wallets().await?)
    }

    pub async fn get_wallet_info(&self, name: &str) -> Result<WalletInfo, AppError> {
        let wallet = self.get_wallet(name).await?;
        let transactions = self.all_transactions_of_wallet(wallet.id).await?;
        let last_activity = transactions.iter().map(|t| t.transaction.done_date).max();

        Ok(WalletInfo {
            totals: compute_income_expense(&transactions),
            transaction_count: transactions.len(),
            last_activity,
            wallet,
        })
    }

    // ========================
    // Transaction writes
    // ========================

    /// Record an income or expense entry and apply it to the wallet balance,
    /// both in one database transaction.
    pub async fn record_transaction(&self, input: NewTransaction) -> Result<RecordResult, AppError> {
        if input.amount <= 0 {
            return Err(AppError::InvalidAmount(input.amount));
        }

        let wallet_id = input.wallet_id;
        let result = self.apply_record(input).await;
        match &result {
            Ok(r) => info!(
                transaction = %r.transaction.id,
                wallet = %r.wallet.name,
                amount = r.transaction.amount,
                "recorded transaction"
            ),
            Err(e) => warn!(wallet = %wallet_id, error = %e, "recording rolled back"),
        }
        result
    }

    async fn apply_record(&self, input: NewTransaction) -> Result<RecordResult, AppError> {
        let mut uow = self.repo.begin().await?;

        let wallet = uow
            .get_wallet(input.wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(input.wallet_id.to_string()))?;
        let category = uow
            .get_category(input.category_id)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(input.category_id.to_string()))?;
        if category.wallet_id != wallet.id {
            return Err(AppError::CategoryNotInWallet {
                category_id: category.id,
                wallet_id: wallet.id,
            });
        }

        let mut transaction =
            Transaction::new(wallet.id, category.id, input.amount, input.done_date);
        transaction.title = input.title;
        transaction.note = input.note;

        let wallet = wallet.with_balance_change(balance_effect(category.type_id, input.amount))?;

        uow.insert_transaction(&transaction).await?;
        uow.save_wallet_balance(&wallet).await?;
        uow.commit().await?;

        Ok(RecordResult {
            transaction,
            wallet,
        })
    }

    /// Soft-delete a transaction and take its effect out of the wallet balance.
    ///
    /// Income entries are subtracted from the balance, expense entries are
    /// added back. The status flip and the balance update commit together.
    pub async fn reverse_transaction(&self, id: TransactionId) -> Result<ReversalResult, AppError> {
        let result = self.apply_reversal(id).await;
        match &result {
            Ok(r) => info!(
                transaction = %id,
                wallet = %r.wallet.name,
                balance = r.wallet.current_balance,
                "deleted transaction"
            ),
            Err(e) => warn!(transaction = %id, error = %e, "deletion rolled back"),
        }
        result
    }

    async fn apply_reversal(&self, id: TransactionId) -> Result<ReversalResult, AppError> {
        let mut uow = self.repo.begin().await?;

        let entry = uow
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))?;
        if !entry.transaction.is_active() {
            return Err(AppError::TransactionAlreadyDeleted(id));
        }

        let wallet_id = entry.transaction.wallet_id;
        let wallet = uow
            .get_wallet(wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))?;

        let wallet =
            wallet.with_balance_change(-balance_effect(entry.type_id, entry.transaction.amount))?;
        let transaction = entry.transaction.deleted();

        uow.mark_transaction_deleted(transaction.id).await?;
        uow.save_wallet_balance(&wallet).await?;
        uow.commit().await?;

        Ok(ReversalResult {
            transaction,
            wallet,
        })
    }

    // ========================
    // Transaction queries
    // ========================

    pub async fn get_transaction(&self, id: TransactionId) -> Result<CategorizedTransaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))
    }

    /// Active transactions dated within the month.
    pub async fn transactions_of_month(
        &self,
        wallet_id: WalletId,
        period: MonthPeriod,
    ) -> Result<Vec<CategorizedTransaction>, AppError> {
        let (start, end) = period.bounds();
        debug!(wallet = %wallet_id, %period, "listing transactions of month");
        Ok(self
            .repo
            .list_active_transactions(wallet_id, Some(start), Some(end))
            .await?)
    }

    /// Active transactions dated strictly before the first day of the month.
    pub async fn transactions_before_month(
        &self,
        wallet_id: WalletId,
        period: MonthPeriod,
    ) -> Result<Vec<CategorizedTransaction>, AppError> {
        let (start, _) = period.bounds();
        debug!(wallet = %wallet_id, %period, "listing transactions before month");
        Ok(self
            .repo
            .list_active_transactions(wallet_id, None, Some(start))
            .await?)
    }

    /// Active transactions dated in any later month.
    pub async fn transactions_after_month(
        &self,
        wallet_id: WalletId,
        period: MonthPeriod,
    ) -> Result<Vec<CategorizedTransaction>, AppError> {
        let (_, end) = period.bounds();
        debug!(wallet = %wallet_id, %period, "listing transactions after month");
        Ok(self
            .repo
            .list_active_transactions(wallet_id, Some(end), None)
            .await?)
    }

    pub async fn all_transactions_of_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<CategorizedTransaction>, AppError> {
        Ok(self
            .repo
            .list_active_transactions(wallet_id, None, None)
            .await?)
    }

    /// Active transactions dated on one day, in the order they were recorded.
    pub async fn transactions_of_day(
        &self,
        wallet_id: WalletId,
        day: NaiveDate,
    ) -> Result<Vec<CategorizedTransaction>, AppError> {
        let start = day.and_time(NaiveTime::default()).and_utc();
        let end = start + Duration::days(1);

        let mut transactions = self
            .repo
            .list_active_transactions(wallet_id, Some(start), Some(end))
            .await?;
        transactions.sort_by_key(|t| t.transaction.created_at);
        Ok(transactions)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Recompute every wallet's balance from its transactions and compare it
    /// with the stored one.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let wallets = self.repo.list_wallets().await?;

        let mut drifts = Vec::new();
        for wallet in &wallets {
            let transactions = self.all_transactions_of_wallet(wallet.id).await?;
            if let Some(drift) = check_wallet_consistency(wallet, &transactions) {
                warn!(wallet = %wallet.name, stored = drift.stored, expected = drift.expected, "balance drift");
                drifts.push(drift);
            }
        }

        Ok(IntegrityReport {
            wallet_count: stats.wallet_count,
            transaction_count: stats.active_count,
            deleted_count: stats.deleted_count,
            drifts,
            orphaned_transactions: stats.orphaned_transactions,
            dangling_transfer_legs: stats.dangling_transfer_legs,
        })
    }
}
