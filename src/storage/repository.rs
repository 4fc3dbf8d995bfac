use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    CategorizedTransaction, Category, CategoryId, Transaction, TransactionId, TransactionStatus,
    Wallet, WalletId,
};

use super::{MIGRATION_001_INITIAL, UnitOfWork};

pub(super) const WALLET_COLUMNS: &str =
    "id, name, init_balance, current_balance, created_at";

pub(super) const CATEGORY_COLUMNS: &str = "id, wallet_id, name, type_id, created_at";

/// Transaction columns joined with the type id of the category.
pub(super) const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.wallet_id, t.category_id, t.title, t.amount, t.note, t.done_date,
           t.created_at, t.status, t.parent, c.type_id
    FROM transactions t
    INNER JOIN categories c ON c.id = t.category_id
"#;

/// Counters used by the integrity check.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub wallet_count: i64,
    pub active_count: i64,
    pub deleted_count: i64,
    pub orphaned_transactions: i64,
    pub dangling_transfer_legs: i64,
}

/// Repository for reading and writing wallets, categories and transactions.
///
/// Single-row writes go straight to the pool. Anything that touches more
/// than one row goes through a [`UnitOfWork`] obtained from [`Repository::begin`].
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Safe to run on an already migrated database.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start an all-or-nothing unit of work. Dropping it without calling
    /// [`UnitOfWork::commit`] rolls every write back.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(UnitOfWork::new(tx))
    }

    // ========================
    // Wallet operations
    // ========================

    pub async fn save_wallet(&self, wallet: &Wallet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, name, init_balance, current_balance, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.to_string())
        .bind(&wallet.name)
        .bind(wallet.init_balance)
        .bind(wallet.current_balance)
        .bind(encode_timestamp(wallet.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save wallet")?;
        Ok(())
    }

    pub async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>> {
        fetch_wallet(&self.pool, id).await
    }

    pub async fn get_wallet_by_name(&self, name: &str) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallets WHERE name = ?",
            WALLET_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet by name")?;

        row.as_ref().map(row_to_wallet).transpose()
    }

    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM wallets ORDER BY name",
            WALLET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallets")?;

        rows.iter().map(row_to_wallet).collect()
    }

    // ========================
    // Category operations
    // ========================

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, wallet_id, name, type_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id.to_string())
        .bind(category.wallet_id.to_string())
        .bind(&category.name)
        .bind(category.type_id)
        .bind(encode_timestamp(category.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        fetch_category(&self.pool, id).await
    }

    pub async fn get_category_by_name(
        &self,
        wallet_id: WalletId,
        name: &str,
    ) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE wallet_id = ? AND name = ?",
            CATEGORY_COLUMNS
        ))
        .bind(wallet_id.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category by name")?;

        row.as_ref().map(row_to_category).transpose()
    }

    pub async fn list_categories(&self, wallet_id: WalletId) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE wallet_id = ? ORDER BY type_id, created_at, name",
            CATEGORY_COLUMNS
        ))
        .bind(wallet_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(row_to_category).collect()
    }

    // ========================
    // Transaction queries
    // ========================

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<CategorizedTransaction>> {
        fetch_transaction(&self.pool, id).await
    }

    /// Active transactions of a wallet with `from <= done_date < until`.
    /// Either bound may be omitted.
    pub async fn list_active_transactions(
        &self,
        wallet_id: WalletId,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategorizedTransaction>> {
        let mut query = format!("{} WHERE t.wallet_id = ? AND t.status = ?", TRANSACTION_SELECT);

        let from_str = from.map(encode_timestamp);
        let until_str = until.map(encode_timestamp);

        if from_str.is_some() {
            query.push_str(" AND t.done_date >= ?");
        }
        if until_str.is_some() {
            query.push_str(" AND t.done_date < ?");
        }
        query.push_str(" ORDER BY t.done_date, t.created_at");

        let mut sql_query = sqlx::query(&query)
            .bind(wallet_id.to_string())
            .bind(TransactionStatus::Active.code());

        if let Some(ref from_str) = from_str {
            sql_query = sql_query.bind(from_str);
        }
        if let Some(ref until_str) = until_str {
            sql_query = sql_query.bind(until_str);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(row_to_categorized_transaction).collect()
    }

    /// Every transaction of a category, active or not.
    pub async fn list_transactions_of_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<CategorizedTransaction>> {
        fetch_transactions_of_category(&self.pool, category_id).await
    }

    // ========================
    // Integrity
    // ========================

    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let wallet_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM wallets")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let counts = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 1 THEN 1 ELSE 0 END), 0) as active,
                COALESCE(SUM(CASE WHEN status = 0 THEN 1 ELSE 0 END), 0) as deleted
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        let orphaned_transactions: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM categories c WHERE c.id = t.category_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let dangling_transfer_legs: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE t.parent IS NOT NULL
              AND NOT EXISTS (SELECT 1 FROM transactions p WHERE p.id = t.parent)
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(IntegrityStats {
            wallet_count,
            active_count: counts.get("active"),
            deleted_count: counts.get("deleted"),
            orphaned_transactions,
            dangling_transfer_legs,
        })
    }
}

// ========================
// Queries shared with UnitOfWork
// ========================

pub(super) async fn fetch_wallet<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: WalletId,
) -> Result<Option<Wallet>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM wallets WHERE id = ?",
        WALLET_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .context("Failed to fetch wallet")?;

    row.as_ref().map(row_to_wallet).transpose()
}

pub(super) async fn fetch_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: CategoryId,
) -> Result<Option<Category>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE id = ?",
        CATEGORY_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .context("Failed to fetch category")?;

    row.as_ref().map(row_to_category).transpose()
}

pub(super) async fn fetch_transaction<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: TransactionId,
) -> Result<Option<CategorizedTransaction>> {
    let row = sqlx::query(&format!("{} WHERE t.id = ?", TRANSACTION_SELECT))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch transaction")?;

    row.as_ref().map(row_to_categorized_transaction).transpose()
}

pub(super) async fn fetch_transactions_of_category<'e, E: SqliteExecutor<'e>>(
    executor: E,
    category_id: CategoryId,
) -> Result<Vec<CategorizedTransaction>> {
    let rows = sqlx::query(&format!(
        "{} WHERE t.category_id = ? ORDER BY t.done_date, t.created_at",
        TRANSACTION_SELECT
    ))
    .bind(category_id.to_string())
    .fetch_all(executor)
    .await
    .context("Failed to list transactions of category")?;

    rows.iter().map(row_to_categorized_transaction).collect()
}

// ========================
// Row mapping
// ========================

/// Fixed-width UTC timestamps, so that text comparison in SQL orders them
/// chronologically.
pub(super) fn encode_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: &str, what: &'static str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {} timestamp", what))?
        .with_timezone(&Utc))
}

fn decode_id(value: &str, what: &'static str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid {} ID", what))
}

pub(super) fn row_to_wallet(row: &sqlx::sqlite::SqliteRow) -> Result<Wallet> {
    let id_str: String = row.get("id");
    let created_at_str: String = row.get("created_at");

    Ok(Wallet {
        id: decode_id(&id_str, "wallet")?,
        name: row.get("name"),
        init_balance: row.get("init_balance"),
        current_balance: row.get("current_balance"),
        created_at: decode_timestamp(&created_at_str, "created_at")?,
    })
}

pub(super) fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    let id_str: String = row.get("id");
    let wallet_id_str: String = row.get("wallet_id");
    let created_at_str: String = row.get("created_at");

    Ok(Category {
        id: decode_id(&id_str, "category")?,
        wallet_id: decode_id(&wallet_id_str, "wallet")?,
        name: row.get("name"),
        type_id: row.get("type_id"),
        created_at: decode_timestamp(&created_at_str, "created_at")?,
    })
}

pub(super) fn row_to_categorized_transaction(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CategorizedTransaction> {
    let id_str: String = row.get("id");
    let wallet_id_str: String = row.get("wallet_id");
    let category_id_str: String = row.get("category_id");
    let done_date_str: String = row.get("done_date");
    let created_at_str: String = row.get("created_at");
    let status_code: i64 = row.get("status");
    let parent_str: Option<String> = row.get("parent");

    let transaction = Transaction {
        id: decode_id(&id_str, "transaction")?,
        wallet_id: decode_id(&wallet_id_str, "wallet")?,
        category_id: decode_id(&category_id_str, "category")?,
        title: row.get("title"),
        amount: row.get("amount"),
        note: row.get("note"),
        done_date: decode_timestamp(&done_date_str, "done_date")?,
        created_at: decode_timestamp(&created_at_str, "created_at")?,
        status: TransactionStatus::from_code(status_code)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_code))?,
        parent: parent_str
            .map(|s| decode_id(&s, "parent"))
            .transpose()?,
    };

    Ok(CategorizedTransaction::new(transaction, row.get("type_id")))
}
