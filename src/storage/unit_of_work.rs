use anyhow::{Context, Result, bail};
use sqlx::{Sqlite, SqliteConnection};

use crate::domain::{
    CategorizedTransaction, Category, CategoryId, CategoryType, Transaction, TransactionId,
    TransactionStatus, TypeId, Wallet, WalletId,
};

use super::repository::{
    CATEGORY_COLUMNS, encode_timestamp, fetch_category, fetch_transaction,
    fetch_transactions_of_category, fetch_wallet, row_to_category,
};

/// Category name preferred when crediting the receiving side of a transfer.
pub const RECEIVER_CATEGORY_NAME: &str = "Transfer";

/// A database transaction over the ledger tables.
///
/// Every write reports failure as an error, including updates that match no
/// row. Nothing is visible to other connections until [`UnitOfWork::commit`];
/// dropping the unit rolls it back.
pub struct UnitOfWork {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(super) fn new(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("Failed to roll back")
    }

    // ========================
    // Reads
    // ========================

    pub async fn get_wallet(&mut self, id: WalletId) -> Result<Option<Wallet>> {
        fetch_wallet(self.conn(), id).await
    }

    pub async fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        fetch_category(self.conn(), id).await
    }

    pub async fn get_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<CategorizedTransaction>> {
        fetch_transaction(self.conn(), id).await
    }

    pub async fn transactions_of_category(
        &mut self,
        category_id: CategoryId,
    ) -> Result<Vec<CategorizedTransaction>> {
        fetch_transactions_of_category(self.conn(), category_id).await
    }

    /// Oldest category of the wallet with the same type id, other than `excluding`.
    pub async fn find_fallback_category(
        &mut self,
        wallet_id: WalletId,
        type_id: TypeId,
        excluding: CategoryId,
    ) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM categories
            WHERE wallet_id = ? AND type_id = ? AND id != ?
            ORDER BY created_at, name
            LIMIT 1
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(wallet_id.to_string())
        .bind(type_id)
        .bind(excluding.to_string())
        .fetch_optional(self.conn())
        .await
        .context("Failed to look up fallback category")?;

        row.as_ref().map(row_to_category).transpose()
    }

    /// Income category that receives transfers into a wallet: the one named
    /// [`RECEIVER_CATEGORY_NAME`] if present, otherwise the oldest income category.
    pub async fn find_receiver_category(&mut self, wallet_id: WalletId) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM categories
            WHERE wallet_id = ? AND type_id = ?
            ORDER BY CASE WHEN lower(name) = lower(?) THEN 0 ELSE 1 END, created_at, name
            LIMIT 1
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(wallet_id.to_string())
        .bind(CategoryType::INCOME_ID)
        .bind(RECEIVER_CATEGORY_NAME)
        .fetch_optional(self.conn())
        .await
        .context("Failed to look up receiver category")?;

        row.as_ref().map(row_to_category).transpose()
    }

    // ========================
    // Writes
    // ========================

    pub async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, wallet_id, category_id, title, amount, note, done_date, created_at, status, parent)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.wallet_id.to_string())
        .bind(transaction.category_id.to_string())
        .bind(&transaction.title)
        .bind(transaction.amount)
        .bind(&transaction.note)
        .bind(encode_timestamp(transaction.done_date))
        .bind(encode_timestamp(transaction.created_at))
        .bind(transaction.status.code())
        .bind(transaction.parent.map(|id| id.to_string()))
        .execute(self.conn())
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Persist the wallet's running balance.
    pub async fn save_wallet_balance(&mut self, wallet: &Wallet) -> Result<()> {
        let result = sqlx::query("UPDATE wallets SET current_balance = ? WHERE id = ?")
            .bind(wallet.current_balance)
            .bind(wallet.id.to_string())
            .execute(self.conn())
            .await
            .context("Failed to save wallet")?;

        if result.rows_affected() != 1 {
            bail!("Wallet {} was not updated", wallet.id);
        }
        Ok(())
    }

    /// Flip an active transaction to deleted. Fails if it is not active.
    pub async fn mark_transaction_deleted(&mut self, id: TransactionId) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET status = ? WHERE id = ? AND status = ?")
            .bind(TransactionStatus::Deleted.code())
            .bind(id.to_string())
            .bind(TransactionStatus::Active.code())
            .execute(self.conn())
            .await
            .context("Failed to delete transaction")?;

        if result.rows_affected() != 1 {
            bail!("Transaction {} was not deleted", id);
        }
        Ok(())
    }

    pub async fn reassign_transaction(
        &mut self,
        id: TransactionId,
        category_id: CategoryId,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET category_id = ? WHERE id = ?")
            .bind(category_id.to_string())
            .bind(id.to_string())
            .execute(self.conn())
            .await
            .with_context(|| format!("Failed to move transaction {}", id))?;

        if result.rows_affected() != 1 {
            bail!("Transaction {} was not moved", id);
        }
        Ok(())
    }

    pub async fn delete_category(&mut self, id: CategoryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(self.conn())
            .await
            .context("Failed to delete category")?;

        if result.rows_affected() != 1 {
            bail!("Category {} was not deleted", id);
        }
        Ok(())
    }
}
