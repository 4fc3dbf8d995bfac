use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{Category, CategoryId, TypeId, WalletId};
use crate::storage::UnitOfWork;

use super::categories::resolve_fallback;
use super::{AppError, LedgerService};

/// Outcome of moving a category's transactions to another category.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub from_category: CategoryId,
    pub to_category: Category,
    pub moved: usize,
}

/// Reassign every transaction of `category_id` to the wallet's fallback
/// category of the same type. Runs inside the caller's unit of work; the
/// first failed reassignment aborts the whole batch.
///
/// The category must exist with exactly the given type and wallet.
pub(super) async fn move_transactions(
    uow: &mut UnitOfWork,
    category_id: CategoryId,
    type_id: TypeId,
    wallet_id: WalletId,
) -> Result<MigrationResult, AppError> {
    let category = uow
        .get_category(category_id)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound(category_id.to_string()))?;
    if category.type_id != type_id || category.wallet_id != wallet_id {
        return Err(AppError::CategoryMismatch {
            category_id,
            type_id,
            wallet_id,
        });
    }

    let fallback = resolve_fallback(uow, category_id, type_id, wallet_id).await?;
    let transactions = uow.transactions_of_category(category_id).await?;

    for entry in &transactions {
        debug!(transaction = %entry.transaction.id, to = %fallback.id, "moving transaction");
        uow.reassign_transaction(entry.transaction.id, fallback.id)
            .await?;
    }

    Ok(MigrationResult {
        from_category: category_id,
        moved: transactions.len(),
        to_category: fallback,
    })
}

impl LedgerService {
    /// Move all transactions of a category to a fallback category of the
    /// same wallet and type, as one atomic unit.
    ///
    /// Soft-deleted transactions move too, so that the category can be
    /// removed afterwards without leaving dangling references.
    pub async fn migrate_category(
        &self,
        category_id: CategoryId,
        type_id: TypeId,
        wallet_id: WalletId,
    ) -> Result<MigrationResult, AppError> {
        let result = self
            .apply_migration(category_id, type_id, wallet_id)
            .await;
        match &result {
            Ok(r) => info!(
                from = %category_id,
                to = %r.to_category.name,
                moved = r.moved,
                "migrated category"
            ),
            Err(e) => warn!(category = %category_id, error = %e, "category migration rolled back"),
        }
        result
    }

    async fn apply_migration(
        &self,
        category_id: CategoryId,
        type_id: TypeId,
        wallet_id: WalletId,
    ) -> Result<MigrationResult, AppError> {
        let mut uow = self.repository().begin().await?;
        let result = move_transactions(&mut uow, category_id, type_id, wallet_id).await?;
        uow.commit().await?;
        Ok(result)
    }
}
