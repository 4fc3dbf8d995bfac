use tracing::{info, warn};

use crate::domain::{Category, CategoryId, TypeId, Wallet, WalletId};
use crate::storage::UnitOfWork;

use super::{AppError, LedgerService, MigrationResult};

/// Replacement category for `category_id`: same wallet, same type id.
pub(super) async fn resolve_fallback(
    uow: &mut UnitOfWork,
    category_id: CategoryId,
    type_id: TypeId,
    wallet_id: WalletId,
) -> Result<Category, AppError> {
    uow.find_fallback_category(wallet_id, type_id, category_id)
        .await?
        .ok_or(AppError::NoFallbackCategory {
            category_id,
            type_id,
            wallet_id,
        })
}

/// Income category that books the credit leg of a transfer into `wallet`.
pub(super) async fn resolve_receiver(
    uow: &mut UnitOfWork,
    wallet: &Wallet,
) -> Result<Category, AppError> {
    uow.find_receiver_category(wallet.id)
        .await?
        .ok_or_else(|| AppError::NoReceiverCategory(wallet.name.clone()))
}

impl LedgerService {
    // ========================
    // Category operations
    // ========================

    pub async fn create_category(
        &self,
        wallet_id: WalletId,
        name: String,
        type_id: TypeId,
    ) -> Result<Category, AppError> {
        let wallet = self.get_wallet_by_id(wallet_id).await?;
        if self
            .repository()
            .get_category_by_name(wallet.id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::CategoryAlreadyExists(name));
        }

        let category = Category::new(wallet.id, name, type_id);
        self.repository().save_category(&category).await?;
        info!(wallet = %wallet.name, category = %category.name, type_id, "created category");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, AppError> {
        self.repository()
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))
    }

    pub async fn get_category_by_name(
        &self,
        wallet_id: WalletId,
        name: &str,
    ) -> Result<Category, AppError> {
        self.repository()
            .get_category_by_name(wallet_id, name)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(name.to_string()))
    }

    pub async fn list_categories(&self, wallet_id: WalletId) -> Result<Vec<Category>, AppError> {
        Ok(self.repository().list_categories(wallet_id).await?)
    }

    /// The category that would take over the transactions of `category_id`.
    pub async fn fallback_category(
        &self,
        category_id: CategoryId,
        type_id: TypeId,
        wallet_id: WalletId,
    ) -> Result<Category, AppError> {
        let mut uow = self.repository().begin().await?;
        let fallback = resolve_fallback(&mut uow, category_id, type_id, wallet_id).await?;
        uow.rollback().await?;
        Ok(fallback)
    }

    /// The category that would receive a transfer into the wallet.
    pub async fn receiver_category(&self, wallet_id: WalletId) -> Result<Category, AppError> {
        let wallet = self.get_wallet_by_id(wallet_id).await?;
        let mut uow = self.repository().begin().await?;
        let receiver = resolve_receiver(&mut uow, &wallet).await?;
        uow.rollback().await?;
        Ok(receiver)
    }

    /// Move every transaction of the category to its fallback, then remove
    /// the category. Nothing changes unless both steps succeed.
    pub async fn delete_category(&self, id: CategoryId) -> Result<MigrationResult, AppError> {
        let result = self.apply_category_delete(id).await;
        match &result {
            Ok(r) => info!(
                category = %id,
                fallback = %r.to_category.name,
                moved = r.moved,
                "deleted category"
            ),
            Err(e) => warn!(category = %id, error = %e, "category deletion rolled back"),
        }
        result
    }

    async fn apply_category_delete(&self, id: CategoryId) -> Result<MigrationResult, AppError> {
        let mut uow = self.repository().begin().await?;

        let category = uow
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))?;

        let result =
            super::migration::move_transactions(&mut uow, category.id, category.type_id, category.wallet_id)
                .await?;
        uow.delete_category(category.id).await?;
        uow.commit().await?;

        Ok(result)
    }
}
