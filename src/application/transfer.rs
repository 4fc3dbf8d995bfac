use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    CategoryId, CategoryType, Cents, Transaction, TransferLegs, Wallet, WalletId,
};

use super::categories::resolve_receiver;
use super::{AppError, LedgerService};

/// Money to move from one wallet to another.
pub struct TransferRequest {
    pub from_wallet: WalletId,
    pub to_wallet: WalletId,
    pub amount: Cents,
    /// Category of the source wallet that books the outgoing leg
    pub category_id: CategoryId,
    pub done_date: DateTime<Utc>,
}

/// Result of a transfer: both legs and both wallets as committed.
#[derive(Debug)]
pub struct TransferResult {
    pub debit: Transaction,
    pub credit: Transaction,
    pub from_wallet: Wallet,
    pub to_wallet: Wallet,
}

impl LedgerService {
    /// Move money between two wallets.
    ///
    /// Writes the debit leg, the credit leg and both wallet balances in one
    /// database transaction. On any failure none of the four writes is kept.
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferResult, AppError> {
        if request.amount <= 0 {
            return Err(AppError::InvalidAmount(request.amount));
        }

        let (from, to) = (request.from_wallet, request.to_wallet);
        let result = self.apply_transfer(request).await;
        match &result {
            Ok(r) => info!(
                from = %r.from_wallet.name,
                to = %r.to_wallet.name,
                amount = r.debit.amount,
                "transfer committed"
            ),
            Err(e) => warn!(from = %from, to = %to, error = %e, "transfer rolled back"),
        }
        result
    }

    async fn apply_transfer(&self, request: TransferRequest) -> Result<TransferResult, AppError> {
        let mut uow = self.repository().begin().await?;

        let source = uow
            .get_wallet(request.from_wallet)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(request.from_wallet.to_string()))?;
        let destination = uow
            .get_wallet(request.to_wallet)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(request.to_wallet.to_string()))?;
        if source.id == destination.id {
            return Err(AppError::SameWallet(source.name));
        }

        let debit_category = uow
            .get_category(request.category_id)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(request.category_id.to_string()))?;
        if debit_category.wallet_id != source.id {
            return Err(AppError::CategoryNotInWallet {
                category_id: debit_category.id,
                wallet_id: source.id,
            });
        }
        if debit_category.type_id != CategoryType::EXPENSE_ID {
            return Err(AppError::NotAnExpenseCategory {
                category_id: debit_category.id,
                type_id: debit_category.type_id,
            });
        }
        let credit_category = resolve_receiver(&mut uow, &destination).await?;

        let legs = TransferLegs::new(
            &source,
            &destination,
            request.amount,
            &debit_category,
            &credit_category,
            request.done_date,
        )?;

        uow.insert_transaction(&legs.debit).await?;
        uow.insert_transaction(&legs.credit).await?;
        uow.save_wallet_balance(&legs.source).await?;
        uow.save_wallet_balance(&legs.destination).await?;
        uow.commit().await?;

        Ok(TransferResult {
            debit: legs.debit,
            credit: legs.credit,
            from_wallet: legs.source,
            to_wallet: legs.destination,
        })
    }
}
