use thiserror::Error;

use crate::domain::{
    BalanceOverflow, CategoryId, Cents, InvalidMonth, TransactionId, TypeId, WalletId,
};

/// Broad class of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed
    Validation,
    /// The store failed to read or write
    Persistence,
    /// The request would break a reference between ledger records
    Integrity,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Wallet already exists: {0}")]
    WalletAlreadyExists(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists in wallet: {0}")]
    CategoryAlreadyExists(String),

    #[error("Category {category_id} does not belong to wallet {wallet_id}")]
    CategoryNotInWallet {
        category_id: CategoryId,
        wallet_id: WalletId,
    },

    #[error("No other category of type {type_id} in wallet {wallet_id} to replace {category_id}")]
    NoFallbackCategory {
        category_id: CategoryId,
        type_id: TypeId,
        wallet_id: WalletId,
    },

    #[error("Wallet {0} has no income category to receive transfers")]
    NoReceiverCategory(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Transaction {0} is already deleted")]
    TransactionAlreadyDeleted(TransactionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Cents),

    #[error("Cannot transfer from a wallet to itself: {0}")]
    SameWallet(String),

    #[error("Category {category_id} has type {type_id}; transfers are booked on an expense category")]
    NotAnExpenseCategory {
        category_id: CategoryId,
        type_id: TypeId,
    },

    #[error(
        "Category {category_id} is not a type {type_id} category of wallet {wallet_id}"
    )]
    CategoryMismatch {
        category_id: CategoryId,
        type_id: TypeId,
        wallet_id: WalletId,
    },

    #[error(transparent)]
    InvalidMonth(#[from] InvalidMonth),

    #[error(transparent)]
    BalanceOverflow(#[from] BalanceOverflow),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::WalletAlreadyExists(_)
            | AppError::CategoryAlreadyExists(_)
            | AppError::InvalidAmount(_)
            | AppError::SameWallet(_)
            | AppError::InvalidMonth(_)
            | AppError::NotAnExpenseCategory { .. }
            | AppError::BalanceOverflow(_)
            | AppError::TransactionAlreadyDeleted(_) => ErrorKind::Validation,
            AppError::WalletNotFound(_)
            | AppError::CategoryNotFound(_)
            | AppError::CategoryNotInWallet { .. }
            | AppError::CategoryMismatch { .. }
            | AppError::NoFallbackCategory { .. }
            | AppError::NoReceiverCategory(_)
            | AppError::TransactionNotFound(_) => ErrorKind::Integrity,
            AppError::Database(_) => ErrorKind::Persistence,
        }
    }
}
