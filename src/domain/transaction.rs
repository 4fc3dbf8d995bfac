use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CategoryId, Cents, TypeId, WalletId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Deleted,
    Active,
}

impl TransactionStatus {
    /// Integer persisted in the `status` column.
    pub fn code(&self) -> i64 {
        match self {
            TransactionStatus::Deleted => 0,
            TransactionStatus::Active => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TransactionStatus::Deleted),
            1 => Some(TransactionStatus::Active),
            _ => None,
        }
    }
}

/// A single income or expense entry against one wallet and one category.
///
/// Once recorded, only two changes are allowed: moving it to another
/// category and soft-deleting it. Deletion is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub category_id: CategoryId,
    pub title: Option<String>,
    /// Positive magnitude; the category type decides the direction
    pub amount: Cents,
    pub note: Option<String>,
    /// When the money moved
    pub done_date: DateTime<Utc>,
    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
    pub status: TransactionStatus,
    /// Links the credit leg of a transfer to its debit leg
    pub parent: Option<TransactionId>,
}

impl Transaction {
    pub fn new(
        wallet_id: WalletId,
        category_id: CategoryId,
        amount: Cents,
        done_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            category_id,
            title: None,
            amount,
            note: None,
            done_date,
            created_at: Utc::now(),
            status: TransactionStatus::Active,
            parent: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_parent(mut self, parent: TransactionId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Soft-deleted copy of this transaction.
    pub fn deleted(&self) -> Self {
        Self {
            status: TransactionStatus::Deleted,
            ..self.clone()
        }
    }
}

/// A transaction together with the type id of its category, as produced by
/// the join in every listing query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub type_id: TypeId,
}

impl CategorizedTransaction {
    pub fn new(transaction: Transaction, type_id: TypeId) -> Self {
        Self {
            transaction,
            type_id,
        }
    }
}
