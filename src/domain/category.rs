use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WalletId;

pub type CategoryId = Uuid;

/// Raw identifier of a row in the `types` table.
pub type TypeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// Money entering the wallet
    Income,
    /// Money leaving the wallet
    Expense,
}

impl CategoryType {
    pub const INCOME_ID: TypeId = 1;
    pub const EXPENSE_ID: TypeId = 2;

    pub fn id(&self) -> TypeId {
        match self {
            CategoryType::Income => Self::INCOME_ID,
            CategoryType::Expense => Self::EXPENSE_ID,
        }
    }

    /// Typed view of a type id. Ids outside income/expense have no type and
    /// are left out of every aggregation.
    pub fn from_id(id: TypeId) -> Option<Self> {
        match id {
            Self::INCOME_ID => Some(CategoryType::Income),
            Self::EXPENSE_ID => Some(CategoryType::Expense),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(CategoryType::Income),
            "expense" => Some(CategoryType::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of transactions, scoped to one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub wallet_id: WalletId,
    pub name: String,
    pub type_id: TypeId,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(wallet_id: WalletId, name: String, type_id: TypeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            name,
            type_id,
            created_at: Utc::now(),
        }
    }

    pub fn category_type(&self) -> Option<CategoryType> {
        CategoryType::from_id(self.type_id)
    }

    pub fn is_income(&self) -> bool {
        self.type_id == CategoryType::INCOME_ID
    }
}
