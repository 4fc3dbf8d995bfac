use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Cents;

pub type WalletId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Balance of wallet {wallet} would overflow")]
pub struct BalanceOverflow {
    pub wallet: String,
}

/// An account holding a running balance.
///
/// `current_balance` is derived from `init_balance` and the wallet's active
/// transactions, but it is persisted. Every write that creates or reverts a
/// transaction updates it in the same database transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub name: String,
    pub init_balance: Cents,
    pub current_balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(name: String, init_balance: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            init_balance,
            current_balance: init_balance,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy of this wallet with `delta` applied to the running balance.
    pub fn with_balance_change(&self, delta: Cents) -> Result<Self, BalanceOverflow> {
        let current_balance =
            self.current_balance
                .checked_add(delta)
                .ok_or_else(|| BalanceOverflow {
                    wallet: self.name.clone(),
                })?;
        Ok(Self {
            current_balance,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_starts_at_init_balance() {
        let wallet = Wallet::new("Cash".into(), 10000);
        assert_eq!(wallet.init_balance, 10000);
        assert_eq!(wallet.current_balance, 10000);
    }

    #[test]
    fn test_balance_change_leaves_original_untouched() {
        let wallet = Wallet::new("Cash".into(), 20000);
        let debited = wallet.with_balance_change(-3000).unwrap();

        assert_eq!(debited.current_balance, 17000);
        assert_eq!(debited.init_balance, 20000);
        assert_eq!(debited.id, wallet.id);
        assert_eq!(wallet.current_balance, 20000);
    }

    #[test]
    fn test_balance_change_overflow() {
        let wallet = Wallet::new("Cash".into(), i64::MAX - 100);
        let err = wallet.with_balance_change(101).unwrap_err();
        assert_eq!(err.wallet, "Cash");
        assert!(wallet.with_balance_change(100).is_ok());

        let wallet = Wallet::new("Debt".into(), i64::MIN + 5);
        assert!(wallet.with_balance_change(-6).is_err());
    }
}
