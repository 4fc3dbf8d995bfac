use chrono::{DateTime, Utc};

use super::{BalanceOverflow, Category, Cents, Transaction, Wallet, balance_effect};

pub const TRANSFER_TITLE: &str = "Transfer Money";

/// The two entries of a money transfer between wallets, plus the wallet
/// states that result from applying them.
///
/// Legs are only ever persisted together: both transactions and both wallet
/// balances are written in a single database transaction.
#[derive(Debug, Clone)]
pub struct TransferLegs {
    pub debit: Transaction,
    pub credit: Transaction,
    pub source: Wallet,
    pub destination: Wallet,
}

impl TransferLegs {
    /// Build both legs. The debit leg books `amount` on `source` under the
    /// caller's category, the credit leg books it on `destination` under the
    /// receiver category. Each wallet's new balance follows the type of the
    /// category its leg uses. Fails if either balance leaves the range of
    /// `Cents`.
    pub fn new(
        source: &Wallet,
        destination: &Wallet,
        amount: Cents,
        debit_category: &Category,
        credit_category: &Category,
        done_date: DateTime<Utc>,
    ) -> Result<Self, BalanceOverflow> {
        assert!(amount > 0, "Transfer amount must be positive");
        assert_ne!(source.id, destination.id, "Transfer needs two wallets");

        let debit = Transaction::new(source.id, debit_category.id, amount, done_date)
            .with_title(TRANSFER_TITLE)
            .with_note(format!("Transfer money to {}", destination.name));

        let credit = Transaction::new(destination.id, credit_category.id, amount, done_date)
            .with_title(TRANSFER_TITLE)
            .with_note(format!("Received from {}", source.name))
            .with_parent(debit.id);

        Ok(Self {
            source: source.with_balance_change(balance_effect(debit_category.type_id, amount))?,
            destination: destination
                .with_balance_change(balance_effect(credit_category.type_id, amount))?,
            debit,
            credit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryType;

    fn wallet_with(name: &str, balance: Cents) -> Wallet {
        Wallet::new(name.into(), balance)
    }

    #[test]
    fn test_transfer_legs() {
        let source = wallet_with("Checking", 20000);
        let destination = wallet_with("Savings", 5000);
        let outgoing = Category::new(source.id, "Transfer out".into(), CategoryType::EXPENSE_ID);
        let incoming = Category::new(destination.id, "Transfer".into(), CategoryType::INCOME_ID);

        let legs = TransferLegs::new(&source, &destination, 3000, &outgoing, &incoming, Utc::now())
            .unwrap();

        assert_eq!(legs.source.current_balance, 17000);
        assert_eq!(legs.destination.current_balance, 8000);
        assert_eq!(legs.debit.wallet_id, source.id);
        assert_eq!(legs.credit.wallet_id, destination.id);
        assert_eq!(legs.debit.category_id, outgoing.id);
        assert_eq!(legs.credit.category_id, incoming.id);
        assert_eq!(legs.credit.parent, Some(legs.debit.id));
        assert_eq!(legs.debit.note.as_deref(), Some("Transfer money to Savings"));
        assert_eq!(legs.credit.note.as_deref(), Some("Received from Checking"));
        assert_eq!(legs.debit.title.as_deref(), Some(TRANSFER_TITLE));
    }

    #[test]
    #[should_panic(expected = "Transfer amount must be positive")]
    fn test_transfer_requires_positive_amount() {
        let source = wallet_with("A", 0);
        let destination = wallet_with("B", 0);
        let category = Category::new(source.id, "Out".into(), CategoryType::EXPENSE_ID);
        let _ = TransferLegs::new(&source, &destination, 0, &category, &category, Utc::now());
    }

    #[test]
    fn test_transfer_overflowing_destination() {
        let source = wallet_with("Checking", 20000);
        let destination = wallet_with("Savings", i64::MAX - 10);
        let outgoing = Category::new(source.id, "Transfer out".into(), CategoryType::EXPENSE_ID);
        let incoming = Category::new(destination.id, "Transfer".into(), CategoryType::INCOME_ID);

        let err = TransferLegs::new(&source, &destination, 11, &outgoing, &incoming, Utc::now())
            .unwrap_err();
        assert_eq!(err.wallet, "Savings");
    }
}
