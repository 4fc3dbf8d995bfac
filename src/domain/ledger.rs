use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CategorizedTransaction, CategoryType, Cents, TypeId, Wallet, WalletId};

/// Income, expense and their difference over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeExpense {
    pub income: Cents,
    pub expense: Cents,
    pub balance: Cents,
}

/// Sum income (type 1) and expense (type 2) amounts of active transactions.
/// Transactions whose category has any other type id count toward neither.
/// Sums saturate at the bounds of `Cents`.
pub fn compute_income_expense(transactions: &[CategorizedTransaction]) -> IncomeExpense {
    let (income, expense) = transactions
        .iter()
        .filter(|t| t.transaction.is_active())
        .fold((0 as Cents, 0 as Cents), |(income, expense), t| {
            match CategoryType::from_id(t.type_id) {
                Some(CategoryType::Income) => {
                    (income.saturating_add(t.transaction.amount), expense)
                }
                Some(CategoryType::Expense) => {
                    (income, expense.saturating_add(t.transaction.amount))
                }
                None => (income, expense),
            }
        });

    IncomeExpense {
        income,
        expense,
        balance: income.saturating_sub(expense),
    }
}

/// Change a transaction of `amount` makes to its wallet's running balance.
pub fn balance_effect(type_id: TypeId, amount: Cents) -> Cents {
    match CategoryType::from_id(type_id) {
        Some(CategoryType::Income) => amount,
        Some(CategoryType::Expense) => -amount,
        None => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid month {month}/{year}")]
pub struct InvalidMonth {
    pub month: u32,
    pub year: i32,
}

/// A calendar month. Transactions belong to it by the month and year of
/// their `done_date` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPeriod {
    month: u32,
    year: i32,
}

impl MonthPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, InvalidMonth> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(InvalidMonth { month, year });
        }
        // The following month must be representable too, for `bounds`.
        let period = Self { month, year };
        let (next_month, next_year) = period.next_month_year();
        if NaiveDate::from_ymd_opt(next_year, next_month, 1).is_none() {
            return Err(InvalidMonth { month, year });
        }
        Ok(period)
    }

    pub fn containing(date: DateTime<Utc>) -> Self {
        use chrono::Datelike;
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    fn next_month_year(&self) -> (u32, i32) {
        if self.month == 12 {
            (1, self.year + 1)
        } else {
            (self.month + 1, self.year)
        }
    }

    /// Half-open `[start, end)` range: midnight of the first day of this
    /// month up to midnight of the first day of the next one.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (next_month, next_year) = self.next_month_year();
        (
            first_of_month(self.year, self.month),
            first_of_month(next_year, next_month),
        )
    }
}

impl std::fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Validated in MonthPeriod::new
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub period: MonthPeriod,
    pub opening_balance: Cents,
    pub ending_balance: Cents,
    pub income: Cents,
    pub expense: Cents,
    pub balance: Cents,
}

/// Build a monthly report from the transactions dated before the month and
/// the ones dated within it.
///
/// Both balances start from the wallet's initial balance: the opening
/// balance adds everything before the month, the ending balance adds only
/// the month itself.
pub fn monthly_report(
    period: MonthPeriod,
    init_balance: Cents,
    before: &[CategorizedTransaction],
    current: &[CategorizedTransaction],
) -> MonthlyReport {
    let before = compute_income_expense(before);
    let current = compute_income_expense(current);

    MonthlyReport {
        period,
        opening_balance: init_balance.saturating_add(before.balance),
        ending_balance: init_balance.saturating_add(current.balance),
        income: current.income,
        expense: current.expense,
        balance: current.balance,
    }
}

/// Difference between a wallet's persisted balance and the one recomputed
/// from its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub wallet_id: WalletId,
    pub wallet_name: String,
    pub stored: Cents,
    pub expected: Cents,
}

pub fn check_wallet_consistency(
    wallet: &Wallet,
    transactions: &[CategorizedTransaction],
) -> Option<BalanceDrift> {
    let expected = wallet
        .init_balance
        .saturating_add(compute_income_expense(transactions).balance);
    if expected == wallet.current_balance {
        None
    } else {
        Some(BalanceDrift {
            wallet_id: wallet.id,
            wallet_name: wallet.name.clone(),
            stored: wallet.current_balance,
            expected,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub wallet_count: i64,
    pub transaction_count: i64,
    pub deleted_count: i64,
    pub drifts: Vec<BalanceDrift>,
    /// Transactions whose category row is missing
    pub orphaned_transactions: i64,
    /// Transfer legs whose parent is not in the ledger
    pub dangling_transfer_legs: i64,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.drifts.is_empty() && self.orphaned_transactions == 0 && self.dangling_transfer_legs == 0
    }

    pub fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .drifts
            .iter()
            .map(|d| {
                format!(
                    "Wallet {} stores balance {} but its transactions add up to {}",
                    d.wallet_name, d.stored, d.expected
                )
            })
            .collect();
        if self.orphaned_transactions > 0 {
            issues.push(format!(
                "{} transaction(s) reference a missing category",
                self.orphaned_transactions
            ));
        }
        if self.dangling_transfer_legs > 0 {
            issues.push(format!(
                "{} transfer leg(s) point at a missing parent",
                self.dangling_transfer_legs
            ));
        }
        issues
    }
}
