use serde::Serialize;
use tracing::debug;

use crate::domain::{
    Cents, IncomeExpense, MonthPeriod, MonthlyReport, Wallet, WalletId, compute_income_expense,
    monthly_report,
};

use super::{AppError, LedgerService};

/// Lifetime totals of one wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletTotals {
    pub wallet: String,
    pub current_balance: Cents,
    #[serde(flatten)]
    pub totals: IncomeExpense,
}

impl LedgerService {
    /// Opening and ending balance of a month, with its income and expense.
    pub async fn monthly_report(
        &self,
        wallet_id: WalletId,
        period: MonthPeriod,
    ) -> Result<MonthlyReport, AppError> {
        let wallet = self.get_wallet_by_id(wallet_id).await?;
        let before = self.transactions_before_month(wallet.id, period).await?;
        let current = self.transactions_of_month(wallet.id, period).await?;

        debug!(
            wallet = %wallet.name,
            %period,
            before = before.len(),
            current = current.len(),
            "building monthly report"
        );
        Ok(monthly_report(period, wallet.init_balance, &before, &current))
    }

    /// Income, expense and balance over all active transactions of a wallet.
    pub async fn total_report(&self, wallet_id: WalletId) -> Result<IncomeExpense, AppError> {
        let transactions = self.all_transactions_of_wallet(wallet_id).await?;
        Ok(compute_income_expense(&transactions))
    }

    /// Total report for every wallet.
    pub async fn all_wallet_totals(&self) -> Result<Vec<WalletTotals>, AppError> {
        let wallets: Vec<Wallet> = self.list_wallets().await?;
        let mut totals = Vec::with_capacity(wallets.len());

        for wallet in wallets {
            let report = self.total_report(wallet.id).await?;
            totals.push(WalletTotals {
                wallet: wallet.name,
                current_balance: wallet.current_balance,
                totals: report,
            });
        }

        Ok(totals)
    }
}
