use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{CategorizedTransaction, CategoryId, MonthPeriod, MonthlyReport, Wallet};

/// One month of a wallet: its report and the transactions behind it.
#[derive(Debug, Clone, Serialize)]
pub struct MonthStatement {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub wallet: Wallet,
    pub report: MonthlyReport,
    pub transactions: Vec<CategorizedTransaction>,
}

/// Writes ledger data out as CSV or JSON.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Write the month's active transactions as CSV. Returns the row count.
    pub async fn export_month_csv<W: Write>(
        &self,
        wallet: &Wallet,
        period: MonthPeriod,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.transactions_of_month(wallet.id, period).await?;
        let category_names: HashMap<CategoryId, String> = self
            .service
            .list_categories(wallet.id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "id",
            "done_date",
            "wallet",
            "category",
            "type_id",
            "amount_cents",
            "title",
            "note",
            "parent",
        ])?;

        for entry in &transactions {
            let tx = &entry.transaction;
            csv_writer.write_record([
                tx.id.to_string(),
                tx.done_date.to_rfc3339(),
                wallet.name.clone(),
                category_names
                    .get(&tx.category_id)
                    .cloned()
                    .unwrap_or_else(|| tx.category_id.to_string()),
                entry.type_id.to_string(),
                tx.amount.to_string(),
                tx.title.clone().unwrap_or_default(),
                tx.note.clone().unwrap_or_default(),
                tx.parent.map(|id| id.to_string()).unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Write the month's report and transactions as a JSON document.
    pub async fn export_month_json<W: Write>(
        &self,
        wallet: &Wallet,
        period: MonthPeriod,
        mut writer: W,
    ) -> Result<MonthStatement> {
        let report = self.service.monthly_report(wallet.id, period).await?;
        let transactions = self.service.transactions_of_month(wallet.id, period).await?;

        let statement = MonthStatement {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            wallet: wallet.clone(),
            report,
            transactions,
        };

        let json = serde_json::to_string_pretty(&statement)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(statement)
    }
}
