mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{StandardWallets, assert_ledger_consistent, record, test_service};
use walletbook::domain::MonthPeriod;

#[tokio::test]
async fn test_monthly_report_opening_and_ending_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let wallet = service.create_wallet("Main".into(), 10000).await?;
    let salary = service.create_category(wallet.id, "Salary".into(), 1).await?;
    let food = service.create_category(wallet.id, "Food".into(), 2).await?;

    record(&service, &wallet, &salary, 5000, "2024-03-05").await?;
    record(&service, &wallet, &food, 2000, "2024-03-20").await?;

    let report = service
        .monthly_report(wallet.id, MonthPeriod::new(3, 2024)?)
        .await?;

    assert_eq!(report.opening_balance, 10000);
    assert_eq!(report.ending_balance, 13000);
    assert_eq!(report.income, 5000);
    assert_eq!(report.expense, 2000);
    assert_eq!(report.balance, 3000);
    Ok(())
}

#[tokio::test]
async fn test_monthly_report_carries_earlier_months_across_years() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    record(&service, &fx.checking, &fx.salary, 10000, "2023-11-15").await?;
    record(&service, &fx.checking, &fx.groceries, 1500, "2023-12-31").await?;
    record(&service, &fx.checking, &fx.groceries, 700, "2024-01-01").await?;
    record(&service, &fx.checking, &fx.salary, 4000, "2024-02-01").await?;

    let january = service
        .monthly_report(fx.checking.id, MonthPeriod::new(1, 2024)?)
        .await?;

    // 200.00 + 100.00 - 15.00
    assert_eq!(january.opening_balance, 28500);
    assert_eq!(january.income, 0);
    assert_eq!(january.expense, 700);
    // Ending balance counts only the month itself on top of the initial balance
    assert_eq!(january.ending_balance, 20000 - 700);

    let december = service
        .monthly_report(fx.checking.id, MonthPeriod::new(12, 2023)?)
        .await?;
    assert_eq!(december.opening_balance, 30000);
    assert_eq!(december.expense, 1500);
    Ok(())
}

#[tokio::test]
async fn test_month_queries_split_at_month_boundaries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    record(&service, &fx.checking, &fx.salary, 100, "2024-02-29").await?;
    record(&service, &fx.checking, &fx.salary, 200, "2024-03-01").await?;
    record(&service, &fx.checking, &fx.salary, 300, "2024-03-31").await?;
    record(&service, &fx.checking, &fx.salary, 400, "2024-04-01").await?;
    record(&service, &fx.checking, &fx.salary, 500, "2025-03-15").await?;

    let march = MonthPeriod::new(3, 2024)?;
    let amounts = |list: Vec<walletbook::domain::CategorizedTransaction>| {
        list.into_iter()
            .map(|t| t.transaction.amount)
            .collect::<Vec<_>>()
    };

    assert_eq!(
        amounts(service.transactions_of_month(fx.checking.id, march).await?),
        vec![200, 300]
    );
    assert_eq!(
        amounts(service.transactions_before_month(fx.checking.id, march).await?),
        vec![100]
    );
    assert_eq!(
        amounts(service.transactions_after_month(fx.checking.id, march).await?),
        vec![400, 500]
    );
    assert_eq!(
        amounts(service.all_transactions_of_wallet(fx.checking.id).await?),
        vec![100, 200, 300, 400, 500]
    );
    Ok(())
}

#[tokio::test]
async fn test_queries_are_scoped_to_wallet() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    record(&service, &fx.checking, &fx.salary, 1000, "2024-03-10").await?;
    record(&service, &fx.savings, &fx.interest, 25, "2024-03-10").await?;

    let march = MonthPeriod::new(3, 2024)?;
    let checking = service.transactions_of_month(fx.checking.id, march).await?;
    let savings = service.transactions_of_month(fx.savings.id, march).await?;

    assert_eq!(checking.len(), 1);
    assert_eq!(checking[0].transaction.wallet_id, fx.checking.id);
    assert_eq!(savings.len(), 1);
    assert_eq!(savings[0].transaction.amount, 25);
    Ok(())
}

#[tokio::test]
async fn test_transactions_of_day() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    let first = record(&service, &fx.checking, &fx.groceries, 300, "2024-03-10").await?;
    record(&service, &fx.checking, &fx.groceries, 400, "2024-03-11").await?;
    let second = record(&service, &fx.checking, &fx.salary, 500, "2024-03-10").await?;

    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let list = service.transactions_of_day(fx.checking.id, day).await?;

    let ids: Vec<_> = list.iter().map(|t| t.transaction.id).collect();
    assert_eq!(ids, vec![first.transaction.id, second.transaction.id]);
    Ok(())
}

#[tokio::test]
async fn test_total_report() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    record(&service, &fx.checking, &fx.salary, 250000, "2024-01-25").await?;
    record(&service, &fx.checking, &fx.groceries, 12000, "2024-02-03").await?;
    record(&service, &fx.checking, &fx.groceries, 8000, "2024-03-03").await?;

    let totals = service.total_report(fx.checking.id).await?;
    assert_eq!(totals.income, 250000);
    assert_eq!(totals.expense, 20000);
    assert_eq!(totals.balance, 230000);

    let empty = service.total_report(fx.savings.id).await?;
    assert_eq!((empty.income, empty.expense, empty.balance), (0, 0, 0));

    let all = service.all_wallet_totals().await?;
    assert_eq!(all.len(), 2);
    let checking = all.iter().find(|t| t.wallet == "Checking").unwrap();
    assert_eq!(checking.current_balance, 20000 + 230000);
    assert_eq!(checking.totals.balance, 230000);
    Ok(())
}

#[tokio::test]
async fn test_reports_ignore_deleted_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;

    record(&service, &fx.checking, &fx.salary, 5000, "2024-03-05").await?;
    let mistake = record(&service, &fx.checking, &fx.groceries, 9999, "2024-03-06").await?;
    service.reverse_transaction(mistake.transaction.id).await?;

    let march = MonthPeriod::new(3, 2024)?;
    let report = service.monthly_report(fx.checking.id, march).await?;
    assert_eq!(report.expense, 0);
    assert_eq!(report.ending_balance, 25000);

    let listed = service.transactions_of_month(fx.checking.id, march).await?;
    assert_eq!(listed.len(), 1);

    let totals = service.total_report(fx.checking.id).await?;
    assert_eq!(totals.balance, 5000);

    assert_ledger_consistent(&service).await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_category_type_does_not_count() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = StandardWallets::create(&service).await?;
    let memo = service
        .create_category(fx.checking.id, "Memo".into(), 7)
        .await?;

    record(&service, &fx.checking, &fx.salary, 1000, "2024-03-05").await?;
    let untyped = record(&service, &fx.checking, &memo, 4200, "2024-03-06").await?;

    // Stored, listed, but neither income nor expense
    assert_eq!(untyped.wallet.current_balance, 21000);
    let listed = service
        .transactions_of_month(fx.checking.id, MonthPeriod::new(3, 2024)?)
        .await?;
    assert_eq!(listed.len(), 2);

    let totals = service.total_report(fx.checking.id).await?;
    assert_eq!(totals.income, 1000);
    assert_eq!(totals.expense, 0);

    assert_ledger_consistent(&service).await?;
    Ok(())
}

#[tokio::test]
async fn test_monthly_report_for_unknown_wallet_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .monthly_report(uuid::Uuid::new_v4(), MonthPeriod::new(1, 2024)?)
        .await;
    assert!(result.is_err());
    Ok(())
}
