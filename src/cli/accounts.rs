use super::ui;
use crate::core::Store;
use crate::core::model::AccountRecord;
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use comfy_table::Cell;

struct AccountRow {
    record: AccountRecord,
    last_recorded: Option<(NaiveDate, f64)>,
}

/// Prints stored accounts with the most recent balance recorded this year.
pub async fn run(store: &dyn Store) -> Result<()> {
    let rows = collect_rows(store, Local::now().year()).await?;
    if rows.is_empty() {
        println!("No accounts saved yet. Run `nalo-sync sync` first.");
        return Ok(());
    }
    println!("{}", display_as_table(&rows));
    Ok(())
}

async fn collect_rows(store: &dyn Store, year: i32) -> Result<Vec<AccountRow>> {
    let mut records = store.accounts().await?;
    records.sort_by(|a, b| a.account.label.cmp(&b.account.label));

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let history = store.balance_history(year, &record.id).await?;
        rows.push(AccountRow {
            last_recorded: history.latest(),
            record,
        });
    }
    Ok(rows)
}

fn display_as_table(rows: &[AccountRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Account"),
        ui::header_cell("Number"),
        ui::header_cell("Balance"),
        ui::header_cell("Recorded on"),
    ]);

    for row in rows {
        let account = &row.record.account;
        let balance = row.last_recorded.map(|(_, b)| b).unwrap_or(account.balance);
        table.add_row(vec![
            Cell::new(&account.label),
            Cell::new(&account.number),
            ui::amount_cell(balance, &account.currency),
            ui::format_optional_cell(row.last_recorded, |(date, _)| date.to_string()),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Nalo accounts", ui::StyleType::Title),
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::AccountSnapshot;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_rows_use_latest_recorded_balance() {
        let store = MemoryStore::new();
        let records = store
            .reconcile_accounts(&[
                AccountSnapshot::new("2", "Retraite", 80.0),
                AccountSnapshot::new("1", "Etudes", 10.0),
            ])
            .await
            .unwrap();

        let mut history = store.balance_history(2024, &records[0].id).await.unwrap();
        history.record(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 70.0);
        history.record(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 75.0);
        store.upsert_balance_history(&history).await.unwrap();

        let rows = collect_rows(&store, 2024).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.account.label, "Etudes");
        assert!(rows[0].last_recorded.is_none());
        assert_eq!(
            rows[1].last_recorded,
            Some((NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 75.0))
        );

        let output = console::strip_ansi_codes(&display_as_table(&rows)).to_string();
        assert!(output.contains("75.00 EUR"));
        assert!(output.contains("10.00 EUR"));
        assert!(output.contains("2024-02-01"));
    }
}
