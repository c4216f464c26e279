use super::ui;
use crate::core::PdfExtractReader;
use crate::core::config::AppConfig;
use crate::providers::NaloProvider;
use crate::store;
use crate::sync::{Connector, SyncReport};
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;
use tracing::debug;

pub async fn run(config: &AppConfig) -> Result<()> {
    if config.reporting_endpoint.is_some() {
        debug!("Error reporting endpoint configured");
    }
    if config.parameters.is_some() {
        debug!("Found connector parameters");
    }

    let credentials = config.credentials()?;
    let provider = NaloProvider::new(&config.provider.base_url)?;
    let store = store::open_store(config)?;
    let connector = Connector::new(
        &provider,
        &store,
        &PdfExtractReader,
        config.bill_identifiers.clone(),
    );

    let report = connector.run(&credentials, Local::now().date_naive()).await?;
    println!("{}", report.display_as_table());
    Ok(())
}

impl SyncReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Account"),
            ui::header_cell("Number"),
            ui::header_cell("Balance"),
        ]);

        let mut total = 0.0;
        for record in &self.accounts {
            let account = &record.account;
            total += account.balance;
            table.add_row(vec![
                Cell::new(&account.label),
                Cell::new(&account.number),
                ui::amount_cell(account.balance, &account.currency),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Nalo accounts", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Total", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
        ));
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "{} files, {} bills saved, {} documents skipped",
                    self.files.len(),
                    self.bills.len(),
                    self.skipped_documents
                ),
                ui::StyleType::Subtle
            )
        ));
        output
    }
}
