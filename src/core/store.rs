//! Persistence abstraction for files, bills, accounts and balance histories

use super::model::{
    AccountRecord, AccountSnapshot, BalanceHistoryRecord, Bill, FetchedDocument, StoredFile,
};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Store: Send + Sync {
    /// Saves each document under its filename. Files already present are kept as is.
    async fn save_files(
        &self,
        docs: &[FetchedDocument],
        content_type: &str,
    ) -> Result<Vec<StoredFile>>;

    /// Saves the documents' files, then upserts one bill per document.
    async fn save_bills(
        &self,
        bills: &[(FetchedDocument, Bill)],
        content_type: &str,
    ) -> Result<Vec<Bill>> {
        let docs: Vec<FetchedDocument> = bills.iter().map(|(doc, _)| doc.clone()).collect();
        self.save_files(&docs, content_type).await?;
        let bills: Vec<Bill> = bills.iter().map(|(_, bill)| bill.clone()).collect();
        self.upsert_bills(&bills).await?;
        Ok(bills)
    }

    async fn upsert_bills(&self, bills: &[Bill]) -> Result<()>;

    /// Matches accounts by vendor id, keeping identifiers stable across runs.
    async fn reconcile_accounts(&self, accounts: &[AccountSnapshot]) -> Result<Vec<AccountRecord>>;

    /// Returns the stored history, or an empty one when none exists yet.
    async fn balance_history(&self, year: i32, account_id: &str) -> Result<BalanceHistoryRecord>;

    async fn upsert_balance_history(&self, record: &BalanceHistoryRecord) -> Result<()>;

    async fn accounts(&self) -> Result<Vec<AccountRecord>>;

    async fn bills(&self) -> Result<Vec<Bill>>;

    async fn files(&self) -> Result<Vec<StoredFile>>;
}

pub(crate) fn history_key(year: i32, account_id: &str) -> String {
    format!("{year}/{account_id}")
}
