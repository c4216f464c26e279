use crate::core::model::{
    AccountRecord, AccountSnapshot, BalanceHistoryRecord, Bill, FetchedDocument, StoredFile,
};
use crate::core::store::{Store, history_key};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    files: Vec<(StoredFile, Vec<u8>)>,
    bills: Vec<Bill>,
    accounts: Vec<AccountRecord>,
    histories: HashMap<String, BalanceHistoryRecord>,
}

/// In-memory store, used for tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file_bytes(&self, filename: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().await;
        inner
            .files
            .iter()
            .find(|(meta, _)| meta.filename == filename)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_files(
        &self,
        docs: &[FetchedDocument],
        content_type: &str,
    ) -> Result<Vec<StoredFile>> {
        let mut inner = self.inner.lock().await;
        let mut saved = Vec::with_capacity(docs.len());
        for doc in docs {
            if let Some((existing, _)) = inner
                .files
                .iter()
                .find(|(meta, _)| meta.filename == doc.filename())
            {
                debug!(filename = doc.filename(), "File already saved");
                saved.push(existing.clone());
                continue;
            }
            let meta = StoredFile::describe(doc, content_type);
            inner.files.push((meta.clone(), doc.bytes().to_vec()));
            saved.push(meta);
        }
        Ok(saved)
    }

    async fn upsert_bills(&self, bills: &[Bill]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for bill in bills {
            match inner.bills.iter_mut().find(|b| b.filename == bill.filename) {
                Some(existing) => *existing = bill.clone(),
                None => inner.bills.push(bill.clone()),
            }
        }
        Ok(())
    }

    async fn reconcile_accounts(&self, accounts: &[AccountSnapshot]) -> Result<Vec<AccountRecord>> {
        let mut inner = self.inner.lock().await;
        let mut saved = Vec::with_capacity(accounts.len());
        for account in accounts {
            let record = match inner
                .accounts
                .iter_mut()
                .find(|r| r.account.vendor_id == account.vendor_id)
            {
                Some(existing) => {
                    existing.account = account.clone();
                    existing.updated_at = Utc::now();
                    existing.clone()
                }
                None => {
                    let record = AccountRecord {
                        id: Uuid::new_v4().to_string(),
                        account: account.clone(),
                        updated_at: Utc::now(),
                    };
                    inner.accounts.push(record.clone());
                    record
                }
            };
            saved.push(record);
        }
        Ok(saved)
    }

    async fn balance_history(&self, year: i32, account_id: &str) -> Result<BalanceHistoryRecord> {
        let inner = self.inner.lock().await;
        Ok(inner
            .histories
            .get(&history_key(year, account_id))
            .cloned()
            .unwrap_or_else(|| BalanceHistoryRecord::new(year, account_id)))
    }

    async fn upsert_balance_history(&self, record: &BalanceHistoryRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .histories
            .insert(history_key(record.year, &record.account_id), record.clone());
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<AccountRecord>> {
        Ok(self.inner.lock().await.accounts.clone())
    }

    async fn bills(&self) -> Result<Vec<Bill>> {
        Ok(self.inner.lock().await.bills.clone())
    }

    async fn files(&self) -> Result<Vec<StoredFile>> {
        let inner = self.inner.lock().await;
        Ok(inner.files.iter().map(|(meta, _)| meta.clone()).collect())
    }
}
