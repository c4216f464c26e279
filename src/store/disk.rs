use crate::core::model::{
    AccountRecord, AccountSnapshot, BalanceHistoryRecord, Bill, FetchedDocument, StoredFile,
};
use crate::core::store::{Store, history_key};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Store writing documents to a directory and records to a `fjall` keyspace.
///
/// Layout under the data directory:
/// - `files/<filename>`: raw documents
/// - `db/`: partitions `files`, `bills`, `accounts` and `balance_histories`,
///   values encoded as JSON
pub struct DiskStore {
    files_dir: PathBuf,
    keyspace: Keyspace,
    files: PartitionHandle,
    bills: PartitionHandle,
    accounts: PartitionHandle,
    histories: PartitionHandle,
}

impl DiskStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let files_dir = data_dir.join("files");
        std::fs::create_dir_all(&files_dir)
            .with_context(|| format!("Failed to create directory: {}", files_dir.display()))?;

        let db_dir = data_dir.join("db");
        let keyspace = fjall::Config::new(&db_dir)
            .open()
            .with_context(|| format!("Failed to open database at {}", db_dir.display()))?;
        let open = |name: &str| {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .with_context(|| format!("Failed to open partition {name}"))
        };
        let files = open("files")?;
        let bills = open("bills")?;
        let accounts = open("accounts")?;
        let histories = open("balance_histories")?;

        debug!("Opened store at {}", data_dir.display());
        Ok(Self {
            files_dir,
            keyspace,
            files,
            bills,
            accounts,
            histories,
        })
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    fn file_path(&self, filename: &str) -> Result<PathBuf> {
        // Never let a remote filename escape the files directory
        match Path::new(filename).file_name() {
            Some(name) => Ok(self.files_dir.join(name)),
            None => bail!("Invalid document filename: {filename:?}"),
        }
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store")
    }
}

fn get_json<T: DeserializeOwned>(partition: &PartitionHandle, key: &str) -> Result<Option<T>> {
    match partition.get(key.as_bytes())? {
        Some(value) => Ok(Some(
            serde_json::from_slice(&value).with_context(|| format!("Corrupted record {key}"))?,
        )),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(partition: &PartitionHandle, key: &str, value: &T) -> Result<()> {
    partition.insert(key.as_bytes(), serde_json::to_vec(value)?)?;
    Ok(())
}

fn all_json<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>> {
    partition
        .iter()
        .map(|item| {
            let (_, value) = item?;
            Ok(serde_json::from_slice(&value)?)
        })
        .collect()
}

#[async_trait]
impl Store for DiskStore {
    async fn save_files(
        &self,
        docs: &[FetchedDocument],
        content_type: &str,
    ) -> Result<Vec<StoredFile>> {
        let mut saved = Vec::with_capacity(docs.len());
        for doc in docs {
            let path = self.file_path(doc.filename())?;
            if tokio::fs::try_exists(&path).await? {
                debug!(filename = doc.filename(), "File already saved");
                let meta = get_json::<StoredFile>(&self.files, doc.filename())?
                    .unwrap_or_else(|| StoredFile::describe(doc, content_type));
                saved.push(meta);
                continue;
            }

            tokio::fs::write(&path, doc.bytes())
                .await
                .with_context(|| format!("Failed to write file {}", path.display()))?;
            let meta = StoredFile::describe(doc, content_type);
            put_json(&self.files, &meta.filename, &meta)?;
            debug!(filename = doc.filename(), "Saved file");
            saved.push(meta);
        }
        self.persist()?;
        Ok(saved)
    }

    async fn upsert_bills(&self, bills: &[Bill]) -> Result<()> {
        for bill in bills {
            put_json(&self.bills, &bill.filename, bill)?;
        }
        self.persist()
    }

    async fn reconcile_accounts(&self, accounts: &[AccountSnapshot]) -> Result<Vec<AccountRecord>> {
        let mut saved = Vec::with_capacity(accounts.len());
        for account in accounts {
            let id = match get_json::<AccountRecord>(&self.accounts, &account.vendor_id)? {
                Some(existing) => existing.id,
                None => Uuid::new_v4().to_string(),
            };
            let record = AccountRecord {
                id,
                account: account.clone(),
                updated_at: Utc::now(),
            };
            put_json(&self.accounts, &account.vendor_id, &record)?;
            saved.push(record);
        }
        self.persist()?;
        Ok(saved)
    }

    async fn balance_history(&self, year: i32, account_id: &str) -> Result<BalanceHistoryRecord> {
        Ok(get_json(&self.histories, &history_key(year, account_id))?
            .unwrap_or_else(|| BalanceHistoryRecord::new(year, account_id)))
    }

    async fn upsert_balance_history(&self, record: &BalanceHistoryRecord) -> Result<()> {
        put_json(
            &self.histories,
            &history_key(record.year, &record.account_id),
            record,
        )?;
        self.persist()
    }

    async fn accounts(&self) -> Result<Vec<AccountRecord>> {
        all_json(&self.accounts)
    }

    async fn bills(&self) -> Result<Vec<Bill>> {
        all_json(&self.bills)
    }

    async fn files(&self) -> Result<Vec<StoredFile>> {
        all_json(&self.files)
    }
}
