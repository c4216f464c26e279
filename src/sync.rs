//! The connector run: login, documents, accounts, balances

use crate::core::extract;
use crate::core::model::{
    AccountRecord, Bill, Credentials, ExtractedFields, FetchedDocument, PDF_CONTENT_TYPE,
    SessionToken, StoredFile,
};
use crate::core::{NaloApi, PdfTextReader, Store};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

/// What a run saved.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub files: Vec<StoredFile>,
    pub bills: Vec<Bill>,
    pub skipped_documents: usize,
    pub accounts: Vec<AccountRecord>,
}

pub struct Connector<'a> {
    api: &'a dyn NaloApi,
    store: &'a dyn Store,
    pdf: &'a dyn PdfTextReader,
    bill_identifiers: Vec<String>,
}

impl<'a> Connector<'a> {
    pub fn new(
        api: &'a dyn NaloApi,
        store: &'a dyn Store,
        pdf: &'a dyn PdfTextReader,
        bill_identifiers: Vec<String>,
    ) -> Self {
        Self {
            api,
            store,
            pdf,
            bill_identifiers,
        }
    }

    /// Runs every step in order. The first failure aborts the run.
    pub async fn run(&self, credentials: &Credentials, today: NaiveDate) -> Result<SyncReport> {
        info!("Authenticating ...");
        let token = self.api.authenticate(credentials).await?;
        info!("Successfully logged in");

        info!("Retrieve documents");
        let mut report = SyncReport {
            files: self.retrieve_signed_documents(&token).await?,
            ..Default::default()
        };
        let (bills, skipped) = self.retrieve_transactional_documents(&token).await?;
        report.bills = bills;
        report.skipped_documents = skipped;

        info!("Retrieving details of bank accounts");
        let accounts = self.api.get_accounts(&token).await?;

        info!("Saving accounts and balances");
        report.accounts = self.store.reconcile_accounts(&accounts).await?;
        self.save_balances(&report.accounts, today).await?;

        info!("All done!");
        Ok(report)
    }

    async fn retrieve_signed_documents(&self, token: &SessionToken) -> Result<Vec<StoredFile>> {
        let refs = self.api.list_signed_documents(token).await?;
        debug!(count = refs.len(), "Listed signed documents");

        let mut docs = Vec::with_capacity(refs.len());
        for doc_ref in &refs {
            docs.push(self.api.fetch_signed_document(token, doc_ref).await?);
        }
        self.store.save_files(&docs, PDF_CONTENT_TYPE).await
    }

    async fn retrieve_transactional_documents(
        &self,
        token: &SessionToken,
    ) -> Result<(Vec<Bill>, usize)> {
        let refs = self.api.list_transactional_documents(token).await?;
        debug!(count = refs.len(), "Listed transactional documents");

        let mut bills = Vec::with_capacity(refs.len());
        let mut skipped = 0;
        for doc_ref in &refs {
            let doc = self.api.fetch_transactional_document(token, doc_ref).await?;
            let fields = self.extract_fields(&doc);
            if fields.ignore {
                debug!(filename = doc.filename(), "Skipping document");
                skipped += 1;
                continue;
            }
            let bill = Bill::from_document(&doc, &fields, &self.bill_identifiers);
            bills.push((doc, bill));
        }

        let saved = self.store.save_bills(&bills, PDF_CONTENT_TYPE).await?;
        Ok((saved, skipped))
    }

    fn extract_fields(&self, doc: &FetchedDocument) -> ExtractedFields {
        match self.pdf.read_text(doc.bytes()) {
            Ok(text) => extract::extract(&text),
            Err(e) => {
                // Unreadable documents are kept, without bill fields
                warn!(filename = doc.filename(), error = %e, "Unable to read PDF text");
                ExtractedFields::default()
            }
        }
    }

    async fn save_balances(&self, accounts: &[AccountRecord], today: NaiveDate) -> Result<()> {
        let year = today.year();
        try_join_all(accounts.iter().map(|record| async move {
            let mut history = self.store.balance_history(year, &record.id).await?;
            history.record(today, record.account.balance);
            self.store.upsert_balance_history(&history).await
        }))
        .await?;
        Ok(())
    }
}
