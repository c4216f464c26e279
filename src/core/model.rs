//! Records exchanged between the Nalo API, the extractor and the store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const VENDOR: &str = "Nalo";
pub const ACCOUNT_TYPE: &str = "LifeInsurance";
pub const CURRENCY: &str = "EUR";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Bearer token returned by `/login`, valid for a single run.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn authorization_header(&self) -> String {
        format!("Token {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocumentRef {
    pub id: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionalDocumentRef {
    pub id: Option<String>,
    pub contract_id: String,
    pub id_operation: String,
}

/// A downloaded document, decoded from its base64 payload.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    filename: String,
    bytes: Vec<u8>,
    imported_at: DateTime<Utc>,
}

impl FetchedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            imported_at: Utc::now(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn vendor(&self) -> &'static str {
        VENDOR
    }

    pub fn imported_at(&self) -> DateTime<Utc> {
        self.imported_at
    }

    pub fn version(&self) -> u32 {
        DOCUMENT_VERSION
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub ignore: bool,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
}

impl ExtractedFields {
    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub label: String,
    pub institution_label: String,
    pub balance: f64,
    #[serde(rename = "type")]
    pub account_type: String,
    pub number: String,
    pub vendor_id: String,
    pub currency: String,
}

impl AccountSnapshot {
    pub fn new(vendor_id: impl Into<String>, label: impl Into<String>, raw_balance: f64) -> Self {
        let vendor_id = vendor_id.into();
        Self {
            label: label.into(),
            institution_label: VENDOR.to_string(),
            balance: round_cents(raw_balance),
            account_type: ACCOUNT_TYPE.to_string(),
            number: vendor_id.clone(),
            vendor_id,
            currency: CURRENCY.to_string(),
        }
    }
}

/// An account as persisted by a store, with its stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    #[serde(flatten)]
    pub account: AccountSnapshot,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceHistoryRecord {
    pub year: i32,
    pub account_id: String,
    pub balances: BTreeMap<NaiveDate, f64>,
}

impl BalanceHistoryRecord {
    pub fn new(year: i32, account_id: impl Into<String>) -> Self {
        Self {
            year,
            account_id: account_id.into(),
            balances: BTreeMap::new(),
        }
    }

    /// Sets the balance for `date`, replacing any value already recorded that day.
    pub fn record(&mut self, date: NaiveDate, balance: f64) {
        self.balances.insert(date, balance);
    }

    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.balances.iter().next_back().map(|(d, b)| (*d, *b))
    }
}

/// Metadata kept for every file written by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    pub vendor: String,
    pub content_type: String,
    pub imported_at: DateTime<Utc>,
    pub version: u32,
    pub size: u64,
}

impl StoredFile {
    pub fn describe(doc: &FetchedDocument, content_type: &str) -> Self {
        Self {
            filename: doc.filename().to_string(),
            vendor: doc.vendor().to_string(),
            content_type: content_type.to_string(),
            imported_at: doc.imported_at(),
            version: doc.version(),
            size: doc.bytes().len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub filename: String,
    pub vendor: String,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub currency: String,
    pub matching_identifiers: Vec<String>,
    pub imported_at: DateTime<Utc>,
}

impl Bill {
    pub fn from_document(
        doc: &FetchedDocument,
        fields: &ExtractedFields,
        identifiers: &[String],
    ) -> Self {
        Self {
            filename: doc.filename().to_string(),
            vendor: doc.vendor().to_string(),
            date: fields.date,
            amount: fields.amount,
            currency: CURRENCY.to_string(),
            matching_identifiers: identifiers.to_vec(),
            imported_at: doc.imported_at(),
        }
    }
}

/// Rounds a monetary value to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
