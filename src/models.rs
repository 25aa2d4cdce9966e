//! Data model for one extraction run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single utility account as listed on the portal's accounts view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account number as displayed; 0 when the number could not be parsed.
    pub number: u32,
    pub service: String,
    pub address: String,
    pub status: String,
    /// Per-account detail, populated once after list extraction.
    #[serde(default, skip_serializing_if = "DetailRecord::is_empty")]
    pub detail: DetailRecord,
}

impl Account {
    pub fn new(
        number: u32,
        service: impl Into<String>,
        address: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            number,
            service: service.into(),
            address: address.into(),
            status: status.into(),
            detail: DetailRecord::default(),
        }
    }
}

/// Everything extracted for one person in one portal session.
///
/// `accounts` keeps the on-page display order of the list view and is never
/// reordered afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub username: String,
    pub person_id: String,
    pub full_name: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Structured fields and line-item tables scraped from one detail view.
///
/// A missing key means "unknown". Downstream consumers must never treat
/// absence as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, Vec<BTreeMap<String, String>>>,
}

impl DetailRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.tables.is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Append a row to a named line-item table, creating the table if needed.
    pub fn push_row(&mut self, table: &str, row: BTreeMap<String, String>) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Record carrying only an error marker, used when parsing blew up entirely.
    pub fn from_error(message: impl Into<String>) -> Self {
        let mut record = Self::default();
        record.set("error", message);
        record
    }
}

/// Challenge descriptor handed to a captcha resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub site_key: String,
    pub page_url: String,
}

/// Opaque captcha verification token.
///
/// The empty token marks an implicit resolution: no challenge was actually
/// presented, so there is nothing to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaToken(String);

impl CaptchaToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn implicit() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_implicit(&self) -> bool {
        self.0.is_empty()
    }
}
