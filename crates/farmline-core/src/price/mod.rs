//! Market price lookup.
//!
//! Prices come from a region/crop/date-indexed dataset refreshed out-of-band
//! (a sync job rewrites the JSON file on its own schedule). The file-backed
//! implementation re-reads the file on every lookup so refreshes are picked
//! up without a restart; dataset volumes are small enough that this is the
//! simplest correct behavior.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// One row of the price dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub region: String,
    pub crop_type: String,
    pub date: NaiveDate,
    pub price_per_kg: f64,
    pub currency: String,
}

impl PriceRecord {
    /// User-facing price line: `<region>: <price> <currency> (<date>)`.
    pub fn display_line(&self) -> String {
        format!(
            "{}: {} {} ({})",
            self.region, self.price_per_kg, self.currency, self.date
        )
    }
}

/// External price supplier.
#[async_trait]
pub trait PriceLookupPort: Send + Sync {
    /// Most recent record matching `crop_key` (lowercase), or `None` when the
    /// crop is absent from the dataset. Matching on `crop_type` is
    /// case-insensitive; "most recent" is the greatest date, ties broken by
    /// first occurrence in supplier order.
    async fn most_recent(&self, crop_key: &str) -> Result<Option<PriceRecord>>;

    /// All records, optionally filtered by crop and/or region (both
    /// case-insensitive). Serves the REST listing endpoint.
    async fn query(&self, crop_type: Option<&str>, region: Option<&str>)
        -> Result<Vec<PriceRecord>>;
}

/// Select the most recent record for a crop from supplier-ordered rows.
fn most_recent_in(records: &[PriceRecord], crop_key: &str) -> Option<PriceRecord> {
    records
        .iter()
        .filter(|r| r.crop_type.to_lowercase() == crop_key)
        // max_by_key keeps the last maximal element; reduce keeps the first.
        .fold(None::<&PriceRecord>, |best, r| match best {
            Some(b) if b.date >= r.date => Some(b),
            _ => Some(r),
        })
        .cloned()
}

fn filter_records(
    records: Vec<PriceRecord>,
    crop_type: Option<&str>,
    region: Option<&str>,
) -> Vec<PriceRecord> {
    records
        .into_iter()
        .filter(|r| {
            crop_type.is_none_or(|c| r.crop_type.eq_ignore_ascii_case(c))
                && region.is_none_or(|g| r.region.eq_ignore_ascii_case(g))
        })
        .collect()
}

/// Price book backed by the refreshed JSON dataset on disk.
#[derive(Debug, Clone)]
pub struct JsonPriceBook {
    path: PathBuf,
}

impl JsonPriceBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PriceRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to read price dataset");
            Error::PriceData(format!("read {}: {e}", self.path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to parse price dataset");
            Error::PriceData(format!("parse {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl PriceLookupPort for JsonPriceBook {
    async fn most_recent(&self, crop_key: &str) -> Result<Option<PriceRecord>> {
        let records = self.load().await?;
        Ok(most_recent_in(&records, crop_key))
    }

    async fn query(
        &self,
        crop_type: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<PriceRecord>> {
        Ok(filter_records(self.load().await?, crop_type, region))
    }
}

/// Fixed in-memory price book, used in tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceBook {
    records: Vec<PriceRecord>,
}

impl StaticPriceBook {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl PriceLookupPort for StaticPriceBook {
    async fn most_recent(&self, crop_key: &str) -> Result<Option<PriceRecord>> {
        Ok(most_recent_in(&self.records, crop_key))
    }

    async fn query(
        &self,
        crop_type: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<PriceRecord>> {
        Ok(filter_records(self.records.clone(), crop_type, region))
    }
}
