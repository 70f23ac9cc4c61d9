//! Synthetic page source standing in for a remote query.

use std::time::Duration;

use async_trait::async_trait;
use gridstream_lib::error::FetchError;
use gridstream_lib::loader::PageFetcher;
use gridstream_lib::model::Record;
use log::debug;

const CITIES: [&str; 5] = ["Oslo", "Bergen", "Lisbon", "Porto", "Turku"];

/// Serves `total` generated accounts, one page at a time.
pub struct SyntheticBackend {
    total: usize,
    latency: Duration,
}

impl SyntheticBackend {
    pub fn new(total: usize, latency: Duration) -> Self {
        Self { total, latency }
    }

    fn account(id: usize) -> Record {
        let city = CITIES[id % CITIES.len()];
        Record::new()
            .set("id", id)
            .set("name", format!("Account {:04}", id))
            .set("score", ((id * 37) % 101) as i64)
            .set("owner", Record::new().set("city", city))
    }
}

#[async_trait]
impl PageFetcher<Record> for SyntheticBackend {
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<Record>, FetchError> {
        tokio::time::sleep(self.latency).await;
        let start = page.saturating_mul(page_size).min(self.total);
        let end = start.saturating_add(page_size).min(self.total);
        debug!("Backend serving rows {}..{}", start, end);
        Ok((start..end).map(Self::account).collect())
    }
}
