//! Live-first retrieval with a cache fallback for rate limits
//!
//! Every gateway call is attempted live. Successes are written through to
//! the cache and tagged fresh. A rate-limited call falls back to the cached
//! value for the same key, tagged stale with its original storage time.
//! Any other failure propagates without looking at the cache.

use crate::aggregate::{ConsumptionAggregator, ConsumptionSummary, MonthKey};
use crate::cache::{Clock, KeyValueStore, SystemClock, TtlCache};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::gateway::{ConsumptionQuery, ContractDetail, ContractQuery, DataGateway};
use crate::logging::get_logger;
use crate::reading::Reading;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where a successful result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum Provenance {
    /// Answered by the provider just now
    Fresh,
    /// Served from cache because the provider was rate-limiting
    Stale {
        #[serde(rename = "storedAt")]
        stored_at: DateTime<Utc>,
    },
}

/// A value plus how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieved<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Retrieved<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Fresh,
        }
    }

    pub fn stale(value: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            value,
            provenance: Provenance::Stale { stored_at },
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.provenance, Provenance::Stale { .. })
    }

    /// Disclosure line for stale data, `None` when fresh
    pub fn notice(&self) -> Option<String> {
        match self.provenance {
            Provenance::Fresh => None,
            Provenance::Stale { stored_at } => Some(format!(
                "Showing saved data from {} because the provider's daily request limit was reached",
                stored_at.format("%Y-%m-%d %H:%M UTC")
            )),
        }
    }

    /// Transform the value, keeping provenance
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Retrieved<U> {
        Retrieved {
            value: f(self.value),
            provenance: self.provenance,
        }
    }
}

/// Orchestrates gateway calls and the response cache
pub struct RetrievalCoordinator<S: KeyValueStore, C: Clock = SystemClock> {
    gateway: Box<dyn DataGateway>,
    cache: TtlCache<S, C>,
    aggregator: ConsumptionAggregator,
    consumption_ttl_hours: u32,
    contract_ttl_hours: u32,
    logger: crate::logging::StructuredLogger,
}

impl<S: KeyValueStore, C: Clock> RetrievalCoordinator<S, C> {
    pub fn new(gateway: Box<dyn DataGateway>, cache: TtlCache<S, C>, cfg: &CacheConfig) -> Self {
        Self {
            gateway,
            cache,
            aggregator: ConsumptionAggregator::new(),
            consumption_ttl_hours: cfg.consumption_ttl_hours,
            contract_ttl_hours: cfg.contract_ttl_hours,
            logger: get_logger("coordinator"),
        }
    }

    pub fn cache(&self) -> &TtlCache<S, C> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TtlCache<S, C> {
        &mut self.cache
    }

    /// Contract details for one supply point
    pub async fn fetch_contract(
        &mut self,
        token: &str,
        query: &ContractQuery,
    ) -> Result<Retrieved<ContractDetail>> {
        let outcome = self.gateway.contract_detail(token, query).await;
        self.settle(&query.cache_key(), self.contract_ttl_hours, outcome)
    }

    /// Raw consumption series for one supply point and month range
    pub async fn fetch_consumption(
        &mut self,
        token: &str,
        query: &ConsumptionQuery,
    ) -> Result<Retrieved<Vec<Reading>>> {
        let outcome = self.gateway.consumption(token, query).await;
        self.settle(&query.cache_key(), self.consumption_ttl_hours, outcome)
    }

    /// Fetch consumption and aggregate it, with the current month taken in `tz`
    pub async fn monthly_summary(
        &mut self,
        token: &str,
        query: &ConsumptionQuery,
        tz: Tz,
    ) -> Result<Retrieved<ConsumptionSummary>> {
        self.monthly_summary_at(token, query, MonthKey::current_in(tz))
            .await
    }

    /// Like [`Self::monthly_summary`] with an explicit current month
    pub async fn monthly_summary_at(
        &mut self,
        token: &str,
        query: &ConsumptionQuery,
        current: MonthKey,
    ) -> Result<Retrieved<ConsumptionSummary>> {
        let readings = self.fetch_consumption(token, query).await?;
        let aggregator = &self.aggregator;
        Ok(readings.map(|r| aggregator.summarize(r, current)))
    }

    fn settle<T>(&mut self, key: &str, ttl_hours: u32, outcome: Result<T>) -> Result<Retrieved<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let err = match outcome {
            Ok(value) => {
                // Write-through; a dropped write is logged by the cache
                self.cache.set(key, &value, ttl_hours);
                return Ok(Retrieved::fresh(value));
            }
            Err(err) => err,
        };

        if !err.is_rate_limited() {
            self.logger.debug(&format!("{} failed without fallback: {}", key, err));
            return Err(err);
        }

        match self.cache.get_entry::<T>(key) {
            Some(entry) => {
                self.logger.warn(&format!(
                    "Rate limited; serving {} cached at {}",
                    key,
                    entry.stored_at.to_rfc3339()
                ));
                Ok(Retrieved::stale(entry.value, entry.stored_at))
            }
            None => {
                self.logger
                    .warn(&format!("Rate limited and nothing cached for {}", key));
                Err(err)
            }
        }
    }
}
