//! In-process stand-in for the provider
//!
//! Routes are described by an explicit [`FixtureConfig`] owned by the
//! gateway instance. Clones share configuration and call counters, so a
//! test can keep a handle, rewire a route between calls and inspect traffic.

use super::DataGateway;
use super::types::{ConsumptionQuery, ContractDetail, ContractQuery};
use crate::error::{FailureKind, Result, TarifaError};
use crate::reading::Reading;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Canned behaviour for one route
#[derive(Debug, Clone)]
pub enum FixtureRoute<T> {
    Respond(T),
    Fail(FailureKind),
}

impl<T> Default for FixtureRoute<T> {
    fn default() -> Self {
        FixtureRoute::Fail(FailureKind::Other)
    }
}

impl<T: Clone> FixtureRoute<T> {
    fn resolve(&self, route: &str) -> Result<T> {
        match self {
            FixtureRoute::Respond(value) => Ok(value.clone()),
            FixtureRoute::Fail(kind) => Err(TarifaError::upstream(
                *kind,
                format!("fixture {} answered {}", route, kind.as_str()),
            )),
        }
    }
}

/// Route table for the fixture gateway
#[derive(Debug, Clone, Default)]
pub struct FixtureConfig {
    pub consumption: FixtureRoute<Vec<Reading>>,
    pub contract: FixtureRoute<ContractDetail>,
    /// Token the gateway accepts; `None` accepts any
    pub expected_token: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    consumption: AtomicUsize,
    contract: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureGateway {
    config: Arc<Mutex<FixtureConfig>>,
    counters: Arc<Counters>,
}

impl FixtureGateway {
    pub fn new(config: FixtureConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn set_consumption(&self, route: FixtureRoute<Vec<Reading>>) {
        self.lock().consumption = route;
    }

    pub fn set_contract(&self, route: FixtureRoute<ContractDetail>) {
        self.lock().contract = route;
    }

    pub fn consumption_calls(&self) -> usize {
        self.counters.consumption.load(Ordering::SeqCst)
    }

    pub fn contract_calls(&self) -> usize {
        self.counters.contract.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixtureConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_token(&self, token: &str) -> Result<()> {
        match &self.lock().expected_token {
            Some(expected) if expected != token => {
                Err(TarifaError::unauthorized("fixture rejected token"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DataGateway for FixtureGateway {
    async fn consumption(&self, token: &str, _query: &ConsumptionQuery) -> Result<Vec<Reading>> {
        self.counters.consumption.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        self.lock().consumption.resolve("get-consumption-data")
    }

    async fn contract_detail(&self, token: &str, _query: &ContractQuery) -> Result<ContractDetail> {
        self.counters.contract.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        self.lock().contract.resolve("get-contract-detail")
    }
}
