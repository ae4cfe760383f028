//! Interface to the upstream meter-data provider
//!
//! The gateway performs one retry-free request per call and reports
//! failures already classified as rate-limited, unauthorized, network or
//! other. Authentication happens elsewhere; the token is passed in.

pub mod fixture;
#[cfg(feature = "http")]
pub mod http;
pub mod types;

pub use fixture::{FixtureConfig, FixtureGateway, FixtureRoute};
#[cfg(feature = "http")]
pub use http::HttpGateway;
pub use types::{AddressInfo, ConsumptionQuery, ContractDetail, ContractPower, ContractQuery};

use crate::error::Result;
use crate::reading::Reading;

/// Upstream provider of readings and contract details
#[async_trait::async_trait]
pub trait DataGateway: Send + Sync {
    async fn consumption(&self, token: &str, query: &ConsumptionQuery) -> Result<Vec<Reading>>;

    async fn contract_detail(&self, token: &str, query: &ContractQuery) -> Result<ContractDetail>;
}
