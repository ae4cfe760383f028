use super::DataGateway;
use super::types::{ConsumptionQuery, ContractDetail, ContractQuery};
use crate::config::ApiConfig;
use crate::error::{FailureKind, Result, TarifaError};
use crate::logging::get_logger;
use crate::reading::{Reading, decode_readings};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

/// Map a non-success status to a failure kind
pub fn classify_status(status: StatusCode) -> FailureKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FailureKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Unauthorized,
        _ => FailureKind::Other,
    }
}

/// Datadis private API client
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    logger: crate::logging::StructuredLogger,
}

impl HttpGateway {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            logger: get_logger("gateway"),
        })
    }

    async fn get_json(&self, token: &str, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(token.trim())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("tarifa/", env!("APP_VERSION")))
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let kind = classify_status(status);
            self.logger
                .warn(&format!("{} answered {} ({})", endpoint, status, kind.as_str()));
            return Err(TarifaError::upstream(
                kind,
                format!("{} returned HTTP {}", endpoint, status.as_u16()),
            ));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| TarifaError::api(format!("{} returned malformed JSON: {}", endpoint, e)))
    }
}

#[async_trait::async_trait]
impl DataGateway for HttpGateway {
    async fn consumption(&self, token: &str, query: &ConsumptionQuery) -> Result<Vec<Reading>> {
        let params = [
            ("cups", query.cups.clone()),
            ("distributorCode", query.distributor_code.clone()),
            ("startDate", query.start.to_string()),
            ("endDate", query.end.to_string()),
            ("measurementType", query.measurement_type.to_string()),
            ("pointType", query.point_type.to_string()),
        ];
        let body = self.get_json(token, "get-consumption-data", &params).await?;
        let readings = decode_readings(&body);
        self.logger.debug(&format!(
            "Fetched {} readings for {} {}..{}",
            readings.len(),
            query.cups,
            query.start,
            query.end
        ));
        Ok(readings)
    }

    async fn contract_detail(&self, token: &str, query: &ContractQuery) -> Result<ContractDetail> {
        let params = [
            ("cups", query.cups.clone()),
            ("distributorCode", query.distributor_code.clone()),
        ];
        let body = self.get_json(token, "get-contract-detail", &params).await?;
        ContractDetail::from_provider(&body)
            .ok_or_else(|| TarifaError::api("get-contract-detail returned no contract"))
    }
}
