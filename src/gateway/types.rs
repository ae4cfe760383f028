use crate::aggregate::MonthKey;
use crate::reading::coerce_number;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a consumption series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionQuery {
    pub cups: String,
    pub distributor_code: String,
    pub start: MonthKey,
    pub end: MonthKey,
    pub measurement_type: u8,
    pub point_type: u8,
}

impl ConsumptionQuery {
    /// Twelve months ending at `end`, inclusive
    pub fn last_year(cups: &str, distributor_code: &str, end: MonthKey) -> Self {
        Self {
            cups: cups.to_string(),
            distributor_code: distributor_code.to_string(),
            start: end.add_months(-11),
            end,
            measurement_type: 0,
            point_type: 5,
        }
    }

    pub fn cache_key(&self) -> String {
        format!(
            "consumption_data_{}_{}_{}_{}_{}",
            self.cups, self.start, self.end, self.measurement_type, self.point_type
        )
    }
}

/// Identity of a supply contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQuery {
    pub cups: String,
    pub distributor_code: String,
}

impl ContractQuery {
    pub fn new(cups: &str, distributor_code: &str) -> Self {
        Self {
            cups: cups.to_string(),
            distributor_code: distributor_code.to_string(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("contract_detail_{}_{}", self.cups, self.distributor_code)
    }
}

/// Contracted power for the peak and off-peak periods, in kW
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractPower {
    pub p1: f64,
    pub p2: f64,
}

/// Where the supply point is and who distributes to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInfo {
    pub address: String,
    pub postal_code: String,
    pub municipality: String,
    pub province: String,
    pub distributor: String,
}

/// Contract details for one supply point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetail {
    pub cups: String,
    #[serde(flatten)]
    pub power: ContractPower,
    #[serde(default)]
    pub address_info: AddressInfo,
}

impl ContractDetail {
    /// Read the provider's contract payload: either one contract object or
    /// an array whose first element is used. `contractedPowerkW` holds the
    /// per-period powers in order.
    pub fn from_provider(payload: &Value) -> Option<Self> {
        let contract = match payload {
            Value::Array(items) => items.first()?,
            Value::Object(_) => payload,
            _ => return None,
        };
        let text = |field: &str| {
            contract
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let powers: Vec<f64> = contract
            .get("contractedPowerkW")
            .and_then(Value::as_array)
            .map(|a| a.iter().map(coerce_number).collect())
            .unwrap_or_default();

        Some(Self {
            cups: text("cups"),
            power: ContractPower {
                p1: powers.first().copied().unwrap_or(0.0),
                p2: powers.get(1).copied().unwrap_or(0.0),
            },
            address_info: AddressInfo {
                address: text("address"),
                postal_code: text("postalCode"),
                municipality: text("municipality"),
                province: text("province"),
                distributor: text("distributor"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_keys() {
        let end = MonthKey::new(2024, 5).unwrap();
        let q = ConsumptionQuery::last_year("ES001", "2", end);
        assert_eq!(q.cache_key(), "consumption_data_ES001_2023/06_2024/05_0_5");
        assert_eq!(
            ContractQuery::new("ES001", "2").cache_key(),
            "contract_detail_ES001_2"
        );
    }

    #[test]
    fn test_contract_from_provider_array() {
        let detail = ContractDetail::from_provider(&json!([{
            "cups": "ES001",
            "distributor": "I-DE",
            "address": "CALLE MAYOR 1",
            "postalCode": "28001",
            "province": "MADRID",
            "municipality": "MADRID",
            "contractedPowerkW": [4.6, "3,45"]
        }]))
        .unwrap();
        assert_eq!(detail.cups, "ES001");
        assert_eq!(detail.power.p1, 4.6);
        assert_eq!(detail.power.p2, 3.45);
        assert_eq!(detail.address_info.postal_code, "28001");
        assert!(ContractDetail::from_provider(&json!([])).is_none());
    }

    #[test]
    fn test_contract_detail_serializes_flat_power() {
        let detail = ContractDetail {
            cups: "ES001".into(),
            power: ContractPower { p1: 4.6, p2: 4.6 },
            address_info: AddressInfo::default(),
        };
        let v = serde_json::to_value(&detail).unwrap();
        assert_eq!(v["p1"], 4.6);
        assert_eq!(v["addressInfo"]["province"], "");
    }
}
