use serde::{Deserialize, Serialize};

/// Registration status as shown on a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrademarkStatus {
    Live,
    Dead,
    #[default]
    Unknown,
}

impl From<String> for TrademarkStatus {
    fn from(value: String) -> Self {
        match value.trim().to_uppercase().as_str() {
            "LIVE" => TrademarkStatus::Live,
            "DEAD" => TrademarkStatus::Dead,
            _ => TrademarkStatus::Unknown,
        }
    }
}

impl From<TrademarkStatus> for String {
    fn from(value: TrademarkStatus) -> Self {
        match value {
            TrademarkStatus::Live => "LIVE".to_string(),
            TrademarkStatus::Dead => "DEAD".to_string(),
            TrademarkStatus::Unknown => "".to_string(),
        }
    }
}

/// One trademark filing scraped from a detail page.
///
/// `detail_url` is the identity of the record. A record with `error` set
/// stands in for a filing whose page could not be fetched; its other
/// fields are empty and it never feeds the risk score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailRecord {
    pub application_number: String,
    pub word_mark: String,
    pub owner_name: String,
    pub owner_address: String,
    pub owner: String,
    pub filing_date: String,
    pub status: TrademarkStatus,
    pub status_description: String,
    pub classes: Vec<String>,
    pub detail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetailRecord {
    pub fn failed(detail_url: &str, error: String) -> Self {
        DetailRecord {
            detail_url: detail_url.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_detail_url(mut self, detail_url: &str) -> Self {
        self.detail_url = detail_url.to_string();
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_live(&self) -> bool {
        !self.is_error() && self.status == TrademarkStatus::Live
    }
}

pub fn compose_owner(owner_name: &str, owner_address: &str) -> String {
    match owner_address.is_empty() {
        true => owner_name.to_string(),
        false => format!("{}, {}", owner_name, owner_address),
    }
}
