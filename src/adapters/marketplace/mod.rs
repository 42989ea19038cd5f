//! Partner marketplace REST clients.

pub mod fields;
pub mod leroy_merlin;
pub mod worten;

use crate::config::toml_config::{MarketplaceCredentials, MarketplacesConfig};
use crate::domain::model::{DateRange, OrderLine};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use fields::{FieldProfile, Normalized};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

pub use leroy_merlin::LeroyMerlinApi;
pub use worten::WortenApi;

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Name stored in the `marketplace` column.
    fn name(&self) -> &str;

    fn profile(&self) -> &FieldProfile;

    /// Raw order payloads for every page in the range.
    async fn fetch_orders(&self, range: DateRange) -> Result<Vec<Value>>;

    fn normalize(&self, orders: &[Value]) -> Normalized {
        fields::normalize_orders(self.profile(), orders)
    }

    async fn get_orders(&self, range: DateRange) -> Result<Vec<OrderLine>> {
        let orders = self.fetch_orders(range).await?;
        Ok(self.normalize(&orders).lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketplaceKind {
    Worten,
    LeroyMerlin,
}

impl MarketplaceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            MarketplaceKind::Worten => "Worten",
            MarketplaceKind::LeroyMerlin => "Leroy Merlin",
        }
    }

    fn config_key(&self) -> &'static str {
        match self {
            MarketplaceKind::Worten => "marketplaces.worten",
            MarketplaceKind::LeroyMerlin => "marketplaces.leroy_merlin",
        }
    }

    fn credentials<'a>(&self, config: &'a MarketplacesConfig) -> Option<&'a MarketplaceCredentials> {
        match self {
            MarketplaceKind::Worten => config.worten.as_ref(),
            MarketplaceKind::LeroyMerlin => config.leroy_merlin.as_ref(),
        }
    }
}

impl FromStr for MarketplaceKind {
    type Err = EtlError;

    /// Case, spaces, underscores and dashes are ignored: "leroy_merlin" works.
    fn from_str(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "worten" => Ok(MarketplaceKind::Worten),
            "leroymerlin" => Ok(MarketplaceKind::LeroyMerlin),
            _ => Err(EtlError::UnknownMarketplace(name.to_string())),
        }
    }
}

/// Builds the client for a marketplace from its configured credentials.
pub fn get_api(name: &str, config: &MarketplacesConfig) -> Result<Box<dyn MarketplaceApi>> {
    let kind: MarketplaceKind = name.parse()?;
    let credentials = kind
        .credentials(config)
        .ok_or_else(|| EtlError::MissingConfigError {
            field: kind.config_key().to_string(),
        })?;

    Ok(match kind {
        MarketplaceKind::Worten => Box::new(WortenApi::new(credentials)?),
        MarketplaceKind::LeroyMerlin => Box::new(LeroyMerlinApi::new(credentials)?),
    })
}

pub(crate) fn build_client(credentials: &MarketplaceCredentials, headers: HeaderMap) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(credentials.timeout_seconds()))
        .default_headers(headers)
        .build()?)
}

pub(crate) async fn get_json(client: &Client, url: &str, query: &[(&str, String)]) -> Result<Value> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(EtlError::HttpStatusError {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.json().await?)
}

/// First non-empty array among `keys`.
pub(crate) fn batch_of(payload: &Value, keys: &[&str]) -> Vec<Value> {
    keys.iter()
        .filter_map(|k| payload.get(*k).and_then(Value::as_array))
        .find(|a| !a.is_empty())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Worten".parse::<MarketplaceKind>().unwrap(), MarketplaceKind::Worten);
        assert_eq!("leroy_merlin".parse::<MarketplaceKind>().unwrap(), MarketplaceKind::LeroyMerlin);
        assert_eq!("Leroy Merlin".parse::<MarketplaceKind>().unwrap(), MarketplaceKind::LeroyMerlin);
        assert!(matches!(
            "amazon".parse::<MarketplaceKind>(),
            Err(EtlError::UnknownMarketplace(name)) if name == "amazon"
        ));
    }

    #[test]
    fn test_get_api_requires_credentials() {
        let config = AppConfig::from_toml_str(
            r#"
[marketplaces.worten]
base_url = "https://marketplace.worten.pt/api/orders"
shop_id = "1"
api_key = "k"
"#,
        )
        .unwrap();

        let api = get_api("WORTEN", &config.marketplaces).unwrap();
        assert_eq!(api.name(), "Worten");

        assert!(matches!(
            get_api("leroy merlin", &config.marketplaces),
            Err(EtlError::MissingConfigError { field }) if field == "marketplaces.leroy_merlin"
        ));
        assert!(matches!(
            get_api("ebay", &config.marketplaces),
            Err(EtlError::UnknownMarketplace(_))
        ));
    }

    #[test]
    fn test_batch_of_prefers_first_non_empty() {
        let payload = serde_json::json!({"orders": [], "data": [{"id": 1}]});
        assert_eq!(batch_of(&payload, &["orders", "data"]).len(), 1);
        assert!(batch_of(&payload, &["missing"]).is_empty());
    }
}
