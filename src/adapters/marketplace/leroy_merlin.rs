use super::fields::FieldProfile;
use super::{batch_of, build_client, get_json, MarketplaceApi, MarketplaceKind};
use crate::config::toml_config::MarketplaceCredentials;
use crate::domain::model::DateRange;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

const PROFILE: FieldProfile = FieldProfile {
    order_id: &["order_id", "id"],
    date: &[
        "creation_date",
        "creationDate",
        "dateCreated",
        "date_created",
        "created_at",
        "order_date",
    ],
    status: &["order_status", "status"],
    sale: &["total_price", "total_amount"],
    taxes: &["tax_amount", "taxes"],
    commission: &["commissionAmount", "commission_amount", "commission"],
    shipping: &["shipping_amount", "shipping_price"],
    lines: &["items", "order_lines", "lines"],
    line_sku: &["sku", "product_sku", "ean"],
    line_name: &["product_name", "product_title", "name"],
    line_quantity: &["quantity", "qty"],
    line_sale: &["total_price", "price"],
    line_taxes: &["tax_amount"],
    line_commission: &["commission_amount", "commission"],
    line_shipping: &["shipping_amount"],
};

/// `GET {base}/v2/orders`, continued with `next_page_token`.
pub struct LeroyMerlinApi {
    orders_url: String,
    page_size: usize,
    max_pages: usize,
    client: Client,
}

impl LeroyMerlinApi {
    pub fn new(credentials: &MarketplaceCredentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Basic {}", credentials.api_key)).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "marketplaces.leroy_merlin.api_key".to_string(),
                value: "***".to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            orders_url: format!("{}/v2/orders", credentials.base_url.trim_end_matches('/')),
            page_size: credentials.page_size(),
            max_pages: credentials.max_pages(),
            client: build_client(credentials, headers)?,
        })
    }
}

#[async_trait]
impl MarketplaceApi for LeroyMerlinApi {
    fn name(&self) -> &str {
        MarketplaceKind::LeroyMerlin.display_name()
    }

    fn profile(&self) -> &FieldProfile {
        &PROFILE
    }

    async fn fetch_orders(&self, range: DateRange) -> Result<Vec<Value>> {
        let mut orders = Vec::new();
        let mut query = vec![
            ("from_date", range.start_timestamp()),
            ("to_date", range.end_timestamp()),
            ("limit", self.page_size.to_string()),
        ];

        for page in 0..self.max_pages {
            let payload = get_json(&self.client, &self.orders_url, &query).await?;

            let batch = batch_of(&payload, &["data"]);
            if batch.is_empty() {
                return Ok(orders);
            }
            orders.extend(batch);
            tracing::debug!("Leroy Merlin page {}: {} orders so far", page + 1, orders.len());

            let token = payload
                .get("next_page_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty());
            match token {
                Some(token) => {
                    query = vec![
                        ("page_token", token.to_string()),
                        ("limit", self.page_size.to_string()),
                    ]
                }
                None => return Ok(orders),
            }
        }

        tracing::warn!(
            "Leroy Merlin paging stopped after {} pages with {} orders",
            self.max_pages,
            orders.len()
        );
        Ok(orders)
    }
}
