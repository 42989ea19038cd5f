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
    date: &["creation_date", "creationDate", "dateCreated", "date_created"],
    status: &["order_state", "order_status", "status"],
    sale: &["total_price", "totalPrice", "price"],
    taxes: &["tax_amount", "taxAmount", "taxes"],
    commission: &["total_commission", "commissionAmount", "commission_amount", "commission"],
    shipping: &["shipping_price", "shippingPrice", "shipping_amount", "shippingAmount"],
    lines: &["order_lines", "items"],
    line_sku: &["offer_sku", "product_sku", "sku"],
    line_name: &["product_title", "product_name"],
    line_quantity: &["quantity", "qty"],
    line_sale: &["total_price", "price"],
    line_taxes: &["taxes", "tax_amount"],
    line_commission: &["total_commission", "commission_fee", "commission"],
    line_shipping: &["shipping_price", "shipping_amount"],
};

/// Mirakl-style API: `offset`/`max` paging, `total_count` in each page.
pub struct WortenApi {
    base_url: String,
    shop_id: String,
    page_size: usize,
    max_pages: usize,
    client: Client,
}

impl WortenApi {
    pub fn new(credentials: &MarketplaceCredentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&credentials.api_key).map_err(|e| EtlError::InvalidConfigValueError {
                field: "marketplaces.worten.api_key".to_string(),
                value: "***".to_string(),
                reason: e.to_string(),
            })?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: credentials.base_url.clone(),
            shop_id: credentials.shop_id.clone(),
            page_size: credentials.page_size(),
            max_pages: credentials.max_pages(),
            client: build_client(credentials, headers)?,
        })
    }
}

#[async_trait]
impl MarketplaceApi for WortenApi {
    fn name(&self) -> &str {
        MarketplaceKind::Worten.display_name()
    }

    fn profile(&self) -> &FieldProfile {
        &PROFILE
    }

    async fn fetch_orders(&self, range: DateRange) -> Result<Vec<Value>> {
        let mut orders = Vec::new();
        let mut offset = 0usize;

        for page in 0..self.max_pages {
            let query = [
                ("shop_id", self.shop_id.clone()),
                ("start_date", range.start_timestamp()),
                ("end_date", range.end_timestamp()),
                ("offset", offset.to_string()),
                ("max", self.page_size.to_string()),
            ];
            let payload = get_json(&self.client, &self.base_url, &query).await?;

            let batch = batch_of(&payload, &["orders", "data"]);
            if batch.is_empty() {
                break;
            }
            let total = payload
                .get("total_count")
                .and_then(Value::as_u64)
                .map(|t| t as usize)
                .unwrap_or(batch.len());

            offset += batch.len();
            orders.extend(batch);
            tracing::debug!("Worten page {}: {}/{} orders", page + 1, offset, total);

            if offset >= total {
                return Ok(orders);
            }
        }

        if !orders.is_empty() {
            tracing::warn!(
                "Worten paging stopped after {} pages with {} orders",
                self.max_pages,
                orders.len()
            );
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    fn credentials(base_url: String) -> MarketplaceCredentials {
        MarketplaceCredentials {
            base_url,
            shop_id: "13810".to_string(),
            api_key: "worten-key".to_string(),
            page_size: Some(2),
            timeout_seconds: Some(5),
            max_pages: None,
        }
    }

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn order(id: &str) -> Value {
        json!({
            "order_id": id,
            "creation_date": "2024-05-03T10:00:00Z",
            "order_state": "SHIPPED",
            "total_price": 10.0,
            "order_lines": [{"offer_sku": format!("SKU-{}", id), "quantity": 1}]
        })
    }

    #[tokio::test]
    async fn test_fetch_orders_follows_offset() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/orders")
                    .header("Authorization", "worten-key")
                    .query_param("shop_id", "13810")
                    .query_param("start_date", "2024-05-01T00:00:00Z")
                    .query_param("end_date", "2024-05-31T23:59:59Z")
                    .query_param("offset", "0")
                    .query_param("max", "2");
                then.status(200)
                    .json_body(json!({"orders": [order("1"), order("2")], "total_count": 3}));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders").query_param("offset", "2");
                then.status(200)
                    .json_body(json!({"orders": [order("3")], "total_count": 3}));
            })
            .await;

        let api = WortenApi::new(&credentials(server.url("/api/orders"))).unwrap();
        let orders = api
            .fetch_orders(DateRange::new(may(1), may(31)))
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(orders.len(), 3);
    }

    #[tokio::test]
    async fn test_get_orders_normalizes_data_key() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders");
                then.status(200).json_body(json!({"data": [order("9")]}));
            })
            .await;

        let api = WortenApi::new(&credentials(server.url("/api/orders"))).unwrap();
        let lines = api.get_orders(DateRange::single(may(3))).await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].order_id, "9");
        assert_eq!(lines[0].sku, "SKU-9");
        assert_eq!(lines[0].order_date, may(3));
        assert_eq!(lines[0].sale_price, 10.0);
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders");
                then.status(200).json_body(json!({"orders": [], "total_count": 0}));
            })
            .await;

        let api = WortenApi::new(&credentials(server.url("/api/orders"))).unwrap();
        let orders = api.fetch_orders(DateRange::single(may(1))).await.unwrap();
        assert!(orders.is_empty());
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders");
                then.status(401).body("unauthorized");
            })
            .await;

        let api = WortenApi::new(&credentials(server.url("/api/orders"))).unwrap();
        let result = api.fetch_orders(DateRange::single(may(1))).await;
        assert!(matches!(
            result,
            Err(EtlError::HttpStatusError { status: 401, .. })
        ));
    }
}
