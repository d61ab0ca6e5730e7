//! REST implementation of the brokerage gateway.
//!
//! Talks to the brokerage open API over HTTPS with bearer auth. Wire
//! shapes follow the brokerage convention of camelCase fields with
//! numeric values as strings.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sentinel_core::{Amount, BoxFuture, OrderSide, Price};

use crate::error::{BrokerError, BrokerResult};
use crate::gateway::{
    AccountBalance, BrokerageGateway, Holding, OrderReceipt, OrderRequest, OrderStatus, OrderType,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Balance inquiry response.
#[derive(Debug, Deserialize)]
struct RawBalanceResponse {
    /// Cash available for orders, as a decimal string.
    #[serde(rename = "availableAmount")]
    available_amount: String,
    /// Evaluation value of held positions, as a decimal string.
    #[serde(rename = "totalEvaluation")]
    total_evaluation: String,
}

/// One holdings row.
#[derive(Debug, Deserialize)]
struct RawHoldingEntry {
    symbol: String,
    quantity: u32,
}

/// Holdings inquiry response.
#[derive(Debug, Deserialize)]
struct RawHoldingsResponse {
    #[serde(default)]
    holdings: Vec<RawHoldingEntry>,
}

/// Order placement request body.
#[derive(Debug, Serialize)]
struct RawOrderRequest {
    symbol: String,
    side: String,
    quantity: u32,
    /// Decimal string; "0" for market orders.
    price: String,
    #[serde(rename = "orderType")]
    order_type: String,
}

/// Order placement response.
#[derive(Debug, Deserialize)]
struct RawOrderResponse {
    /// "submitted" or "failed".
    status: String,
    #[serde(rename = "orderNo", default)]
    order_no: Option<String>,
    #[serde(default)]
    message: String,
}

/// REST gateway to the brokerage open API.
pub struct RestGateway {
    client: Client,
    base_url: String,
    access_token: String,
}

impl RestGateway {
    /// Create a gateway against `base_url` with a bearer token.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> BrokerResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BrokerError::HttpClient(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> BrokerResult<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "brokerage GET");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| BrokerError::HttpClient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Api {
                code: status.as_str().to_string(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BrokerError::Decode(format!("failed to parse response: {e}")))
    }

    fn parse_amount(value: &str, field: &str) -> BrokerResult<Amount> {
        value
            .parse()
            .map_err(|e| BrokerError::Decode(format!("bad {field} '{value}': {e}")))
    }
}

impl BrokerageGateway for RestGateway {
    fn fetch_balance(&self) -> BoxFuture<'_, BrokerResult<AccountBalance>> {
        Box::pin(async move {
            let raw: RawBalanceResponse = self.get_json("/api/v1/account/balance").await?;

            Ok(AccountBalance {
                available_amount: Self::parse_amount(&raw.available_amount, "availableAmount")?,
                total_evaluation: Self::parse_amount(&raw.total_evaluation, "totalEvaluation")?,
            })
        })
    }

    fn fetch_holdings(&self) -> BoxFuture<'_, BrokerResult<Vec<Holding>>> {
        Box::pin(async move {
            let raw: RawHoldingsResponse = self.get_json("/api/v1/account/holdings").await?;

            Ok(raw
                .holdings
                .into_iter()
                .map(|h| Holding {
                    symbol: h.symbol,
                    quantity: h.quantity,
                })
                .collect())
        })
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, BrokerResult<OrderReceipt>> {
        Box::pin(async move {
            let url = format!("{}/api/v1/orders", self.base_url);
            info!(
                symbol = %request.symbol,
                side = %request.side,
                quantity = request.quantity,
                "placing order"
            );

            let body = RawOrderRequest {
                symbol: request.symbol.clone(),
                side: match request.side {
                    OrderSide::Buy => "buy".to_string(),
                    OrderSide::Sell => "sell".to_string(),
                },
                quantity: request.quantity,
                price: match request.order_type {
                    OrderType::Market => "0".to_string(),
                    OrderType::Limit => request
                        .price
                        .round_to_tick(Price::new(Decimal::ONE))
                        .to_string(),
                },
                order_type: match request.order_type {
                    OrderType::Market => "market".to_string(),
                    OrderType::Limit => "limit".to_string(),
                },
            };

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .map_err(|e| BrokerError::HttpClient(format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(BrokerError::Api {
                    code: status.as_str().to_string(),
                    message: text,
                });
            }

            let raw: RawOrderResponse = response
                .json()
                .await
                .map_err(|e| BrokerError::Decode(format!("failed to parse order response: {e}")))?;

            let receipt_status = match raw.status.as_str() {
                "submitted" => OrderStatus::Submitted,
                "failed" => OrderStatus::Failed,
                other => {
                    // Unknown states fail closed: treat as not submitted.
                    warn!(status = other, "unknown order status from brokerage");
                    OrderStatus::Failed
                }
            };

            Ok(OrderReceipt {
                status: receipt_status,
                order_no: raw.order_no,
                message: raw.message,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = RestGateway::new("https://api.example.test/", "token").unwrap();
        assert_eq!(gateway.base_url, "https://api.example.test");
    }

    #[test]
    fn test_amount_parsing() {
        let amount = RestGateway::parse_amount("2000000.50", "availableAmount").unwrap();
        assert_eq!(amount.to_string(), "2000000.50");

        assert!(RestGateway::parse_amount("not-a-number", "availableAmount").is_err());
    }
}
