//! HTTP client for the order backend

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    ApiError, DeliveryUpdateResponse, ListQuery, OrderApi, OrderPage, RejectionResponse,
    StatusUpdateResponse,
};
use crate::config::ApiConfig;
use crate::domain::order::{
    BulkInvoiceResponse, DeliveryUpdateRequest, InvoiceResponse, OrderId, RejectionRequest,
    StatusUpdateRequest,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkInvoiceRequest<'a> {
    order_ids: &'a [OrderId],
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-over-HTTP implementation of [`OrderApi`]
pub struct HttpOrderApi {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpOrderApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode a successful JSON body
    async fn execute<T: DeserializeOwned>(
        &self,
        order_id: Option<&OrderId>,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(body);

        tracing::warn!(
            status = status.as_u16(),
            order_id = ?order_id.map(OrderId::as_str),
            message = %message,
            "Order backend returned an error"
        );

        Err(match (status, order_id) {
            (StatusCode::NOT_FOUND, Some(id)) => ApiError::NotFound(id.clone()),
            (StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, _) => {
                ApiError::Rejected(message)
            }
            (status, _) => ApiError::Server { status: status.as_u16(), message },
        })
    }
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(error.to_string())
    }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse, ApiError> {
        let url = self.url(&format!("/orders/{}/status", order_id));
        self.execute(Some(order_id), self.client.patch(url).json(request)).await
    }

    async fn reject(
        &self,
        order_id: &OrderId,
        request: &RejectionRequest,
    ) -> Result<RejectionResponse, ApiError> {
        let url = self.url(&format!("/orders/{}/reject", order_id));
        self.execute(Some(order_id), self.client.post(url).json(request)).await
    }

    async fn send_invoice(&self, order_id: &OrderId) -> Result<InvoiceResponse, ApiError> {
        let url = self.url(&format!("/orders/{}/invoice", order_id));
        self.execute(Some(order_id), self.client.post(url)).await
    }

    async fn send_invoices_bulk(&self, order_ids: &[OrderId]) -> Result<BulkInvoiceResponse, ApiError> {
        let url = self.url("/orders/invoices/bulk");
        let body = BulkInvoiceRequest { order_ids };
        self.execute(None, self.client.post(url).json(&body)).await
    }

    async fn update_delivery(
        &self,
        order_id: &OrderId,
        request: &DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResponse, ApiError> {
        let url = self.url(&format!("/orders/{}/delivery", order_id));
        self.execute(Some(order_id), self.client.patch(url).json(request)).await
    }

    async fn list_orders(&self, query: &ListQuery) -> Result<OrderPage, ApiError> {
        let url = self.url("/orders");
        self.execute(None, self.client.get(url).query(query)).await
    }
}
