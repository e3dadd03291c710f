//! Remote filter validation against a GraphQL API.
//!
//! The filter is sent as the `filter` variable of a minimal list query for the
//! export type. The API resolving it without errors is taken as acceptance.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, warn};

use reportflow_reports::ExportObjectType;

use super::{RemoteFilterValidator, TransportError};

const PRODUCTS_QUERY: &str = r#"
query ValidateProductsFilter($filter: ProductFilterInput) {
    products(first: 1, filter: $filter) {
        totalCount
    }
}
"#;

const ORDERS_QUERY: &str = r#"
query ValidateOrdersFilter($filter: OrderFilterInput) {
    orders(first: 1, filter: $filter) {
        totalCount
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// `reqwest`-based remote validator.
#[derive(Debug, Clone)]
pub struct GraphqlFilterValidator {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl GraphqlFilterValidator {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    fn query_for(export_type: ExportObjectType) -> &'static str {
        match export_type {
            ExportObjectType::Products => PRODUCTS_QUERY,
            ExportObjectType::Orders => ORDERS_QUERY,
        }
    }
}

#[async_trait]
impl RemoteFilterValidator for GraphqlFilterValidator {
    async fn validate(
        &self,
        export_type: ExportObjectType,
        filter: &JsonValue,
    ) -> Result<(), TransportError> {
        let body = json!({
            "query": Self::query_for(export_type),
            "variables": { "filter": filter },
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "remote filter validation returned an error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !payload.errors.is_empty() {
            let message = payload
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            debug!(export_type = %export_type, error = %message, "remote validator rejected filter");
            return Err(TransportError::Query(message));
        }

        Ok(())
    }
}
