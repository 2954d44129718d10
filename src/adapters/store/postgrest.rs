//! PostgREST Row Store - Implementation of RowStore against a
//! Supabase-style REST endpoint.
//!
//! Filters become `column=eq.value` query parameters and ordering
//! becomes `order=column.asc|desc`, the PostgREST conventions. Inserts
//! ask for the created row back with `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::time::Duration;

use crate::ports::{Direction, Filter, Order, RowStore, StoreError};

/// Configuration for the PostgREST row store.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Base URL of the store (e.g. https://xyz.supabase.co).
    pub base_url: String,
    /// Service role key, sent as both `apikey` and bearer token.
    service_key: Secret<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl PostgrestConfig {
    /// Creates a new configuration.
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: Secret::new(service_key.into()),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the service key (for making requests).
    fn service_key(&self) -> &str {
        self.service_key.expose_secret()
    }
}

/// PostgREST implementation of RowStore.
pub struct PostgrestStore {
    config: PostgrestConfig,
    client: Client,
}

impl PostgrestStore {
    /// Creates a new store client with the given configuration.
    pub fn new(config: PostgrestConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the REST URL for a table.
    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table
        )
    }

    /// Starts a request with auth headers and filter query parameters.
    fn request(&self, method: Method, table: &str, filter: &Filter) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", self.config.service_key())
            .bearer_auth(self.config.service_key())
            .query(&filter_query_pairs(filter, None))
    }

    /// Sends a request, mapping transport failures.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::transport("request timed out")
            } else {
                StoreError::transport(e.to_string())
            }
        })
    }

    /// Maps a non-success response status to a StoreError.
    async fn handle_response_status(
        &self,
        table: &str,
        response: Response,
    ) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_ACCEPTABLE | StatusCode::NOT_FOUND => StoreError::not_found(table),
            StatusCode::CONFLICT => StoreError::conflict(table, body),
            _ => StoreError::Query {
                status: status.as_u16(),
                message: body,
            },
        })
    }

    /// Parses a response body as JSON.
    async fn parse_json(&self, response: Response) -> Result<Value, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))
    }
}

#[async_trait]
impl RowStore for PostgrestStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        let builder = self
            .client
            .get(self.table_url(table))
            .header("apikey", self.config.service_key())
            .bearer_auth(self.config.service_key())
            .query(&filter_query_pairs(filter, order));

        let response = self.send(builder).await?;
        let response = self.handle_response_status(table, response).await?;
        let body = self.parse_json(response).await?;

        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(StoreError::parse(format!(
                "expected a row array, got: {other}"
            ))),
        }
    }

    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Value, StoreError> {
        // The object Accept header makes PostgREST answer 406 unless
        // exactly one row matches.
        let builder = self
            .request(Method::GET, table, filter)
            .header("Accept", "application/vnd.pgrst.object+json");

        let response = self.send(builder).await?;
        let response = self.handle_response_status(table, response).await?;
        self.parse_json(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let builder = self
            .request(Method::POST, table, &Filter::new())
            .header("Prefer", "return=representation")
            .json(&row);

        let response = self.send(builder).await?;
        let response = self.handle_response_status(table, response).await?;
        let body = self.parse_json(response).await?;

        // return=representation answers with a one-element array.
        match body {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
            Value::Array(_) => Err(StoreError::parse("insert returned no rows")),
            object => Ok(object),
        }
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        let builder = self
            .request(Method::PATCH, table, filter)
            .header("Prefer", "return=minimal")
            .json(&patch);

        let response = self.send(builder).await?;
        self.handle_response_status(table, response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let builder = self.request(Method::DELETE, table, filter);

        let response = self.send(builder).await?;
        self.handle_response_status(table, response).await?;
        Ok(())
    }
}

/// Renders a filter and optional order as PostgREST query parameters.
fn filter_query_pairs(filter: &Filter, order: Option<&Order>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = filter
        .predicates()
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{value}")))
        .collect();

    if let Some(order) = order {
        let direction = match order.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        pairs.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }

    pairs
}
