//! Weather integration: resolve a city to coordinates, call the configured
//! endpoint and pull the current temperature out of the response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::data::{IntegrationMetadata, LocationOption};
use crate::value::Variables;
use crate::NodeError;

// ---------------------------------------------------------------------------
// Outbound HTTP
// ---------------------------------------------------------------------------

/// A decoded upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Performs the outbound GET for an integration node.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// # Errors
    /// [`NodeError::UpstreamCall`] on transport failure or a non-2xx status,
    /// [`NodeError::MalformedResponse`] if the body isn't JSON.
    async fn call(&self, url: &str) -> Result<ApiResponse, NodeError>;
}

/// `reqwest`-backed [`ApiClient`]. Single attempt, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| NodeError::UpstreamCall(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call(&self, url: &str) -> Result<ApiResponse, NodeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NodeError::UpstreamCall(format!("failed to make API request: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| NodeError::UpstreamCall(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(NodeError::UpstreamCall(format!(
                "API request failed with status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let body = serde_json::from_str(&text)
            .map_err(|e| NodeError::MalformedResponse(format!("response is not JSON: {e}")))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Integration client
// ---------------------------------------------------------------------------

/// The result of one integration call.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature: f64,
    /// Canonical city name from the matched option.
    pub location: String,
    pub raw_response: Value,
    pub url: String,
    pub status: u16,
}

/// Resolves locations and calls the weather endpoint through an [`ApiClient`].
#[derive(Clone)]
pub struct WeatherIntegration {
    client: Arc<dyn ApiClient>,
}

impl WeatherIntegration {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self { client }
    }

    /// Resolve `inputs["city"]` against the node's options and fetch the
    /// current temperature there.
    ///
    /// # Errors
    /// - [`NodeError::MissingInput`] / [`NodeError::TypeMismatch`] for `city`.
    /// - [`NodeError::LocationNotFound`] if no option matches.
    /// - Whatever the [`ApiClient`] returns.
    /// - [`NodeError::MalformedResponse`] if there's no numeric
    ///   `current_weather.temperature`.
    pub async fn resolve_and_call(
        &self,
        metadata: &IntegrationMetadata,
        inputs: &Variables,
    ) -> Result<WeatherReading, NodeError> {
        let city = inputs.require_str("city")?;
        let option = find_location(city, &metadata.options)?;
        let url = build_url(&metadata.api_endpoint, option.lat, option.lon);

        debug!(
            %url,
            city = %option.city,
            lat = option.lat,
            lon = option.lon,
            "calling weather API"
        );

        let resp = self.client.call(&url).await?;
        let temperature = extract_temperature(&resp.body)?;

        Ok(WeatherReading {
            temperature,
            location: option.city.clone(),
            raw_response: resp.body,
            url,
            status: resp.status,
        })
    }
}

/// Case-insensitive lookup of `city` among the declared options.
pub fn find_location<'a>(
    city: &str,
    options: &'a [LocationOption],
) -> Result<&'a LocationOption, NodeError> {
    let wanted = city.to_lowercase();
    options
        .iter()
        .find(|o| o.city.to_lowercase() == wanted)
        .ok_or_else(|| NodeError::LocationNotFound {
            city: city.to_owned(),
            available: options.iter().map(|o| o.city.clone()).collect(),
        })
}

/// Substitute `{lat}` / `{lon}` with fixed six-decimal coordinates.
pub fn build_url(template: &str, lat: f64, lon: f64) -> String {
    template
        .replace("{lat}", &format!("{lat:.6}"))
        .replace("{lon}", &format!("{lon:.6}"))
}

/// Read `current_weather.temperature`, accepting integer or float encodings.
pub fn extract_temperature(body: &Value) -> Result<f64, NodeError> {
    let current = body.get("current_weather").ok_or_else(|| {
        NodeError::MalformedResponse("current_weather not found in API response".into())
    })?;
    if !current.is_object() {
        return Err(NodeError::MalformedResponse("current_weather is not an object".into()));
    }
    let temperature = current.get("temperature").ok_or_else(|| {
        NodeError::MalformedResponse("temperature not found in current_weather".into())
    })?;
    temperature.as_f64().ok_or_else(|| {
        NodeError::MalformedResponse(format!("temperature is not a numeric value: {temperature}"))
    })
}
