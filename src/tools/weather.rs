use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};
use tracing::{instrument, warn};

use crate::config::WeatherSettings;

use super::Tool;

/// `get_weather(city)` backed by wttr.in's JSON (`format=j1`) endpoint.
pub struct GetWeatherTool {
    http: reqwest::Client,
    base_url: String,
}

impl GetWeatherTool {
    const FAILURE: &'static str = "Could not retrieve weather data.";
    const KEPT_SECTIONS: [&'static str; 3] = ["current_condition", "nearest_area", "weather"];

    pub fn new(settings: &WeatherSettings) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(settings.http_timeout_ms.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build weather HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    fn endpoint(&self, city: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid weather base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Weather base URL cannot hold a path"))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }

    /// Fetch the forecast; any non-200 status becomes an error.
    pub async fn fetch(&self, city: &str) -> anyhow::Result<Value> {
        let url = self.endpoint(city)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Weather request failed")?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(anyhow!("Weather endpoint returned status {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to decode weather response")?;
        Ok(Self::trim_report(body))
    }

    /// Keep the sections worth narrating; the full report is large.
    fn trim_report(body: Value) -> Value {
        match body {
            Value::Object(mut sections) => {
                let kept: Map<String, Value> = Self::KEPT_SECTIONS
                    .iter()
                    .filter_map(|key| sections.remove(*key).map(|v| (key.to_string(), v)))
                    .collect();
                if kept.is_empty() {
                    Value::Object(sections)
                } else {
                    Value::Object(kept)
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> &'static str {
        "Retrieve the current weather report and short forecast for a city."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "Name of the city to report on"
                }
            },
            "required": ["city"]
        })
    }

    #[instrument(skip_all, name = "get_weather")]
    async fn call(&self, args: Value) -> Value {
        let city = args
            .get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|city| !city.is_empty());

        let Some(city) = city else {
            return json!({ "error": "city must be a non-empty string" });
        };

        match self.fetch(city).await {
            Ok(report) => report,
            Err(err) => {
                warn!(?err, city, "Weather lookup failed");
                json!({ "error": Self::FAILURE })
            }
        }
    }
}
