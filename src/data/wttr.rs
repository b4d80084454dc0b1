//! wttr.in `format=j1` integration.
//!
//! Only the fields the normalizer reads are modeled; everything else in the
//! response is ignored. All fields are optional at this layer so a sparse day
//! degrades to defaults instead of failing the whole decode.

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{Reading, SourceConfig};
use crate::error::AppError;

/// Raw forecast payload as returned by wttr.in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub weather: Vec<RawDay>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDay {
    pub date: Option<String>,
    #[serde(rename = "maxtempC", default)]
    pub max_temp_c: Reading,
    #[serde(rename = "mintempC", default)]
    pub min_temp_c: Reading,
    #[serde(default)]
    pub hourly: Vec<RawHour>,
    #[serde(default)]
    pub astronomy: Vec<RawAstronomy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHour {
    /// Time-of-day code: `"0"`, `"300"`, ..., `"1200"`, ..., `"2100"`.
    pub time: Option<String>,
    #[serde(rename = "FeelsLikeC", default)]
    pub feels_like_c: Reading,
    #[serde(rename = "HeatIndexC", default)]
    pub heat_index_c: Reading,
    #[serde(rename = "weatherDesc", default)]
    pub weather_desc: Vec<RawText>,
    #[serde(default)]
    pub humidity: Reading,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawText {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAstronomy {
    pub sunset: Option<String>,
}

pub struct WttrClient {
    client: Client,
    url: Url,
}

impl WttrClient {
    pub fn new(config: &SourceConfig) -> Result<Self, AppError> {
        let url = forecast_url(&config.base_url, &config.location)?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    pub fn forecast_url(&self) -> &Url {
        &self.url
    }

    /// Fetch the multi-day forecast for the configured location.
    pub fn fetch(&self) -> Result<RawForecast, AppError> {
        info!(url = %self.url, "fetching forecast");

        let resp = self
            .client
            .get(self.url.clone())
            .query(&[("format", "j1")])
            .send()
            .map_err(|e| AppError::fetch(format!("Forecast request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::fetch(format!(
                "Forecast request failed with status {}.",
                resp.status()
            )));
        }

        let body: RawForecast = resp
            .json()
            .map_err(|e| AppError::fetch(format!("Failed to parse forecast response: {e}")))?;

        debug!(days = body.weather.len(), "forecast payload decoded");
        Ok(body)
    }
}

/// `{base_url}/{location}`, with the location as a single path segment.
fn forecast_url(base_url: &str, location: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::io(format!("Invalid base URL `{base_url}`: {e}")))?;

    // wttr.in reads `+` as a space.
    let segment = location.trim().replace(' ', "+");
    url.path_segments_mut()
        .map_err(|_| AppError::io(format!("Base URL `{base_url}` cannot carry a path")))?
        .pop_if_empty()
        .push(&segment);
    Ok(url)
}
