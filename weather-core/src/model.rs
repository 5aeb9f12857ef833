use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{RequestError, WeatherError};

/// A U.S. ZIP code in `0..=99999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZipCode(u32);

impl ZipCode {
    pub const MAX: u32 = 99_999;

    pub fn new(value: u32) -> Result<Self, RequestError> {
        if value > Self::MAX {
            return Err(RequestError::InvalidZipCode(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Always five digits, so `02134` keeps its leading zero.
impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

impl FromStr for ZipCode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > 5 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RequestError::MalformedZipCode(s.to_owned()));
        }
        let value = s.parse().map_err(|_| RequestError::MalformedZipCode(s.to_owned()))?;
        Self::new(value)
    }
}

/// Opaque provider credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, RequestError> {
        let key = key.into();
        if key.is_empty() {
            return Err(RequestError::InvalidApiKey("key is empty".into()));
        }
        let unsupported = |c: &char| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-');
        if let Some(c) = key.chars().find(unsupported) {
            return Err(RequestError::InvalidApiKey(format!("unsupported character {c:?}")));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Fields of one successfully parsed response, in the provider's imperial units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location_name: String,
    pub condition_summary: String,
    pub condition_detail: String,
    pub observed_at_epoch: i64,
    pub utc_offset_seconds: i32,
    pub temperature: f64,
    pub feels_like: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction_degrees: f64,
    pub wind_gust: f64,
}

impl Observation {
    /// Observation time in the location's own timezone.
    pub fn observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds)?;
        DateTime::from_timestamp(self.observed_at_epoch, 0).map(|utc| utc.with_timezone(&offset))
    }
}

/// Result of one weather lookup.
///
/// Either fully populated or a failure marker; there is no partial state.
/// Accessors on a failed snapshot return defaults that carry no meaning, so
/// check [`failed`](Self::failed) first.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    observation: Observation,
    failure: Option<WeatherError>,
}

impl WeatherSnapshot {
    pub fn populated(observation: Observation) -> Self {
        Self { observation, failure: None }
    }

    pub fn from_error(error: impl Into<WeatherError>) -> Self {
        Self { observation: Observation::default(), failure: Some(error.into()) }
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Why the lookup failed, if it did.
    pub fn failure(&self) -> Option<&WeatherError> {
        self.failure.as_ref()
    }

    pub fn observation(&self) -> Option<&Observation> {
        match self.failure {
            Some(_) => None,
            None => Some(&self.observation),
        }
    }

    pub fn into_result(self) -> Result<Observation, WeatherError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.observation),
        }
    }

    pub fn location_name(&self) -> &str {
        &self.observation.location_name
    }

    pub fn condition_summary(&self) -> &str {
        &self.observation.condition_summary
    }

    pub fn condition_detail(&self) -> &str {
        &self.observation.condition_detail
    }

    pub fn observed_at_epoch(&self) -> i64 {
        self.observation.observed_at_epoch
    }

    pub fn utc_offset_seconds(&self) -> i32 {
        self.observation.utc_offset_seconds
    }

    pub fn temperature(&self) -> f64 {
        self.observation.temperature
    }

    pub fn feels_like(&self) -> f64 {
        self.observation.feels_like
    }

    pub fn temperature_min(&self) -> f64 {
        self.observation.temperature_min
    }

    pub fn temperature_max(&self) -> f64 {
        self.observation.temperature_max
    }

    pub fn pressure(&self) -> f64 {
        self.observation.pressure
    }

    pub fn humidity(&self) -> f64 {
        self.observation.humidity
    }

    pub fn wind_speed(&self) -> f64 {
        self.observation.wind_speed
    }

    pub fn wind_direction_degrees(&self) -> f64 {
        self.observation.wind_direction_degrees
    }

    pub fn wind_gust(&self) -> f64 {
        self.observation.wind_gust
    }
}
