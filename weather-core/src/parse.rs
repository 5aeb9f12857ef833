//! Validation and field extraction for the provider's current-weather JSON.
//!
//! Expected shape (fields not listed here are ignored):
//!
//! ```json
//! {"weather":[{"main":"Clouds","description":"few clouds"}],
//!  "main":{"temp":70.39,"feels_like":59.09,"temp_min":68,"temp_max":73.4,"pressure":1016,"humidity":33},
//!  "wind":{"speed":16.11,"deg":330,"gust":24.16},
//!  "dt":1591485039,
//!  "timezone":-25200,
//!  "name":"San Jose"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::{
    error::ParseError,
    model::{Observation, WeatherSnapshot},
};

pub const DEFAULT_CAPACITY: usize = 20_480;

const REQUIRED_TOP_LEVEL: [&str; 6] = ["name", "weather", "main", "wind", "dt", "timezone"];

/// How extracted fields of an unexpected type are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Missing, null or mistyped nested fields become `""`, `0` or `0.0`.
    #[default]
    Lenient,
    /// Every extracted field must be present with the expected type.
    Strict,
}

impl DecodePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodePolicy::Lenient => "lenient",
            DecodePolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Largest accepted body, in bytes.
    pub capacity: usize,
    pub policy: DecodePolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY, policy: DecodePolicy::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse(&self, body: &str) -> Result<WeatherSnapshot, ParseError> {
        let observation = self.observation(body).inspect_err(|e| {
            warn!(error = %e, policy = ?self.config.policy, "failed to parse weather response");
        })?;
        debug!(location = %observation.location_name, "parsed weather response");
        Ok(WeatherSnapshot::populated(observation))
    }

    fn observation(&self, body: &str) -> Result<Observation, ParseError> {
        if body.len() > self.config.capacity {
            return Err(ParseError::Malformed(format!(
                "document is {} bytes, exceeds capacity of {} bytes",
                body.len(),
                self.config.capacity
            )));
        }

        let doc: Value =
            serde_json::from_str(body).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let root = doc
            .as_object()
            .ok_or_else(|| ParseError::Malformed("top-level value is not an object".to_string()))?;

        if let Some(missing) = REQUIRED_TOP_LEVEL.into_iter().find(|key| !root.contains_key(*key)) {
            return Err(ParseError::MissingRequiredField(missing.to_string()));
        }

        let fields = Fields { policy: self.config.policy };
        let first_weather = fields.first_element(root, "weather")?;
        let main = fields.object(root, "main")?;
        let wind = fields.object(root, "wind")?;

        Ok(Observation {
            location_name: fields.string(Some(root), "", "name")?,
            condition_summary: fields.string(first_weather, "weather[0]", "main")?,
            condition_detail: fields.string(first_weather, "weather[0]", "description")?,
            observed_at_epoch: fields.integer(Some(root), "", "dt")?,
            utc_offset_seconds: fields.offset(root, "timezone")?,
            temperature: fields.number(main, "main", "temp")?,
            feels_like: fields.number(main, "main", "feels_like")?,
            temperature_min: fields.number(main, "main", "temp_min")?,
            temperature_max: fields.number(main, "main", "temp_max")?,
            pressure: fields.number(main, "main", "pressure")?,
            humidity: fields.number(main, "main", "humidity")?,
            wind_speed: fields.number(wind, "wind", "speed")?,
            wind_direction_degrees: fields.number(wind, "wind", "deg")?,
            wind_gust: fields.number(wind, "wind", "gust")?,
        })
    }
}

/// Field accessors applying one [`DecodePolicy`].
///
/// A `None` parent stands in for an object that had the wrong type under the
/// lenient policy; every lookup under it yields the default.
struct Fields {
    policy: DecodePolicy,
}

impl Fields {
    fn strict(&self) -> bool {
        self.policy == DecodePolicy::Strict
    }

    /// First element of the array at `key`; `None` is the lenient stand-in
    /// for an element that is not an object.
    fn first_element<'a>(
        &self,
        root: &'a Map<String, Value>,
        key: &str,
    ) -> Result<Option<&'a Map<String, Value>>, ParseError> {
        let path = format!("{key}[0]");

        let items = match root.get(key) {
            Some(Value::Array(items)) => items,
            Some(_) if self.strict() => return Err(wrong_type(key.to_string(), "an array")),
            _ => return Err(ParseError::MissingRequiredField(path)),
        };

        match items.first() {
            Some(Value::Object(first)) => Ok(Some(first)),
            Some(_) if self.strict() => Err(wrong_type(path, "an object")),
            Some(_) => Ok(None),
            None => Err(ParseError::MissingRequiredField(path)),
        }
    }

    fn object<'a>(
        &self,
        root: &'a Map<String, Value>,
        key: &str,
    ) -> Result<Option<&'a Map<String, Value>>, ParseError> {
        match root.get(key) {
            Some(Value::Object(map)) => Ok(Some(map)),
            None if self.strict() => Err(ParseError::MissingRequiredField(key.to_string())),
            _ if self.strict() => Err(wrong_type(key.to_string(), "an object")),
            _ => Ok(None),
        }
    }

    fn lookup<'a>(
        &self,
        parent: Option<&'a Map<String, Value>>,
        key: &str,
        path: &str,
    ) -> Result<Option<&'a Value>, ParseError> {
        match parent.and_then(|p| p.get(key)) {
            Some(value) => Ok(Some(value)),
            None if self.strict() => Err(ParseError::MissingRequiredField(path.to_string())),
            None => Ok(None),
        }
    }

    fn string(
        &self,
        parent: Option<&Map<String, Value>>,
        prefix: &str,
        key: &str,
    ) -> Result<String, ParseError> {
        let path = join(prefix, key);
        match self.lookup(parent, key, &path)? {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) if self.strict() => Err(wrong_type(path, "a string")),
            _ => Ok(String::new()),
        }
    }

    fn number(
        &self,
        parent: Option<&Map<String, Value>>,
        prefix: &str,
        key: &str,
    ) -> Result<f64, ParseError> {
        let path = join(prefix, key);
        match self.lookup(parent, key, &path)? {
            Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or_default()),
            Some(_) if self.strict() => Err(wrong_type(path, "a number")),
            _ => Ok(0.0),
        }
    }

    fn integer(
        &self,
        parent: Option<&Map<String, Value>>,
        prefix: &str,
        key: &str,
    ) -> Result<i64, ParseError> {
        let path = join(prefix, key);
        match self.lookup(parent, key, &path)?.map(|v| (v, v.as_i64())) {
            Some((_, Some(n))) => Ok(n),
            Some(_) if self.strict() => Err(wrong_type(path, "an integer")),
            _ => Ok(0),
        }
    }

    /// Timezone offset in seconds; must fit a UTC offset.
    fn offset(&self, root: &Map<String, Value>, key: &str) -> Result<i32, ParseError> {
        let raw = self.integer(Some(root), "", key)?;
        match i32::try_from(raw) {
            Ok(offset) => Ok(offset),
            Err(_) if self.strict() => Err(wrong_type(key.to_string(), "a UTC offset in seconds")),
            Err(_) => Ok(0),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") }
}

fn wrong_type(path: String, expected: &'static str) -> ParseError {
    ParseError::WrongType { path, expected }
}
