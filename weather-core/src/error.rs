//! Error taxonomy of the fetch-and-parse pipeline.
//!
//! Both families collapse into [`WeatherError`], which a failed
//! [`WeatherSnapshot`](crate::WeatherSnapshot) carries for diagnostics.

use thiserror::Error;

/// Inputs that cannot be turned into a request URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("ZIP code {0} is out of range (expected 0..=99999)")]
    InvalidZipCode(u32),

    #[error("`{0}` is not a ZIP code (expected 1-5 digits)")]
    MalformedZipCode(String),

    #[error("invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("request URL is {len} bytes, exceeds capacity of {capacity} bytes")]
    UrlTooLong { len: usize, capacity: usize },
}

/// Failures raised by the fetcher. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("cannot build request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("secure connection setup failed: {0}")]
    ConnectionSetupFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

/// Failures raised by the parser. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingRequiredField(String),

    #[error("field `{path}` is not {expected}")]
    WrongType { path: String, expected: &'static str },
}

/// Origin of a failed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<RequestError> for WeatherError {
    fn from(err: RequestError) -> Self {
        WeatherError::Transport(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_surface_as_transport_failures() {
        let err: WeatherError = RequestError::InvalidZipCode(123_456).into();
        assert_eq!(
            err,
            WeatherError::Transport(TransportError::InvalidRequest(RequestError::InvalidZipCode(
                123_456
            )))
        );
    }

    #[test]
    fn messages_name_the_offending_field() {
        let err = ParseError::MissingRequiredField("weather[0]".into());
        assert_eq!(err.to_string(), "missing required field `weather[0]`");

        let err = ParseError::WrongType { path: "main.temp".into(), expected: "a number" };
        assert_eq!(err.to_string(), "field `main.temp` is not a number");
    }

    #[test]
    fn weather_error_is_transparent() {
        let err = WeatherError::from(TransportError::UnexpectedStatus(500));
        assert_eq!(err.to_string(), "unexpected HTTP status 500");
    }
}
