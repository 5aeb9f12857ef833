//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The HTTPS fetcher, pinned to a single trust anchor
//! - The response parser with its lenient/strict decoding policies
//! - The `WeatherSnapshot` domain model and error taxonomy
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parse;
pub mod transport;

pub use client::WeatherClient;
pub use config::{Config, DecodingConfig, EndpointConfig};
pub use error::{ParseError, RequestError, TransportError, WeatherError};
pub use fetch::{Fetcher, FetcherConfig};
pub use model::{ApiKey, Observation, WeatherSnapshot, ZipCode};
pub use parse::{DecodePolicy, Parser, ParserConfig};
pub use transport::{HttpReply, HttpsTransport, Transport, TrustAnchor};
