use tracing::{debug, warn};

use crate::{
    Config,
    error::WeatherError,
    fetch::Fetcher,
    model::{ApiKey, WeatherSnapshot, ZipCode},
    parse::Parser,
    transport::{HttpsTransport, Transport},
};

/// Fetch-then-parse pipeline for one provider configuration.
///
/// `Start → Fetching → {FetchFailed, Fetched} → Parsing → {ParseFailed, Done}`.
/// Both failure states surface as a failed [`WeatherSnapshot`]; nothing is retried.
#[derive(Debug, Clone)]
pub struct WeatherClient<T = HttpsTransport> {
    fetcher: Fetcher<T>,
    parser: Parser,
}

impl WeatherClient<HttpsTransport> {
    /// Construct a client from on-disk configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let anchor = config.trust_anchor()?;
        let fetcher = Fetcher::new(config.fetcher_config(), &anchor)?;
        Ok(Self::new(fetcher, Parser::new(config.parser_config())))
    }
}

impl<T: Transport> WeatherClient<T> {
    pub fn new(fetcher: Fetcher<T>, parser: Parser) -> Self {
        Self { fetcher, parser }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Current weather for `zip`. Failures of any stage yield a snapshot with
    /// `failed() == true`; the cause stays available through `failure()`.
    pub async fn current(&self, zip: u32, api_key: &str) -> WeatherSnapshot {
        match self.try_current(zip, api_key).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(zip, error = %err, "weather lookup failed");
                WeatherSnapshot::from_error(err)
            }
        }
    }

    /// Same pipeline as [`current`](Self::current) with the error kept apart.
    pub async fn try_current(
        &self,
        zip: u32,
        api_key: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let zip = ZipCode::new(zip)?;
        let key = ApiKey::new(api_key)?;

        debug!(%zip, "fetching");
        let body = self.fetcher.fetch(zip, &key).await?;

        debug!(%zip, bytes = body.len(), "parsing");
        let snapshot = self.parser.parse(&body)?;

        debug!(%zip, location = snapshot.location_name(), "done");
        Ok(snapshot)
    }
}
