//! Factories for the per-job external sessions.
//!
//! Every job builds its own listing client, enricher or browser session at
//! start and drops it when the job body returns. The methods are called on
//! the blocking job thread, so implementations may construct blocking HTTP
//! clients.

use ftclaw_harvester::enrich::{BrowserEnricher, Enricher, OpenApiEnricher};
use ftclaw_harvester::{BrowserSession, BrowserlessClient, FtcListing, ListingSource};

use crate::config::ServerConfig;
use crate::error::Result;

pub trait JobServices: Send + Sync + 'static {
    fn listing(&self) -> Result<Box<dyn ListingSource>>;

    /// The open API strategy when a credential is configured, else the browser.
    fn enricher(&self) -> Result<Box<dyn Enricher>>;

    fn browser(&self) -> Result<BrowserSession>;
}

/// Services talking to the live site, the open API and Browserless.
pub struct LiveServices {
    config: ServerConfig,
}

impl LiveServices {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl JobServices for LiveServices {
    fn listing(&self) -> Result<Box<dyn ListingSource>> {
        let listing = FtcListing::new()?
            .with_base_url(self.config.ftc_base_url.as_str())
            .with_delay(self.config.listing_delay);
        Ok(Box::new(listing))
    }

    fn enricher(&self) -> Result<Box<dyn Enricher>> {
        match self.config.api_credential.as_deref() {
            Some(credential) => Ok(Box::new(OpenApiEnricher::new(credential)?)),
            None => Ok(Box::new(BrowserEnricher::new(self.browser()?))),
        }
    }

    fn browser(&self) -> Result<BrowserSession> {
        let client = BrowserlessClient::new(
            &self.config.browserless_url,
            self.config.browserless_token.as_deref(),
        )?;
        Ok(BrowserSession::new(Box::new(client)).with_settle(self.config.settle_delay))
    }
}
