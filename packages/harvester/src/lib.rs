//! FTC Law Harvester - Collect statutory-reference metadata published by
//! the Korea Fair Trade Commission.
//!
//! This crate fetches the commission's per-category law listings, rebuilds
//! their row-spanned tables into flat records, and fills in each record's
//! effective and revision dates from the detail page or the national law
//! search API.
//!
//! # Example
//!
//! ```
//! use ftclaw_harvester::effective::EffectiveInfo;
//!
//! let info = EffectiveInfo::parse("[시행 2025. 1. 1.] [법률 제20101호, 2024. 1. 21., 일부개정]");
//! assert_eq!(info.effective_date, "2025. 1. 1.");
//! assert_eq!(info.revision_type, "일부개정");
//! ```
//!
//! # Architecture
//!
//! - [`config`]: URLs, category lookup tables and timeouts
//! - [`types`]: [`LawRecord`] and the sentinel values
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP client for the listing site and APIs
//! - [`rowspan`]: Row-span reconstruction
//! - [`listing`]: Listing fetcher
//! - [`effective`]: Effective/revision fragment parsing
//! - [`browser`]: Headless browser seam and the extraction cascade
//! - [`enrich`]: Browser and open API enrichment strategies
//! - [`xml`]: XML utilities
//! - [`cli`]: Command-line interface

pub mod browser;
pub mod cli;
pub mod config;
pub mod effective;
pub mod enrich;
pub mod error;
pub mod http;
pub mod listing;
pub mod rowspan;
pub mod types;
pub mod xml;

// Re-export commonly used items
pub use browser::{BrowserSession, BrowserlessClient, PdfSource, RenderService};
pub use config::Category;
pub use effective::EffectiveInfo;
pub use enrich::{needs_enrichment, EnrichOutcome, EnrichSummary, Enricher};
pub use error::{HarvesterError, Result};
pub use listing::{FtcListing, ListingSource};
pub use types::{sentinel, LawRecord};
