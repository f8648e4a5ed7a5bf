//! Command-line interface for the harvester.

use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::browser::{extract_effective_info, BrowserSession, BrowserlessClient};
use crate::config::{Category, FTC_BASE_URL};
use crate::effective::EffectiveInfo;
use crate::enrich::{ApiTarget, LookupError, OpenApiEnricher};
use crate::error::Result;
use crate::listing::{FtcListing, ListingSource};
use crate::types::LawRecord;

/// FTC Law Harvester - Collect FTC law listings and their effective dates.
#[derive(Parser)]
#[command(name = "ftclaw-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch listing records for one category (1-14) or all of them.
    List {
        /// Category number, or "all"
        target: String,

        /// Listing site base URL
        #[arg(long, default_value = FTC_BASE_URL)]
        base_url: String,

        /// Pause before each listing request, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },

    /// Extract the effective/revision fragment from one detail page.
    Detail {
        /// Detail page URL
        url: String,

        /// Browserless service URL
        #[arg(long, default_value = "http://localhost:3000")]
        browserless_url: String,

        /// Browserless token
        #[arg(long)]
        token: Option<String>,
    },

    /// Look an instrument up by title through the open API.
    Lookup {
        /// Exact instrument title
        name: String,

        /// Instrument kind, used to choose between laws and administrative rules
        #[arg(short, long, default_value = "법률")]
        kind: String,

        /// OC id or service key
        #[arg(short, long)]
        credential: String,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            target,
            base_url,
            delay_ms,
        } => list_command(&target, &base_url, Duration::from_millis(delay_ms)),
        Commands::Detail {
            url,
            browserless_url,
            token,
        } => detail_command(&url, &browserless_url, token.as_deref()),
        Commands::Lookup {
            name,
            kind,
            credential,
        } => lookup_command(&name, &kind, &credential),
    }
}

/// Parse a listing target: `all` or a single category.
pub fn parse_target(target: &str) -> Result<Vec<Category>> {
    if target.trim().eq_ignore_ascii_case("all") {
        Ok(Category::all().collect())
    } else {
        Ok(vec![Category::parse(target)?])
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Execute the list command.
fn list_command(target: &str, base_url: &str, delay: Duration) -> Result<()> {
    let categories = parse_target(target)?;
    let listing = FtcListing::new()?.with_base_url(base_url).with_delay(delay);

    let pb = spinner();
    let mut records: Vec<LawRecord> = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        pb.set_message(format!(
            "Category {category} ({}/{})...",
            i + 1,
            categories.len()
        ));
        records.extend(listing.fetch_category(*category));
    }
    pb.finish_and_clear();

    let with_link = records.iter().filter(|r| r.has_link()).count();
    eprintln!(
        "{} {} records ({} with detail link)",
        style("Collected").green().bold(),
        records.len(),
        with_link
    );
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Execute the detail command.
fn detail_command(url: &str, browserless_url: &str, token: Option<&str>) -> Result<()> {
    let renderer = BrowserlessClient::new(browserless_url, token)?;
    let session = BrowserSession::new(Box::new(renderer));

    let pb = spinner();
    pb.set_message(format!("Rendering {url}..."));
    let fragment = extract_effective_info(&session, url);
    pb.finish_and_clear();

    let fragment = fragment?;
    if fragment.is_empty() {
        println!("{}", style("No effective-date fragment found").yellow());
        return Ok(());
    }
    print_info(&EffectiveInfo::parse(&fragment));
    Ok(())
}

/// Execute the lookup command.
fn lookup_command(name: &str, kind: &str, credential: &str) -> Result<()> {
    let enricher = OpenApiEnricher::new(credential)?;
    let target = ApiTarget::for_kind(kind);

    let pb = spinner();
    pb.set_message(format!("Searching {} for {name}...", target.query_value()));
    let result = enricher.lookup_by_name(name, kind);
    pb.finish_and_clear();

    match result {
        Ok(info) => print_info(&info),
        Err(LookupError::NotFound) => println!("{}", style("No matching record").yellow()),
        Err(e) => println!("{} {e}", style("Lookup failed:").red().bold()),
    }
    Ok(())
}

fn print_info(info: &EffectiveInfo) {
    println!("  Fragment: {}", style(&info.raw).cyan());
    println!("  Effective: {}", style(&info.effective_date).green());
    println!("  Revision: {}", info.revision_info);
    println!("  Revision date: {}", info.revision_date);
    println!("  Revision type: {}", info.revision_type);
}
