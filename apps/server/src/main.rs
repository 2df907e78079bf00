//! Explicates command-line host
//!
//! Runs annotation searches and renders collection containers/pages against
//! the configured Postgres store, printing JSON to stdout.
//!
//! Usage:
//!   explicates search --collection foo --fts '{"body": {"query": "bar"}}' --limit 10
//!   explicates container foo --page 1 --iris

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

use explicates::{
    config::Config,
    db::{PostgresAnnotationStore, SearchEngine},
    logging, metrics,
    services::{describe_annotation, preference_from_request, CollectionService, RenderContext},
};

#[derive(Parser, Debug)]
#[command(name = "explicates")]
#[command(about = "Search annotations and render annotation collections")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Write Prometheus metrics for this run to stderr when done
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search annotations across collections
    Search(SearchArgs),

    /// Render a collection container, or one of its pages
    Container {
        /// Collection slug
        slug: String,

        /// Page number; renders the container when omitted
        #[arg(long, allow_negative_numbers = true)]
        page: Option<i64>,

        /// Raw Prefer header value, e.g. 'return=representation;include="http://www.w3.org/ns/oa#PreferContainedIRIs"'
        #[arg(long)]
        prefer: Option<String>,

        /// Embed annotation IRIs instead of full descriptions
        #[arg(long)]
        iris: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Collection slug
    #[arg(long)]
    collection: Option<String>,

    /// JSON containment pattern
    #[arg(long)]
    contains: Option<String>,

    /// Range spec, e.g. '{"created": {"gte": "2019-01-01T00:00:00Z"}}' (repeatable)
    #[arg(long)]
    range: Vec<String>,

    /// Full-text spec, e.g. '{"body": {"query": "foo", "operator": "or"}}' (repeatable)
    #[arg(long)]
    fts: Vec<String>,

    /// Phrase spec, e.g. '{"body": {"query": "foo bar", "distance": 1}}' (repeatable)
    #[arg(long)]
    fts_phrase: Vec<String>,

    /// exclude, include or only
    #[arg(long)]
    deleted: Option<String>,

    #[arg(long)]
    offset: Option<u64>,

    #[arg(long)]
    limit: Option<u64>,
}

impl SearchArgs {
    fn into_items(self) -> Vec<(String, String)> {
        let mut items = Vec::new();
        let mut push = |key: &str, value: String| items.push((key.to_string(), value));

        if let Some(v) = self.collection {
            push("collection", v);
        }
        if let Some(v) = self.contains {
            push("contains", v);
        }
        self.range.into_iter().for_each(|v| push("range", v));
        self.fts.into_iter().for_each(|v| push("fts", v));
        self.fts_phrase.into_iter().for_each(|v| push("fts_phrase", v));
        if let Some(v) = self.deleted {
            push("deleted", v);
        }
        if let Some(v) = self.offset {
            push("offset", v.to_string());
        }
        if let Some(v) = self.limit {
            push("limit", v.to_string());
        }
        items
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting explicates");

    let store = PostgresAnnotationStore::connect(&config.database)
        .await
        .context("Failed to connect to the annotation store")?;
    let engine = SearchEngine::new(Arc::new(store));
    let ctx = RenderContext::from_config(&config.annotations, Utc::now());

    let output = match args.command {
        Command::Search(search) => {
            let result = engine.search_items(&search.into_items()).await?;
            let items: Vec<_> = result
                .items
                .iter()
                .map(|record| describe_annotation(&ctx, record))
                .collect();
            json!({ "total": result.total, "items": items })
        }
        Command::Container {
            slug,
            page,
            prefer,
            iris,
        } => {
            let service = CollectionService::new(engine, config.annotations.per_page)?;
            let preference = preference_from_request(prefer.as_deref(), iris);
            match page {
                Some(page) => service.page(&ctx, &slug, page, preference).await?,
                None => service.container(&ctx, &slug, preference).await?,
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    if args.print_metrics {
        eprint!("{}", metrics::gather_metrics()?);
    }
    Ok(())
}
