//! `rds-harvester links`: write detail-page links only, partition by
//! partition, without enrichment or spreadsheet export.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use tokio::sync::Mutex;

use super::args::{QueryArgs, RangeArgs, SessionArgs};
use super::prompt::date_or_prompt;
use crate::acquisition::fetcher::PagedFetcher;
use crate::acquisition::orchestrator::{Retrieval, RetrievalSummary};
use crate::acquisition::partition::partition_days;
use crate::config::HarvestConfig;
use crate::export::links::LinkLog;
use crate::model::DatePartition;
use crate::renderer::chromium::ChromiumFactory;
use crate::session::{obtain_token, validate_token, BrowserTokenProvider, RegistryClient};

#[derive(Args, Debug, Clone)]
pub struct LinksArgs {
    #[command(flatten)]
    pub range: RangeArgs,
    #[command(flatten)]
    pub session: SessionArgs,
    #[command(flatten)]
    pub query: QueryArgs,

    /// Link list path; truncated at start
    #[arg(long, short, default_value = "declaration_links.txt")]
    pub output: PathBuf,
}

pub async fn run(args: LinksArgs) -> Result<()> {
    let mut config = HarvestConfig::default();
    args.session.apply(&mut config)?;
    args.query.apply(&mut config)?;

    let supplied = args.session.supplied_token();
    if let Some(token) = supplied {
        validate_token(token, Utc::now())?;
    }
    let start = date_or_prompt(args.range.from, "Введите дату начала")?;
    let end = date_or_prompt(args.range.to, "Введите дату окончания")?;
    let partitions = partition_days(start, end)?;

    let factory = ChromiumFactory::new(config.browser.clone());
    let provider = BrowserTokenProvider::new(&factory, config.token.clone());
    let token = obtain_token(supplied, &provider, Utc::now()).await?;

    let (summary, written) = collect_links(&config, &token, partitions, &args.output).await?;

    println!();
    println!(
        "Declarations: {} ({} day(s) ok, {} failed)",
        summary.records.len(),
        summary.partitions_ok,
        summary.partitions_failed
    );
    println!("Links:        {written} -> {}", args.output.display());
    Ok(())
}

/// Run retrieval with a link log attached; returns the summary and the
/// number of links written.
pub async fn collect_links(
    config: &HarvestConfig,
    token: &str,
    partitions: Vec<DatePartition>,
    path: &std::path::Path,
) -> Result<(RetrievalSummary, usize)> {
    let client = RegistryClient::new(token, &config.api, &config.session)?;
    let fetcher = PagedFetcher::new(
        client,
        config.api.endpoint.clone(),
        config.filter.clone(),
        config.api.page_size,
        config.retry,
    );

    let log = Arc::new(Mutex::new(LinkLog::create(path)?));
    let summary = Retrieval::new(&fetcher, config.retrieval_workers)
        .with_link_log(Arc::clone(&log), &config.api.detail_base)
        .run(partitions)
        .await;

    let written = log.lock().await.written();
    Ok((summary, written))
}
