//! `rds-harvester run`: token → partitions → retrieval → enrichment → export.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Local, Utc};
use clap::Args;
use tracing::{error, info};

use super::args::{OutputArgs, QueryArgs, RangeArgs, SessionArgs};
use super::prompt::date_or_prompt;
use crate::acquisition::fetcher::PagedFetcher;
use crate::acquisition::orchestrator::retrieve_all;
use crate::acquisition::partition::partition_days;
use crate::config::HarvestConfig;
use crate::enrichment::ContactEnricher;
use crate::export::{export_workbook, write_contacts_listing, ExportOutcome};
use crate::model::DatePartition;
use crate::renderer::chromium::ChromiumFactory;
use crate::renderer::RendererFactory;
use crate::session::{obtain_token, validate_token, BrowserTokenProvider, RegistryClient};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub range: RangeArgs,
    #[command(flatten)]
    pub session: SessionArgs,
    #[command(flatten)]
    pub query: QueryArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

/// What one run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub records: usize,
    pub partitions_ok: usize,
    pub partitions_failed: usize,
    pub with_contacts: usize,
    /// Spreadsheet rows written; `None` when no workbook was produced.
    pub workbook_rows: Option<usize>,
    /// Whether the contacts listing was written.
    pub contacts_written: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = HarvestConfig::default();
    args.session.apply(&mut config)?;
    args.query.apply(&mut config)?;
    args.output.apply(&mut config);

    // Everything that can fail locally fails before the browser starts.
    let supplied = args.session.supplied_token();
    if let Some(token) = supplied {
        validate_token(token, Utc::now())?;
    }
    let start = date_or_prompt(args.range.from, "Введите дату начала")?;
    let end = date_or_prompt(args.range.to, "Введите дату окончания")?;
    let partitions = partition_days(start, end)?;

    let factory: Arc<dyn RendererFactory> = Arc::new(ChromiumFactory::new(config.browser.clone()));
    let provider = BrowserTokenProvider::new(factory.as_ref(), config.token.clone());
    let token = obtain_token(supplied, &provider, Utc::now()).await?;

    let report = harvest(
        &config,
        &token,
        partitions,
        factory,
        !args.output.skip_enrich,
    )
    .await?;

    println!();
    println!(
        "Declarations: {} ({} day(s) ok, {} failed)",
        report.records, report.partitions_ok, report.partitions_failed
    );
    println!("With contacts: {}", report.with_contacts);
    match report.workbook_rows {
        Some(rows) => println!("Spreadsheet:  {} ({rows} rows)", config.output.workbook.display()),
        None => println!("Spreadsheet:  not written"),
    }
    if report.contacts_written {
        println!("Contacts:     {}", config.output.contacts.display());
    }
    Ok(())
}

/// Retrieve, optionally enrich, and export with an already obtained token.
///
/// Per-partition and per-record failures are absorbed. Export failures are
/// logged; the call fails only when neither output file could be written.
pub async fn harvest(
    config: &HarvestConfig,
    token: &str,
    partitions: Vec<DatePartition>,
    factory: Arc<dyn RendererFactory>,
    enrich: bool,
) -> Result<RunReport> {
    let client = RegistryClient::new(token, &config.api, &config.session)?;
    let fetcher = PagedFetcher::new(
        client,
        config.api.endpoint.clone(),
        config.filter.clone(),
        config.api.page_size,
        config.retry,
    );

    let summary = retrieve_all(&fetcher, partitions, config.retrieval_workers).await;
    let mut report = RunReport {
        records: summary.records.len(),
        partitions_ok: summary.partitions_ok,
        partitions_failed: summary.partitions_failed,
        ..RunReport::default()
    };

    let records = if enrich {
        ContactEnricher::new(factory, config.enrich.clone(), &config.api.detail_base)
            .enrich_all(summary.records, config.enrich.workers)
            .await
    } else {
        info!("contact enrichment skipped");
        summary.records
    };
    report.with_contacts = records
        .iter()
        .filter(|r| !r.applicant_phone.is_empty() || !r.applicant_email.is_empty())
        .count();

    let captured_at = Local::now().naive_local();
    let mut failures = 0;

    match export_workbook(
        &records,
        &config.output.workbook,
        captured_at,
        &config.api.detail_base,
    ) {
        Ok(ExportOutcome::Written { rows }) => report.workbook_rows = Some(rows),
        Ok(ExportOutcome::NoData) => {}
        Err(e) => {
            error!("failed to write {}: {e}", config.output.workbook.display());
            failures += 1;
        }
    }

    match write_contacts_listing(&records, &config.output.contacts) {
        Ok(lines) => {
            info!("wrote {lines} contact line(s) to {}", config.output.contacts.display());
            report.contacts_written = true;
        }
        Err(e) => {
            error!("failed to write {}: {e}", config.output.contacts.display());
            failures += 1;
        }
    }

    if failures == 2 {
        bail!("no output could be written");
    }
    Ok(report)
}
