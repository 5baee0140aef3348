use std::collections::HashSet;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::db::{GroupRow, NewEvent, NewGroup, Store};
use crate::error::ExtractError;
use crate::fetch::{self, FetchOptions, Fetcher};
use crate::parser::associate::{period_at, preceding};
use crate::parser::markers::{self, Marker, MarkerKind, Period};
use crate::parser::records::{self, RecordKind};
use crate::parser::resolve::{resolve, Parent};
use crate::settings::Settings;

/// Collaborators for one extraction run.
pub struct RunContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub store: &'a dyn Store,
    pub settings: &'a Settings,
    pub origin: Url,
    /// Period for groups listed before any month header.
    pub default_period: Period,
}

impl<'a> RunContext<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        store: &'a dyn Store,
        settings: &'a Settings,
    ) -> Result<Self, url::ParseError> {
        Ok(RunContext {
            fetcher,
            store,
            settings,
            origin: Url::parse(&settings.site_origin)?,
            default_period: Period::current_month(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub new_record_count: usize,
    pub message: String,
}

impl RunSummary {
    pub fn from_result(result: Result<usize, ExtractError>, noun: &str) -> Self {
        match result {
            Ok(n) => RunSummary {
                success: true,
                new_record_count: n,
                message: format!("Successfully extracted {} new {}", n, noun),
            },
            Err(e) => RunSummary {
                success: false,
                new_record_count: 0,
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub success: bool,
    pub total_new_records: usize,
    pub groups_processed: usize,
}

impl BatchSummary {
    pub fn message(&self) -> String {
        format!(
            "Extracted {} events from {} groups",
            self.total_new_records, self.groups_processed
        )
    }
}

fn fetch_document(ctx: &RunContext, url: &str, opts: &FetchOptions) -> Result<String, ExtractError> {
    let html = ctx
        .fetcher
        .fetch(url, opts)
        .map_err(|e| ExtractError::from_fetch(url, e))?;
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument {
            url: url.to_string(),
        });
    }
    Ok(html)
}

// ── Groups ──

/// Fetch the schedule listing and store every group not seen before.
pub fn extract_groups(ctx: &RunContext) -> Result<usize, ExtractError> {
    let url = ctx.settings.schedule_url.as_str();
    info!("Extracting groups from {}", url);
    let html = fetch_document(ctx, url, &FetchOptions::listing(ctx.settings))?;
    store_groups(ctx, &html)
}

pub fn store_groups(ctx: &RunContext, html: &str) -> Result<usize, ExtractError> {
    let markers: Vec<Marker> = markers::scan(html, MarkerKind::Month).collect();
    if markers.is_empty() {
        info!(
            "No month headers found, using {}",
            ctx.default_period.label()
        );
    }

    let mut seen = HashSet::new();
    let mut inserted = 0;

    for rec in records::scan(html, RecordKind::Series, &ctx.origin) {
        let base = base_path(&rec.path).to_string();
        if !seen.insert(base) {
            continue;
        }

        let url = canonical_group_url(&ctx.origin, &rec.path);
        if ctx.store.find_group_by_url(&url)?.is_some() {
            debug!("Group already stored: {}", url);
            continue;
        }

        let period = period_at(&markers, rec.offset, &ctx.default_period);
        ctx.store.insert_group(&NewGroup {
            period: period.name,
            year: period.year,
            name: rec.primary,
            date_range: rec.secondary,
            url,
        })?;
        inserted += 1;
    }

    info!("Stored {} new groups", inserted);
    Ok(inserted)
}

fn base_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.strip_suffix("/matches").unwrap_or(trimmed)
}

/// Group URLs always point at the group's match listing, with no query or
/// fragment carried over from the schedule link.
pub fn canonical_group_url(origin: &Url, path: &str) -> String {
    let path = path.trim_end_matches('/');
    let mut url = origin.clone();
    if path.contains("/matches") {
        url.set_path(path);
    } else {
        url.set_path(&format!("{}/matches", path));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.into()
}

// ── Events ──

/// Fetch one group's listing and store the events that belong to it.
pub fn extract_events(ctx: &RunContext, group_id: i64) -> Result<usize, ExtractError> {
    let group = ctx
        .store
        .group(group_id)?
        .ok_or(ExtractError::UnknownParent(group_id))?;
    info!("Extracting events for group {} ({})", group.id, group.name);

    let (url, opts) = fetch::detail_request(ctx.settings, &group.url)
        .map_err(|e| ExtractError::from_fetch(&group.url, e))?;
    let html = fetch_document(ctx, &url, &opts)?;
    store_events(ctx, &group, &html)
}

/// Same as `extract_events`, but over a page saved by hand instead of a fetch.
/// `source` names the markup's origin in errors and logs.
pub fn extract_events_from_markup(
    ctx: &RunContext,
    group_id: i64,
    source: &str,
    html: &str,
) -> Result<usize, ExtractError> {
    let group = ctx
        .store
        .group(group_id)?
        .ok_or(ExtractError::UnknownParent(group_id))?;
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument {
            url: source.to_string(),
        });
    }
    info!("Extracting events for group {} from {}", group.id, source);
    store_events(ctx, &group, html)
}

pub fn store_events(ctx: &RunContext, group: &GroupRow, html: &str) -> Result<usize, ExtractError> {
    let markers: Vec<Marker> = markers::scan(html, MarkerKind::Day).collect();
    let parent = Parent::new(&group.url, &group.name);
    let mut seen = HashSet::new();
    let mut inserted = 0;

    for rec in records::scan(html, RecordKind::Match, &ctx.origin) {
        let Some(heuristic) = resolve(&rec, &parent) else {
            debug!("Skipping {}: not part of {}", rec.path, parent.slug);
            continue;
        };
        if !seen.insert(rec.source_id.clone()) {
            continue;
        }
        debug!("Event {} accepted by {}", rec.source_id, heuristic);

        if ctx.store.find_event(group.id, &rec.source_id)?.is_some() {
            continue;
        }

        let event_date = preceding(&markers, rec.offset).map(|m| m.period.label());
        ctx.store.insert_event(&NewEvent {
            group_id: group.id,
            source_id: rec.source_id,
            title: rec.primary,
            url: rec.url,
            event_date,
        })?;
        inserted += 1;
    }

    info!("Stored {} new events for group {}", inserted, group.id);
    Ok(inserted)
}

/// Every stored group in id order, one at a time with a fixed delay between
/// fetches. A failing group contributes zero and does not stop the batch.
pub fn extract_all_events(ctx: &RunContext) -> Result<BatchSummary, ExtractError> {
    let ids = ctx.store.group_ids()?;
    let delay = ctx.settings.batch_delay();

    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} groups ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut total = 0;
    let mut processed = 0;
    for (i, id) in ids.iter().enumerate() {
        match extract_events(ctx, *id) {
            Ok(n) => total += n,
            Err(e) => warn!("Group {} failed: {}", id, e),
        }
        processed += 1;
        pb.inc(1);

        if i + 1 < ids.len() && !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    pb.finish_and_clear();

    let summary = BatchSummary {
        success: true,
        total_new_records: total,
        groups_processed: processed,
    };
    info!("{}", summary.message());
    Ok(summary)
}
