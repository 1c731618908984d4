//! Run orchestration: probe candidate URLs, commit to the first live listing
//! page, extract and paginate until exhaustion or the page cap.
//!
//! The engine never performs I/O itself; it decides which URL to fetch next
//! through the [`Fetcher`] seam and what to emit through the pipeline. All
//! per-record and per-page problems are absorbed locally; only boundary
//! input errors escalate to the caller.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dates;
use crate::error::{Result, RevcrawlError};
use crate::extract;
use crate::paginate;
use crate::pipeline::Pipeline;
use crate::sources::{self, SiteAdapter};
use crate::types::{ExtractionContext, FetchRequest, FetchResponse, ReviewRecord, RunRequest};
use crate::urls;

/// Async fetch seam. Retries, pacing and the rendering proxy all live
/// behind this trait.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Client-side render wait passed to the rendering proxy.
    pub render_wait_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            render_wait_ms: 4_000,
        }
    }
}

pub struct Engine<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub opts: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, opts: EngineOptions) -> Self {
        Self { fetcher, opts }
    }

    /// Validate caller input into per-run state. Fails before any fetch when
    /// the date window is inverted; date strings may use any format the
    /// normalizer accepts and come out canonical.
    pub fn context_for(req: &RunRequest) -> Result<ExtractionContext> {
        let now = Utc::now();
        let start = req
            .start_date
            .as_deref()
            .and_then(|s| dates::normalize(s, now));
        let end = req.end_date.as_deref().and_then(|s| dates::normalize(s, now));
        if let (Some(s), Some(e)) = (&start, &end) {
            if s > e {
                return Err(RevcrawlError::InvalidDateRange {
                    start: s.clone(),
                    end: e.clone(),
                });
            }
        }
        Ok(ExtractionContext {
            source: req.source,
            company_name: req.company_name.clone(),
            start_date: start,
            end_date: end,
            max_pages: req.max_pages,
            page: 1,
        })
    }

    /// Execute one source-run to completion. An unreachable target is not an
    /// error: the run ends with zero records and a warning.
    pub async fn run(&self, req: &RunRequest) -> Result<Vec<ReviewRecord>> {
        let ctx = Self::context_for(req)?;
        Ok(self.run_with(req, ctx).await)
    }

    /// As [`Self::run`] for callers that already hold a validated context,
    /// so validation happens exactly once per invocation.
    pub async fn run_with(&self, req: &RunRequest, mut ctx: ExtractionContext) -> Vec<ReviewRecord> {
        let adapter = sources::adapter_for(ctx.source);
        let candidates = adapter.candidates(req);
        let mut pipeline = Pipeline::new();

        let records = self
            .probe_candidates(adapter, &mut ctx, &candidates, &mut pipeline)
            .await;
        info!(
            source = %ctx.source,
            company = %ctx.company_name,
            emitted = records.len(),
            dropped_incomplete = pipeline.dropped_incomplete,
            dropped_duplicates = pipeline.dropped_duplicates,
            "run finished"
        );
        records
    }

    /// Two-phase probe: the detection chain validates each candidate on the
    /// same response extraction will use. Probing commits to the first
    /// candidate that matches and never revisits the list.
    async fn probe_candidates(
        &self,
        adapter: &dyn SiteAdapter,
        ctx: &mut ExtractionContext,
        candidates: &[String],
        pipeline: &mut Pipeline,
    ) -> Vec<ReviewRecord> {
        let total = candidates.len();
        for (idx, candidate) in candidates.iter().enumerate() {
            let url = urls::ensure_page_param(candidate);
            info!(source = %ctx.source, candidate = idx + 1, total, url = %url, "probing candidate");

            let resp = match self.fetch_page(&url).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(error = %e, url = %url, "candidate fetch failed, advancing");
                    continue;
                }
            };
            if resp.is_error() {
                info!(status = resp.status, url = %url, "candidate returned error status, advancing");
                continue;
            }
            if extract::page_matches(&resp.body, adapter.profile().detection) {
                info!(url = %resp.url, "review content detected, extracting");
                return self.extract_pages(adapter, ctx, resp, pipeline).await;
            }
            debug!(url = %url, "no review content detected");
        }

        warn!(
            source = %ctx.source,
            company = %ctx.company_name,
            candidates = ?candidates,
            "no working reviews listing found"
        );
        Vec::new()
    }

    async fn extract_pages(
        &self,
        adapter: &dyn SiteAdapter,
        ctx: &mut ExtractionContext,
        first: FetchResponse,
        pipeline: &mut Pipeline,
    ) -> Vec<ReviewRecord> {
        let profile = adapter.profile();
        let mut out = Vec::new();
        let mut resp = first;

        loop {
            let page = extract::extract_reviews(&resp.body, profile, ctx);
            info!(
                page = ctx.page,
                cards = page.cards_seen,
                in_window = page.raws.len(),
                url = %resp.url,
                "page extracted"
            );
            for raw in page.raws {
                if let Some(record) = pipeline.process(raw) {
                    out.push(record);
                }
            }

            if page.cards_seen == 0 {
                debug!(url = %resp.url, "no review cards located, stopping pagination");
                break;
            }
            if let Some(cap) = ctx.max_pages {
                if ctx.page >= cap {
                    debug!(page = ctx.page, cap, "page cap reached");
                    break;
                }
            }
            let Some(next) = paginate::next_page_url(&resp.url, &resp.body, profile.next_page)
            else {
                break;
            };
            let next = urls::ensure_render_flag(&next);
            ctx.page += 1;

            resp = match self.fetch_page(&next).await {
                Ok(r) if !r.is_error() => r,
                Ok(r) => {
                    info!(status = r.status, url = %next, "pagination ended on error status");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, url = %next, "pagination fetch failed");
                    break;
                }
            };
        }
        out
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchResponse> {
        self.fetcher
            .fetch(&FetchRequest {
                url: url.to_string(),
                render_js: true,
                wait_ms: self.opts.render_wait_ms,
            })
            .await
    }
}
