//! The field sizing engine.
//!
//! Drives the pipeline for a whole document: candidates are validated and
//! grouped by page, each page is rendered and sized on a worker thread, and
//! the per-page results are merged back in page order. Within a page the
//! fields are analyzed and solved in parallel (the raster is only read), then
//! the overlap resolver runs once over the whole page.

use itertools::Itertools;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{self, PixelSignal};
use crate::config::SizingConfig;
use crate::error::{Result, SizingError};
use crate::model::{FieldCandidate, Rejection, SizedField};
use crate::overlap::resolve_overlaps;
use crate::raster::{PageRaster, Rasterizer};
use crate::solver;

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Sized fields of one page, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct PageFields {
    pub page: u32,
    pub fields: Vec<SizedField>,
    /// Position of each field in the candidate list handed to the engine.
    pub input_indices: Vec<usize>,
}

impl PageFields {
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SizedField)> {
        self.input_indices.iter().copied().zip(self.fields.iter())
    }
}

/// A page that could not be sized. Its fields are not in the report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageFailure {
    pub page: u32,
    pub reason: String,
    /// Valid candidates on the page that were not sized.
    pub fields: usize,
}

/// Summary counters over a report.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SizingStats {
    pub total_fields: usize,
    pub avg_width: f64,
    pub avg_height: f64,
    pub degraded_fields: usize,
    pub adjusted_fields: usize,
    pub rejected_fields: usize,
}

/// Everything produced by one sizing run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SizingReport {
    /// Successfully sized pages, ascending by page number.
    pub pages: Vec<PageFields>,
    pub rejected: Vec<Rejection>,
    pub failed_pages: Vec<PageFailure>,
}

impl SizingReport {
    /// All sized fields, grouped by page.
    pub fn fields(&self) -> impl Iterator<Item = &SizedField> {
        self.pages.iter().flat_map(|p| p.fields.iter())
    }

    pub fn stats(&self) -> SizingStats {
        let mut stats = SizingStats {
            rejected_fields: self.rejected.len(),
            ..Default::default()
        };
        let (mut w, mut h) = (0.0, 0.0);
        for f in self.fields() {
            stats.total_fields += 1;
            w += f.bbox.width;
            h += f.bbox.height;
            if f.degraded() {
                stats.degraded_fields += 1;
            }
            if f.adjusted {
                stats.adjusted_fields += 1;
            }
        }
        if stats.total_fields > 0 {
            stats.avg_width = w / stats.total_fields as f64;
            stats.avg_height = h / stats.total_fields as f64;
        }
        stats
    }
}

/// Sizes field candidates against rendered pages.
#[derive(Clone, Debug)]
pub struct FieldSizer {
    config: SizingConfig,
}

impl FieldSizer {
    pub fn new(config: SizingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Splits candidates into those fit for sizing and rejections.
    ///
    /// Accepted candidates keep their position in `candidates`.
    pub fn validate(
        &self,
        candidates: Vec<FieldCandidate>,
        page_count: usize,
    ) -> (Vec<(usize, FieldCandidate)>, Vec<Rejection>) {
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();
        for (index, candidate) in candidates.into_iter().enumerate() {
            match candidate.validate(page_count) {
                Ok(()) => accepted.push((index, candidate)),
                Err(error) => {
                    tracing::warn!(index, label = %candidate.label, %error, "rejecting field");
                    rejected.push(Rejection {
                        index,
                        label: candidate.label,
                        page: candidate.page,
                        error,
                    });
                }
            }
        }
        (accepted, rejected)
    }

    /// Pixel analysis for one candidate.
    pub fn analyze(&self, raster: &PageRaster, candidate: &FieldCandidate) -> PixelSignal {
        analysis::analyze(raster, candidate, &self.config)
    }

    /// Raw box for one candidate, before overlap resolution.
    pub fn solve(
        &self,
        raster: &PageRaster,
        candidate: &FieldCandidate,
        signal: &PixelSignal,
    ) -> SizedField {
        solver::solve(raster, candidate, signal, &self.config)
    }

    /// Sizes every candidate of one page and resolves their overlaps.
    ///
    /// Candidates are assumed valid and on this page. Output order matches
    /// input order.
    pub fn size_page(&self, raster: &PageRaster, candidates: &[FieldCandidate]) -> Vec<SizedField> {
        let raw: Vec<SizedField> = candidates
            .par_iter()
            .map(|c| {
                let signal = self.analyze(raster, c);
                self.solve(raster, c, &signal)
            })
            .collect();
        resolve_overlaps(&raw, &self.config)
    }

    /// Sizes a whole document, one page per worker.
    ///
    /// Rejected candidates and pages that fail to render are reported in the
    /// result; neither affects the other pages. Fails only when the worker
    /// pool cannot be built.
    pub fn size_document<R>(
        &self,
        rasterizer: &R,
        candidates: Vec<FieldCandidate>,
    ) -> Result<SizingReport>
    where
        R: Rasterizer + ?Sized,
    {
        let page_count = rasterizer.page_count();
        let (accepted, rejected) = self.validate(candidates, page_count);

        let by_page: Vec<(u32, Vec<(usize, FieldCandidate)>)> = accepted
            .into_iter()
            .into_group_map_by(|(_, c)| c.page)
            .into_iter()
            .sorted_by_key(|(page, _)| *page)
            .collect();

        tracing::info!(
            pages = by_page.len(),
            fields = by_page.iter().map(|(_, f)| f.len()).sum::<usize>(),
            rejected = rejected.len(),
            "sizing document"
        );

        let thread_count = self.config.threads.unwrap_or_else(default_thread_count);
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .map_err(|e| SizingError::ThreadPool(e.to_string()))?;

        let mut results: Vec<(u32, std::result::Result<PageFields, PageFailure>)> =
            pool.install(|| {
                by_page
                    .into_par_iter()
                    .map(|(page, fields)| (page, self.run_page(rasterizer, page, fields)))
                    .collect()
            });
        results.sort_by_key(|(page, _)| *page);

        let mut report = SizingReport {
            rejected,
            ..Default::default()
        };
        for (_, result) in results {
            match result {
                Ok(page) => report.pages.push(page),
                Err(failure) => report.failed_pages.push(failure),
            }
        }

        let stats = report.stats();
        tracing::info!(
            sized = stats.total_fields,
            degraded = stats.degraded_fields,
            adjusted = stats.adjusted_fields,
            failed_pages = report.failed_pages.len(),
            "sizing finished"
        );
        Ok(report)
    }

    fn run_page<R>(
        &self,
        rasterizer: &R,
        page: u32,
        fields: Vec<(usize, FieldCandidate)>,
    ) -> std::result::Result<PageFields, PageFailure>
    where
        R: Rasterizer + ?Sized,
    {
        let raster = match rasterizer.render(page, self.config.dpi) {
            Ok(raster) => raster,
            Err(e) => {
                tracing::error!(page, "page not sized: {e}");
                return Err(PageFailure {
                    page,
                    reason: e.to_string(),
                    fields: fields.len(),
                });
            }
        };
        if raster.dpi() != self.config.dpi {
            tracing::warn!(
                page,
                raster_dpi = raster.dpi(),
                config_dpi = self.config.dpi,
                "raster resolution differs from configured dpi, using the raster's"
            );
        }

        let (input_indices, candidates): (Vec<usize>, Vec<FieldCandidate>) =
            fields.into_iter().unzip();
        tracing::debug!(page, fields = candidates.len(), "sizing page");
        let sized = self.size_page(&raster, &candidates);
        Ok(PageFields {
            page,
            fields: sized,
            input_indices,
        })
    }
}
