//! Count-bounded project enumeration.
//!
//! `api/components/search_projects` refuses to page past 10 000 results for a
//! single query. To enumerate every project of a language, the `ncloc` axis is
//! cut into half-open ranges each matching fewer than `cap` projects. Ranges
//! are found by bisecting a candidate upper bound against single-row count
//! queries, then every page of each range is fetched.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::client::SonarClient;
use crate::error::{Result, SonarError};
use crate::models::{Component, ComponentQuery, ProjectRecord};
use crate::traits::List;

/// Result cap of one search query.
pub const DEFAULT_CAP: u64 = 10_000;

/// Largest page size the search endpoint accepts.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// First candidate upper bound, and the start of the final unbounded range.
pub const DEFAULT_INITIAL_UPPER_BOUND: u64 = 100_000;

/// A half-open `ncloc` interval `[lower, upper)`; `upper == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub lower: u64,
    pub upper: Option<u64>,
}

impl Range {
    pub fn bounded(lower: u64, upper: u64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn unbounded(lower: u64) -> Self {
        Self { lower, upper: None }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "[{}, {})", self.lower, upper),
            None => write!(f, "[{}, inf)", self.lower),
        }
    }
}

/// A project search filter restricted to one language and `ncloc` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter<'a> {
    pub language: &'a str,
    pub range: Range,
}

impl fmt::Display for SearchFilter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "languages = {} and ncloc >= {}",
            self.language, self.range.lower
        )?;
        if let Some(upper) = self.range.upper {
            write!(f, " and ncloc < {upper}")?;
        }
        Ok(())
    }
}

impl From<&SearchFilter<'_>> for ComponentQuery {
    fn from(filter: &SearchFilter<'_>) -> Self {
        ComponentQuery::Filter(filter.to_string())
    }
}

/// One enumerated range and the total the API reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeReport {
    pub range: Range,
    pub total: u64,
}

impl RangeReport {
    /// Whether the range matched any project.
    pub fn found(&self) -> bool {
        self.total != 0
    }
}

/// Outcome of enumerating one language.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Projects keyed by `organization/key`.
    pub records: BTreeMap<String, ProjectRecord>,
    /// Every range queried, in order; the last one is unbounded.
    pub ranges: Vec<RangeReport>,
}

impl Enumeration {
    /// The enumerated projects, ordered by composite key.
    pub fn into_records(self) -> Vec<ProjectRecord> {
        self.records.into_values().collect()
    }
}

/// Enumerates every project of one language despite the per-query cap.
///
/// # Example
///
/// ```no_run
/// use sonarmine::{RangeEnumerator, SonarClient};
///
/// # async fn example() -> sonarmine::Result<()> {
/// let client = SonarClient::from_env()?;
/// let enumeration = RangeEnumerator::new(&client, "rust").run().await?;
/// println!("{} projects in {} ranges", enumeration.records.len(), enumeration.ranges.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RangeEnumerator<'a> {
    client: &'a SonarClient,
    language: String,
    cap: u64,
    page_size: u32,
    initial_upper_bound: u64,
}

impl<'a> RangeEnumerator<'a> {
    pub fn new(client: &'a SonarClient, language: &str) -> Self {
        Self {
            client,
            language: language.to_string(),
            cap: DEFAULT_CAP,
            page_size: DEFAULT_PAGE_SIZE,
            initial_upper_bound: DEFAULT_INITIAL_UPPER_BOUND,
        }
    }

    #[must_use]
    pub fn with_cap(mut self, cap: u64) -> Self {
        self.cap = cap;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_initial_upper_bound(mut self, upper: u64) -> Self {
        self.initial_upper_bound = upper;
        self
    }

    fn filter(&self, range: Range) -> SearchFilter<'_> {
        SearchFilter {
            language: &self.language,
            range,
        }
    }

    /// Number of projects matching `range`, from a single-row query.
    pub async fn count(&self, range: Range) -> Result<u64> {
        let query = ComponentQuery::from(&self.filter(range));
        let page = Component::list_page(self.client, &query, 1, 1).await?;
        Ok(page.total.unwrap_or(0))
    }

    /// Shrink `candidate` until `[lower, candidate)` matches fewer than `cap` projects.
    ///
    /// Each step halves the distance to `lower` (floor division).
    ///
    /// # Errors
    ///
    /// [`SonarError::BoundCollapse`] when a range one `ncloc` value wide still
    /// reaches the cap, since it cannot be split further.
    #[tracing::instrument(skip(self), fields(language = %self.language))]
    pub async fn find_upper_bound(&self, lower: u64, candidate: u64) -> Result<u64> {
        let mut upper = candidate;
        loop {
            let count = self.count(Range::bounded(lower, upper)).await?;
            if count < self.cap {
                return Ok(upper);
            }
            if upper <= lower + 1 {
                return Err(SonarError::BoundCollapse {
                    lower,
                    upper,
                    count,
                    cap: self.cap,
                });
            }
            tracing::debug!(lower, upper, count, "range over cap, bisecting");
            upper = (lower + upper) / 2;
        }
    }

    /// Fetch every page of `range` into `records`, last write winning on
    /// duplicate `organization/key`.
    ///
    /// Returns the total the API reported for the range; zero means the
    /// range matched nothing.
    #[tracing::instrument(skip(self, range, records), fields(language = %self.language, range = %range))]
    pub async fn enumerate_range(
        &self,
        range: Range,
        records: &mut BTreeMap<String, ProjectRecord>,
    ) -> Result<u64> {
        let query = ComponentQuery::from(&self.filter(range));
        let mut page_index: u32 = 1;

        loop {
            let page =
                Component::list_page(self.client, &query, page_index, self.page_size).await?;
            let total = page.total.unwrap_or(0);

            if page.is_empty() && total > 0 {
                tracing::debug!(page = page_index, total, "empty page, stopping");
                return Ok(total);
            }
            for component in &page.items {
                records.insert(component.full_name(), ProjectRecord::from(component));
            }

            let fetched = u64::from(self.page_size) * u64::from(page_index);
            if fetched > total {
                return Ok(total);
            }
            if fetched + u64::from(self.page_size) > self.cap {
                tracing::warn!(fetched, total, cap = self.cap, "result cap reached, stopping");
                return Ok(total);
            }
            page_index += 1;
        }
    }

    /// Enumerate the whole `ncloc` axis.
    ///
    /// Finite ranges are cut from `0` up to the initial upper bound; each is
    /// below the cap. A final unbounded range then drains everything at or
    /// above the last finite bound, and is never bisected.
    pub async fn run(&self) -> Result<Enumeration> {
        let mut enumeration = Enumeration::default();
        let mut lower = 0;

        while lower < self.initial_upper_bound {
            let upper = self
                .find_upper_bound(lower, self.initial_upper_bound)
                .await?;
            let range = Range::bounded(lower, upper);
            tracing::info!(language = %self.language, %range, "processing range");

            let total = self.enumerate_range(range, &mut enumeration.records).await?;
            if total == 0 {
                tracing::debug!(language = %self.language, %range, "range is empty");
            }
            enumeration.ranges.push(RangeReport { range, total });
            lower = upper;
        }

        let tail = Range::unbounded(lower);
        tracing::info!(language = %self.language, range = %tail, "processing unbounded range");
        let total = self.enumerate_range(tail, &mut enumeration.records).await?;
        if total >= self.cap {
            tracing::warn!(
                language = %self.language,
                total,
                cap = self.cap,
                "unbounded range exceeds the result cap; results may be incomplete"
            );
        }
        enumeration.ranges.push(RangeReport { range: tail, total });

        tracing::info!(
            language = %self.language,
            projects = enumeration.records.len(),
            ranges = enumeration.ranges.len(),
            "enumeration complete"
        );
        Ok(enumeration)
    }
}
