//! SiteStats Core - Entity Types
//!
//! Pure data structures shared by every other crate in the workspace:
//! tenants, submissions, issues, usage-metric rows and the cached
//! statistics snapshot. Behavior lives in `sitestats-storage` and
//! `sitestats-api`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StatisticsConfig;
pub use error::{
    AggregationError, ConfigError, RenderError, SiteStatsError, SiteStatsResult, StorageError,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Identifier of a tenant (a journal in the hosting platform).
pub type TenantId = i64;

/// Identifier of a submission.
pub type SubmissionId = i64;

/// Identifier of an issue.
pub type IssueId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Name of the single cache entry holding the site statistics snapshot.
pub const STATISTICS_CACHE_NAME: &str = "siteStatistics";

/// First date for which usage metrics are ever recorded.
pub fn statistics_earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2001, 1, 1).unwrap_or(NaiveDate::MIN)
}

// ============================================================================
// LOCALIZED TEXT
// ============================================================================

/// A piece of text with one value per locale (e.g. `en`, `fr_CA`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-locale convenience constructor.
    pub fn single(locale: impl Into<String>, value: impl Into<String>) -> Self {
        let mut text = Self::new();
        text.insert(locale, value);
        text
    }

    pub fn with(mut self, locale: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(locale, value);
        self
    }

    pub fn insert(&mut self, locale: impl Into<String>, value: impl Into<String>) {
        self.0.insert(locale.into(), value.into());
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0
            .get(locale)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Resolve the text for `locale`, falling back to `fallback_locale` and
    /// then to any non-empty translation.
    pub fn localized(&self, locale: &str, fallback_locale: &str) -> Option<&str> {
        self.get(locale)
            .or_else(|| self.get(fallback_locale))
            .or_else(|| self.0.values().map(String::as_str).find(|v| !v.is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|value| value.is_empty())
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Lifecycle status of a submission or of one of its publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    Queued,
    Scheduled,
    Published,
    Declined,
}

impl PublicationStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Category of a usage-metric event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssocType {
    /// Download of a submission file (galley). Counted as a download.
    SubmissionFile,
    /// Abstract page view.
    Submission,
    /// Issue table-of-contents view.
    Issue,
    /// Download of an issue galley.
    IssueGalley,
}

/// Which tenants a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextScope {
    /// Every tenant on the site.
    All,
    /// A single tenant.
    Tenant(TenantId),
}

impl ContextScope {
    pub fn includes(&self, tenant_id: TenantId) -> bool {
        match self {
            Self::All => true,
            Self::Tenant(id) => *id == tenant_id,
        }
    }
}

// ============================================================================
// DATE RANGE
// ============================================================================

/// Inclusive calendar date range. Empty when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A publishing venue hosted on the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    /// URL path segment of the tenant (e.g. `jbio`).
    pub path: String,
    pub name: LocalizedText,
    pub enabled: bool,
    pub primary_locale: String,
}

impl Tenant {
    pub fn localized_name(&self, locale: &str) -> Option<&str> {
        self.name.localized(locale, &self.primary_locale)
    }
}

/// The current publication (version) of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub status: PublicationStatus,
    /// Full title including prefix and subtitle.
    pub full_title: LocalizedText,
    /// Optional human-friendly URL path overriding the numeric id.
    #[serde(default)]
    pub url_path: Option<String>,
    pub locale: String,
}

/// A unit of published work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    /// Owning tenant.
    pub context_id: TenantId,
    pub status: PublicationStatus,
    pub current_publication: Publication,
}

impl Submission {
    /// Status of the current publication, which can differ from the
    /// submission status after an unpublish.
    pub fn current_publication_status(&self) -> PublicationStatus {
        self.current_publication.status
    }

    pub fn localized_full_title(&self, locale: &str) -> Option<&str> {
        self.current_publication
            .full_title
            .localized(locale, &self.current_publication.locale)
    }

    /// URL path when one is set, otherwise the numeric id.
    pub fn best_id(&self) -> String {
        match self.current_publication.url_path.as_deref() {
            Some(path) if !path.trim().is_empty() => path.to_string(),
            _ => self.id.to_string(),
        }
    }
}

/// A grouping/release unit of submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub context_id: TenantId,
    pub published: bool,
}

/// One usage-metric row as recorded by the statistics pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub submission_id: SubmissionId,
    pub context_id: TenantId,
    pub assoc_type: AssocType,
    pub date: NaiveDate,
    pub metric: u64,
}

// ============================================================================
// STATISTICS SNAPSHOT
// ============================================================================

/// One row of a "most read" ranking as stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MostReadRecord {
    pub submission_id: SubmissionId,
    pub metric: u64,
}

impl MostReadRecord {
    pub fn new(submission_id: SubmissionId, metric: u64) -> Self {
        Self {
            submission_id,
            metric,
        }
    }
}

/// The cached aggregate. Every field is produced by the same refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub journal_count: u64,
    pub issue_count: u64,
    pub submission_count: u64,
    pub all_time_downloads: u64,
    pub all_time_most_read: Vec<MostReadRecord>,
    pub last_month_most_read: Vec<MostReadRecord>,
}

/// A "most read" row prepared for display. Request-scoped, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostReadEntry {
    pub url: String,
    /// Localized full title of the submission.
    pub title: String,
    /// Localized name of the owning tenant.
    pub tenant_name: String,
    pub metric: u64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_submission(url_path: Option<&str>) -> Submission {
        Submission {
            id: 42,
            context_id: 1,
            status: PublicationStatus::Published,
            current_publication: Publication {
                status: PublicationStatus::Published,
                full_title: LocalizedText::single("en", "On Caches").with("fr_CA", "Des caches"),
                url_path: url_path.map(str::to_string),
                locale: "en".to_string(),
            },
        }
    }

    #[test]
    fn test_localized_text_fallback_order() {
        let text = LocalizedText::single("en", "Journal").with("de", "");

        assert_eq!(text.localized("en", "en"), Some("Journal"));
        assert_eq!(text.localized("de", "en"), Some("Journal"));
        assert_eq!(text.localized("fr_CA", "es"), Some("Journal"));
        assert_eq!(LocalizedText::new().localized("en", "en"), None);
    }

    #[test]
    fn test_best_id_prefers_url_path() {
        assert_eq!(make_submission(Some("on-caches")).best_id(), "on-caches");
        assert_eq!(make_submission(Some("  ")).best_id(), "42");
        assert_eq!(make_submission(None).best_id(), "42");
    }

    #[test]
    fn test_localized_full_title() {
        let submission = make_submission(None);
        assert_eq!(submission.localized_full_title("fr_CA"), Some("Des caches"));
        assert_eq!(submission.localized_full_title("it"), Some("On Caches"));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let range = DateRange::new(start, end);

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end.succ_opt().unwrap()));
        assert!(!range.is_empty());
        assert!(DateRange::new(end, start).is_empty());
    }

    #[test]
    fn test_context_scope_includes() {
        assert!(ContextScope::All.includes(7));
        assert!(ContextScope::Tenant(7).includes(7));
        assert!(!ContextScope::Tenant(7).includes(8));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = StatisticsSnapshot {
            journal_count: 3,
            all_time_most_read: vec![MostReadRecord::new(1, 500)],
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["journalCount"], 3);
        assert_eq!(json["allTimeMostRead"][0]["submissionId"], 1);
        assert_eq!(json["allTimeMostRead"][0]["metric"], 500);
    }

    #[test]
    fn test_earliest_date() {
        assert_eq!(statistics_earliest_date().to_string(), "2001-01-01");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn day(offset: i64) -> NaiveDate {
            statistics_earliest_date() + chrono::Duration::days(offset)
        }

        proptest! {
            #[test]
            fn prop_range_contains_iff_between(a in 0i64..2000, b in 0i64..2000, d in 0i64..2000) {
                let range = DateRange::new(day(a), day(b));
                prop_assert_eq!(range.contains(day(d)), a <= d && d <= b);
                prop_assert_eq!(range.is_empty(), a > b);
            }
        }
    }
}
