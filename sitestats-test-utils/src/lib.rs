//! SiteStats Test Utilities
//!
//! Shared test infrastructure for the SiteStats workspace:
//! - Scripted data sources and populators
//! - Proptest generators for entity types
//! - Fixtures for the standard statistics scenario
//! - Assertions for rankings and error variants

// Re-export the in-memory store from its source crate
pub use sitestats_storage::{DataSources, InMemorySiteStore, SiteDataSeed};

// Re-export core types for convenience
pub use sitestats_core::{
    AssocType, Clock, ContextScope, DateRange, Issue, LocalizedText, ManualClock, MetricRecord,
    MostReadRecord, Publication, PublicationStatus, SiteStatsError, SiteStatsResult,
    StatisticsConfig, StatisticsSnapshot, StorageError, Submission, SubmissionId, Tenant,
    TenantId,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sitestats_storage::{Populate, UsageMetricsStore};

// ============================================================================
// SCRIPTED COLLABORATORS
// ============================================================================

/// Usage-metrics store that answers every query with a fixed script.
///
/// Unlike [`InMemorySiteStore`], the ranking is returned verbatim, so it
/// can contain repeated submission ids or arrive unsorted.
#[derive(Debug, Default)]
pub struct ScriptedUsageMetrics {
    total: u64,
    ranking: Vec<MostReadRecord>,
    queries: Mutex<Vec<DateRange>>,
}

impl ScriptedUsageMetrics {
    pub fn new(total: u64, ranking: Vec<MostReadRecord>) -> Self {
        Self {
            total,
            ranking,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Ranges passed to `top_submissions`, in call order.
    pub fn ranking_queries(&self) -> Vec<DateRange> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl UsageMetricsStore for ScriptedUsageMetrics {
    async fn sum(&self, _: DateRange, _: AssocType, _: ContextScope) -> SiteStatsResult<u64> {
        Ok(self.total)
    }

    async fn top_submissions(
        &self,
        _limit: usize,
        range: DateRange,
        _: AssocType,
        _: ContextScope,
    ) -> SiteStatsResult<Vec<MostReadRecord>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(range);
        }
        Ok(self.ranking.clone())
    }
}

/// Populator that counts its calls and can be told to fail or stall.
///
/// Each successful call returns a snapshot whose `all_time_downloads` is
/// the call number, so tests can tell populations apart.
#[derive(Debug, Default)]
pub struct CountingPopulator {
    calls: AtomicU64,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl CountingPopulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every population.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Populate<StatisticsSnapshot> for CountingPopulator {
    async fn populate(&self) -> SiteStatsResult<StatisticsSnapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SiteStatsError::unavailable("usage_metrics", "scripted failure"));
        }
        Ok(StatisticsSnapshot {
            all_time_downloads: call,
            ..Default::default()
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating SiteStats entity types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_publication_status() -> impl Strategy<Value = PublicationStatus> {
        prop_oneof![
            Just(PublicationStatus::Queued),
            Just(PublicationStatus::Scheduled),
            Just(PublicationStatus::Published),
            Just(PublicationStatus::Declined),
        ]
    }

    /// Text with an English value and optionally a French one.
    pub fn arb_localized_text() -> impl Strategy<Value = LocalizedText> {
        ("[A-Z][a-z]{2,12}( [a-z]{2,8}){0,3}", proptest::option::of("[A-Z][a-z]{2,12}")).prop_map(
            |(en, fr)| {
                let text = LocalizedText::single("en", en);
                match fr {
                    Some(fr) => text.with("fr_CA", fr),
                    None => text,
                }
            },
        )
    }

    pub fn arb_tenant(id: TenantId) -> impl Strategy<Value = Tenant> {
        ("[a-z]{2,10}", arb_localized_text(), any::<bool>()).prop_map(
            move |(path, name, enabled)| Tenant {
                id,
                path,
                name,
                enabled,
                primary_locale: "en".to_string(),
            },
        )
    }

    pub fn arb_submission(id: SubmissionId, context_id: TenantId) -> impl Strategy<Value = Submission> {
        (
            arb_publication_status(),
            arb_localized_text(),
            proptest::option::of("[a-z][a-z0-9-]{0,20}"),
        )
            .prop_map(move |(status, full_title, url_path)| Submission {
                id,
                context_id,
                status,
                current_publication: Publication {
                    status,
                    full_title,
                    url_path,
                    locale: "en".to_string(),
                },
            })
    }

    /// Raw ranking rows as a metrics store might return them: unsorted,
    /// with repeats and zero metrics.
    pub fn arb_most_read_records(max_len: usize) -> impl Strategy<Value = Vec<MostReadRecord>> {
        prop::collection::vec(
            (1i64..50, 0u64..10_000).prop_map(|(id, metric)| MostReadRecord::new(id, metric)),
            0..max_len,
        )
    }

    pub fn arb_snapshot() -> impl Strategy<Value = StatisticsSnapshot> {
        (
            0u64..1_000,
            0u64..10_000,
            0u64..100_000,
            any::<u32>(),
            arb_most_read_records(10),
            arb_most_read_records(10),
        )
            .prop_map(
                |(journals, issues, submissions, downloads, all_time, last_month)| {
                    StatisticsSnapshot {
                        journal_count: journals,
                        issue_count: issues,
                        submission_count: submissions,
                        all_time_downloads: u64::from(downloads),
                        all_time_most_read: all_time,
                        last_month_most_read: last_month,
                    }
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for the standard statistics scenario.
    //!
    //! Three enabled tenants, five published submissions, two published
    //! issues, 1000 downloads, and the ranking `[(1, 500), (2, 300), (1, 200)]`
    //! for both windows.

    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    pub const SCENARIO_DOWNLOADS: u64 = 1000;

    pub fn scenario_ranking() -> Vec<MostReadRecord> {
        vec![
            MostReadRecord::new(1, 500),
            MostReadRecord::new(2, 300),
            MostReadRecord::new(1, 200),
        ]
    }

    /// The instant "now" in every scenario test.
    pub fn scenario_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn scenario_clock() -> ManualClock {
        ManualClock::new(scenario_now())
    }

    pub fn tenant(id: TenantId, path: &str, name: &str) -> Tenant {
        Tenant {
            id,
            path: path.to_string(),
            name: LocalizedText::single("en", name),
            enabled: true,
            primary_locale: "en".to_string(),
        }
    }

    pub fn published_submission(id: SubmissionId, context_id: TenantId, title: &str) -> Submission {
        Submission {
            id,
            context_id,
            status: PublicationStatus::Published,
            current_publication: Publication {
                status: PublicationStatus::Published,
                full_title: LocalizedText::single("en", title),
                url_path: None,
                locale: "en".to_string(),
            },
        }
    }

    pub fn scenario_seed() -> SiteDataSeed {
        SiteDataSeed {
            tenants: vec![
                tenant(1, "jbio", "Journal of Biology"),
                tenant(2, "jchem", "Journal of Chemistry"),
                tenant(3, "jphys", "Journal of Physics"),
            ],
            submissions: vec![
                published_submission(1, 1, "Cell Walls Revisited"),
                published_submission(2, 2, "Catalysts at Scale"),
                published_submission(3, 3, "Quantum Dots"),
                published_submission(4, 1, "Mitochondria"),
                published_submission(5, 2, "Polymers"),
            ],
            issues: vec![
                Issue {
                    id: 1,
                    context_id: 1,
                    published: true,
                },
                Issue {
                    id: 2,
                    context_id: 2,
                    published: true,
                },
            ],
            metrics: Vec::new(),
        }
    }

    /// Store holding the scenario tenants, submissions and issues.
    pub fn scenario_store() -> Arc<InMemorySiteStore> {
        Arc::new(InMemorySiteStore::from_seed(scenario_seed()))
    }

    /// Data sources over `store` with the scripted scenario metrics.
    pub fn scenario_sources(store: Arc<InMemorySiteStore>) -> DataSources {
        DataSources::from_store(store).with_metrics(Arc::new(ScriptedUsageMetrics::new(
            SCENARIO_DOWNLOADS,
            scenario_ranking(),
        )))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for SiteStats-specific validation.

    use super::*;

    /// Assert that a ranking is sorted by metric, highest first, and holds
    /// at most `limit` rows.
    #[track_caller]
    pub fn assert_ranking(records: &[MostReadRecord], limit: usize) {
        assert!(
            records.len() <= limit,
            "Ranking has {} rows, limit is {}",
            records.len(),
            limit
        );
        assert!(
            records.windows(2).all(|w| w[0].metric >= w[1].metric),
            "Ranking is not sorted descending: {:?}",
            records
        );
    }

    /// Assert that a result is a storage-unavailable error.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &SiteStatsResult<T>) {
        match result {
            Err(SiteStatsError::Storage(StorageError::Unavailable { .. })) => {}
            other => panic!("Expected Unavailable error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sitestats_storage::{IssueRepository, SubmissionRepository, TenantRegistry};

    #[tokio::test]
    async fn test_scenario_store_counts() {
        let store = fixtures::scenario_store();

        assert_eq!(TenantRegistry::list_enabled(&*store).await.unwrap().len(), 3);
        assert_eq!(
            SubmissionRepository::count(&*store, PublicationStatus::Published, ContextScope::All)
                .await
                .unwrap(),
            5
        );
        assert_eq!(
            IssueRepository::count(&*store, true, ContextScope::All)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_scripted_metrics_records_queries() {
        let metrics = ScriptedUsageMetrics::new(7, fixtures::scenario_ranking());
        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );

        let rows = metrics
            .top_submissions(10, range, AssocType::SubmissionFile, ContextScope::All)
            .await
            .unwrap();

        assert_eq!(rows, fixtures::scenario_ranking());
        assert_eq!(metrics.ranking_queries(), vec![range]);
        assert_eq!(
            metrics
                .sum(range, AssocType::SubmissionFile, ContextScope::All)
                .await
                .unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn test_counting_populator() {
        let populator = CountingPopulator::new();

        assert_eq!(populator.populate().await.unwrap().all_time_downloads, 1);
        populator.set_failing(true);
        assertions::assert_unavailable(&populator.populate().await);
        assert_eq!(populator.calls(), 2);
    }

    #[test]
    #[should_panic(expected = "not sorted")]
    fn test_assert_ranking_rejects_unsorted() {
        assertions::assert_ranking(&[MostReadRecord::new(1, 1), MostReadRecord::new(2, 9)], 10);
    }

    proptest! {
        #[test]
        fn prop_generated_submission_keeps_ids(submission in generators::arb_submission(9, 3)) {
            prop_assert_eq!(submission.id, 9);
            prop_assert_eq!(submission.context_id, 3);
            prop_assert_eq!(submission.status, submission.current_publication.status);
        }

        #[test]
        fn prop_generated_tenant_has_name(tenant in generators::arb_tenant(4)) {
            prop_assert!(tenant.localized_name("en").is_some());
        }
    }
}
