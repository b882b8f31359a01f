//! In-memory site store.
//!
//! Implements every data-source trait over plain maps. Used by tests and by
//! the binary when it is pointed at a JSON seed file instead of a live
//! platform database.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitestats_core::{
    AssocType, ConfigError, ContextScope, DateRange, Issue, IssueId, MetricRecord,
    MostReadRecord, PublicationStatus, SiteStatsError, SiteStatsResult, StorageError, Submission,
    SubmissionId, Tenant, TenantId,
};

use crate::sources::{IssueRepository, SubmissionRepository, TenantRegistry, UsageMetricsStore};

/// Serializable contents of an [`InMemorySiteStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDataSeed {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub metrics: Vec<MetricRecord>,
}

/// In-memory implementation of all site data sources.
#[derive(Debug, Default)]
pub struct InMemorySiteStore {
    tenants: RwLock<BTreeMap<TenantId, Tenant>>,
    submissions: RwLock<BTreeMap<SubmissionId, Submission>>,
    issues: RwLock<BTreeMap<IssueId, Issue>>,
    metrics: RwLock<Vec<MetricRecord>>,
    unavailable: AtomicBool,
    queries: AtomicU64,
}

impl InMemorySiteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled from a seed.
    pub fn from_seed(seed: SiteDataSeed) -> Self {
        let store = Self::new();
        if let Ok(mut tenants) = store.tenants.write() {
            tenants.extend(seed.tenants.into_iter().map(|t| (t.id, t)));
        }
        if let Ok(mut submissions) = store.submissions.write() {
            submissions.extend(seed.submissions.into_iter().map(|s| (s.id, s)));
        }
        if let Ok(mut issues) = store.issues.write() {
            issues.extend(seed.issues.into_iter().map(|i| (i.id, i)));
        }
        if let Ok(mut metrics) = store.metrics.write() {
            metrics.extend(seed.metrics);
        }
        store
    }

    /// Load a JSON seed file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SiteStatsResult<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| {
            SiteStatsError::Config(ConfigError::InvalidValue {
                field: "data_path".to_string(),
                value: path.display().to_string(),
                reason,
            })
        };
        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let seed: SiteDataSeed = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        Ok(Self::from_seed(seed))
    }

    pub fn insert_tenant(&self, tenant: Tenant) -> SiteStatsResult<()> {
        write_lock(&self.tenants)?.insert(tenant.id, tenant);
        Ok(())
    }

    pub fn insert_submission(&self, submission: Submission) -> SiteStatsResult<()> {
        write_lock(&self.submissions)?.insert(submission.id, submission);
        Ok(())
    }

    pub fn insert_issue(&self, issue: Issue) -> SiteStatsResult<()> {
        write_lock(&self.issues)?.insert(issue.id, issue);
        Ok(())
    }

    pub fn record_metric(&self, record: MetricRecord) -> SiteStatsResult<()> {
        write_lock(&self.metrics)?.push(record);
        Ok(())
    }

    /// Remove a submission, returning it if it existed.
    pub fn remove_submission(&self, id: SubmissionId) -> SiteStatsResult<Option<Submission>> {
        Ok(write_lock(&self.submissions)?.remove(&id))
    }

    /// Change the current publication status of a submission.
    pub fn set_publication_status(
        &self,
        id: SubmissionId,
        status: PublicationStatus,
    ) -> SiteStatsResult<bool> {
        let mut submissions = write_lock(&self.submissions)?;
        Ok(match submissions.get_mut(&id) {
            Some(submission) => {
                submission.current_publication.status = status;
                true
            }
            None => false,
        })
    }

    /// Make every query fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries served (or refused) so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn begin_query(&self, source_name: &str) -> SiteStatsResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SiteStatsError::unavailable(source_name, "store marked unavailable"));
        }
        Ok(())
    }

    fn matching_metrics(
        &self,
        range: DateRange,
        assoc_type: AssocType,
        scope: ContextScope,
    ) -> SiteStatsResult<Vec<MetricRecord>> {
        Ok(read_lock(&self.metrics)?
            .iter()
            .filter(|r| {
                r.assoc_type == assoc_type && range.contains(r.date) && scope.includes(r.context_id)
            })
            .cloned()
            .collect())
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> SiteStatsResult<std::sync::RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| SiteStatsError::Storage(StorageError::LockPoisoned))
}

fn write_lock<T>(lock: &RwLock<T>) -> SiteStatsResult<std::sync::RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| SiteStatsError::Storage(StorageError::LockPoisoned))
}

#[async_trait]
impl TenantRegistry for InMemorySiteStore {
    async fn list_enabled(&self) -> SiteStatsResult<Vec<Tenant>> {
        self.begin_query("tenants")?;
        Ok(read_lock(&self.tenants)?
            .values()
            .filter(|t| t.enabled)
            .cloned()
            .collect())
    }

    async fn get(&self, id: TenantId) -> SiteStatsResult<Option<Tenant>> {
        self.begin_query("tenants")?;
        Ok(read_lock(&self.tenants)?.get(&id).cloned())
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySiteStore {
    async fn count(&self, status: PublicationStatus, scope: ContextScope) -> SiteStatsResult<u64> {
        self.begin_query("submissions")?;
        Ok(read_lock(&self.submissions)?
            .values()
            .filter(|s| s.status == status && scope.includes(s.context_id))
            .count() as u64)
    }

    async fn get(&self, id: SubmissionId) -> SiteStatsResult<Option<Submission>> {
        self.begin_query("submissions")?;
        Ok(read_lock(&self.submissions)?.get(&id).cloned())
    }
}

#[async_trait]
impl IssueRepository for InMemorySiteStore {
    async fn count(&self, published: bool, scope: ContextScope) -> SiteStatsResult<u64> {
        self.begin_query("issues")?;
        Ok(read_lock(&self.issues)?
            .values()
            .filter(|i| i.published == published && scope.includes(i.context_id))
            .count() as u64)
    }
}

#[async_trait]
impl UsageMetricsStore for InMemorySiteStore {
    async fn sum(
        &self,
        range: DateRange,
        assoc_type: AssocType,
        scope: ContextScope,
    ) -> SiteStatsResult<u64> {
        self.begin_query("usage_metrics")?;
        Ok(self
            .matching_metrics(range, assoc_type, scope)?
            .iter()
            .map(|r| r.metric)
            .sum())
    }

    async fn top_submissions(
        &self,
        limit: usize,
        range: DateRange,
        assoc_type: AssocType,
        scope: ContextScope,
    ) -> SiteStatsResult<Vec<MostReadRecord>> {
        self.begin_query("usage_metrics")?;

        // Totals keep first-seen order so equal totals rank in store order.
        let mut positions: HashMap<SubmissionId, usize> = HashMap::new();
        let mut totals: Vec<MostReadRecord> = Vec::new();
        for record in self.matching_metrics(range, assoc_type, scope)? {
            match positions.get(&record.submission_id) {
                Some(&index) => totals[index].metric += record.metric,
                None => {
                    positions.insert(record.submission_id, totals.len());
                    totals.push(MostReadRecord::new(record.submission_id, record.metric));
                }
            }
        }

        totals.sort_by(|a, b| b.metric.cmp(&a.metric));
        totals.truncate(limit);
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sitestats_core::{LocalizedText, Publication};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn tenant(id: TenantId, enabled: bool) -> Tenant {
        Tenant {
            id,
            path: format!("t{}", id),
            name: LocalizedText::single("en", format!("Tenant {}", id)),
            enabled,
            primary_locale: "en".to_string(),
        }
    }

    fn submission(id: SubmissionId, context_id: TenantId, status: PublicationStatus) -> Submission {
        Submission {
            id,
            context_id,
            status,
            current_publication: Publication {
                status,
                full_title: LocalizedText::single("en", format!("Submission {}", id)),
                url_path: None,
                locale: "en".to_string(),
            },
        }
    }

    fn download(submission_id: SubmissionId, context_id: TenantId, date: NaiveDate, metric: u64) -> MetricRecord {
        MetricRecord {
            submission_id,
            context_id,
            assoc_type: AssocType::SubmissionFile,
            date,
            metric,
        }
    }

    #[tokio::test]
    async fn test_counts_filter_by_status_and_scope() {
        let store = InMemorySiteStore::new();
        store.insert_tenant(tenant(1, true)).unwrap();
        store.insert_tenant(tenant(2, false)).unwrap();
        store.insert_submission(submission(10, 1, PublicationStatus::Published)).unwrap();
        store.insert_submission(submission(11, 2, PublicationStatus::Published)).unwrap();
        store.insert_submission(submission(12, 1, PublicationStatus::Queued)).unwrap();
        store.insert_issue(Issue { id: 1, context_id: 1, published: true }).unwrap();
        store.insert_issue(Issue { id: 2, context_id: 2, published: false }).unwrap();

        assert_eq!(TenantRegistry::list_enabled(&store).await.unwrap().len(), 1);
        assert_eq!(
            SubmissionRepository::count(&store, PublicationStatus::Published, ContextScope::All)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            SubmissionRepository::count(&store, PublicationStatus::Published, ContextScope::Tenant(1))
                .await
                .unwrap(),
            1
        );
        assert_eq!(IssueRepository::count(&store, true, ContextScope::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sum_respects_range_and_assoc_type() {
        let store = InMemorySiteStore::new();
        store.record_metric(download(1, 1, day(1), 5)).unwrap();
        store.record_metric(download(1, 1, day(10), 7)).unwrap();
        store
            .record_metric(MetricRecord {
                assoc_type: AssocType::Submission,
                ..download(1, 1, day(2), 100)
            })
            .unwrap();

        let sum = store
            .sum(DateRange::new(day(1), day(5)), AssocType::SubmissionFile, ContextScope::All)
            .await
            .unwrap();
        assert_eq!(sum, 5);
    }

    #[tokio::test]
    async fn test_top_submissions_aggregates_and_ranks() {
        let store = InMemorySiteStore::new();
        store.record_metric(download(1, 1, day(1), 10)).unwrap();
        store.record_metric(download(2, 1, day(1), 30)).unwrap();
        store.record_metric(download(1, 2, day(2), 25)).unwrap();
        store.record_metric(download(3, 2, day(3), 35)).unwrap();

        let top = store
            .top_submissions(2, DateRange::new(day(1), day(31)), AssocType::SubmissionFile, ContextScope::All)
            .await
            .unwrap();

        assert_eq!(top, vec![MostReadRecord::new(1, 35), MostReadRecord::new(3, 35)]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_queries() {
        let store = InMemorySiteStore::new();
        store.set_unavailable(true);

        let err = TenantRegistry::list_enabled(&store).await.unwrap_err();
        assert!(matches!(err, SiteStatsError::Storage(StorageError::Unavailable { .. })));
        assert_eq!(store.query_count(), 1);

        store.set_unavailable(false);
        assert!(TenantRegistry::list_enabled(&store).await.is_ok());
    }

    #[tokio::test]
    async fn test_set_publication_status_and_remove() {
        let store = InMemorySiteStore::new();
        store.insert_submission(submission(5, 1, PublicationStatus::Published)).unwrap();

        assert!(store.set_publication_status(5, PublicationStatus::Queued).unwrap());
        let fetched = SubmissionRepository::get(&store, 5).await.unwrap().unwrap();
        assert_eq!(fetched.current_publication_status(), PublicationStatus::Queued);

        assert!(store.remove_submission(5).unwrap().is_some());
        assert!(!store.set_publication_status(5, PublicationStatus::Published).unwrap());
        assert!(SubmissionRepository::get(&store, 5).await.unwrap().is_none());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.json");
        let seed = SiteDataSeed {
            tenants: vec![tenant(1, true)],
            submissions: vec![submission(1, 1, PublicationStatus::Published)],
            issues: vec![],
            metrics: vec![download(1, 1, day(1), 3)],
        };
        std::fs::write(&path, serde_json::to_string(&seed).unwrap()).unwrap();

        let store = InMemorySiteStore::from_json_file(&path).unwrap();
        assert_eq!(store.tenants.read().unwrap().len(), 1);
        assert_eq!(store.metrics.read().unwrap().len(), 1);

        let missing = InMemorySiteStore::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(SiteStatsError::Config(_))));
    }
}
