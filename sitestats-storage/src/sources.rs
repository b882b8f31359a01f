//! Data-source traits consumed by the aggregation and the page handler.
//!
//! Each trait covers one collaborator of the hosting platform. They are
//! deliberately narrow: only the queries the statistics page needs.

use std::sync::Arc;

use async_trait::async_trait;
use sitestats_core::{
    AssocType, ContextScope, DateRange, MostReadRecord, PublicationStatus, SiteStatsResult,
    Submission, SubmissionId, Tenant, TenantId,
};

/// Registry of tenants hosted on the site.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// All enabled tenants.
    async fn list_enabled(&self) -> SiteStatsResult<Vec<Tenant>>;

    /// Look up a tenant by id, enabled or not.
    async fn get(&self, id: TenantId) -> SiteStatsResult<Option<Tenant>>;
}

/// Submission repository.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Number of submissions with the given status within `scope`.
    async fn count(&self, status: PublicationStatus, scope: ContextScope) -> SiteStatsResult<u64>;

    /// Get a submission by id.
    async fn get(&self, id: SubmissionId) -> SiteStatsResult<Option<Submission>>;
}

/// Issue repository.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Number of issues whose published flag equals `published` within `scope`.
    async fn count(&self, published: bool, scope: ContextScope) -> SiteStatsResult<u64>;
}

/// Usage-metrics store.
#[async_trait]
pub trait UsageMetricsStore: Send + Sync {
    /// Sum of metric values over `range`.
    async fn sum(
        &self,
        range: DateRange,
        assoc_type: AssocType,
        scope: ContextScope,
    ) -> SiteStatsResult<u64>;

    /// Up to `limit` submissions ranked by summed metric over `range`,
    /// highest first.
    async fn top_submissions(
        &self,
        limit: usize,
        range: DateRange,
        assoc_type: AssocType,
        scope: ContextScope,
    ) -> SiteStatsResult<Vec<MostReadRecord>>;
}

/// The four collaborators bundled for injection into the aggregator and
/// the page handler.
#[derive(Clone)]
pub struct DataSources {
    pub tenants: Arc<dyn TenantRegistry>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub metrics: Arc<dyn UsageMetricsStore>,
}

impl DataSources {
    pub fn new(
        tenants: Arc<dyn TenantRegistry>,
        submissions: Arc<dyn SubmissionRepository>,
        issues: Arc<dyn IssueRepository>,
        metrics: Arc<dyn UsageMetricsStore>,
    ) -> Self {
        Self {
            tenants,
            submissions,
            issues,
            metrics,
        }
    }

    /// Use one store that implements every collaborator.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: TenantRegistry + SubmissionRepository + IssueRepository + UsageMetricsStore + 'static,
    {
        Self {
            tenants: store.clone(),
            submissions: store.clone(),
            issues: store.clone(),
            metrics: store,
        }
    }

    /// Replace the usage-metrics store, keeping the other collaborators.
    pub fn with_metrics(mut self, metrics: Arc<dyn UsageMetricsStore>) -> Self {
        self.metrics = metrics;
        self
    }
}
