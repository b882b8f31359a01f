//! Most-Read Localization
//!
//! Turns cached ranking rows into display entries for the request locale.
//! Publication status is re-checked here because the cached ranking can be
//! up to a day old.

use std::sync::Arc;

use sitestats_core::{MostReadEntry, MostReadRecord, SiteStatsResult};
use sitestats_storage::{DataSources, SubmissionRepository, TenantRegistry};
use tracing::debug;

use crate::urls::UrlBuilder;

/// Resolves ranking rows into linked, localized entries.
#[derive(Clone)]
pub struct MostReadLocalizer {
    submissions: Arc<dyn SubmissionRepository>,
    tenants: Arc<dyn TenantRegistry>,
    urls: Arc<dyn UrlBuilder>,
    locale: String,
}

impl MostReadLocalizer {
    pub fn new(sources: &DataSources, urls: Arc<dyn UrlBuilder>, locale: impl Into<String>) -> Self {
        Self {
            submissions: sources.submissions.clone(),
            tenants: sources.tenants.clone(),
            urls,
            locale: locale.into(),
        }
    }

    /// Localize `records` in order.
    ///
    /// A row is silently omitted when its submission no longer exists, its
    /// current publication is not published, or its tenant is gone. Only a
    /// failing data store is an error.
    pub async fn localize(&self, records: &[MostReadRecord]) -> SiteStatsResult<Vec<MostReadEntry>> {
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            let Some(submission) = self.submissions.get(record.submission_id).await? else {
                debug!(submission_id = record.submission_id, "Omitting missing submission");
                continue;
            };

            if !submission.current_publication_status().is_published() {
                debug!(submission_id = submission.id, "Omitting unpublished submission");
                continue;
            }

            let Some(tenant) = self.tenants.get(submission.context_id).await? else {
                debug!(
                    submission_id = submission.id,
                    tenant_id = submission.context_id,
                    "Omitting submission of missing tenant"
                );
                continue;
            };

            entries.push(MostReadEntry {
                url: self.urls.article_view_url(&tenant.path, &submission.best_id()),
                title: submission
                    .localized_full_title(&self.locale)
                    .unwrap_or_default()
                    .to_string(),
                tenant_name: tenant.localized_name(&self.locale).unwrap_or_default().to_string(),
                metric: record.metric,
            });
        }

        Ok(entries)
    }
}
