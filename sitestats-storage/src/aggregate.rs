//! Site-wide statistics aggregation.
//!
//! [`StatisticsAggregator`] queries the data sources once and assembles a
//! [`StatisticsSnapshot`]. It is the populator of the statistics cache.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use sitestats_core::{
    AssocType, Clock, ContextScope, DateRange, MostReadRecord, PublicationStatus,
    SiteStatsResult, StatisticsConfig, StatisticsSnapshot,
};
use tracing::{debug, info};

use crate::cache::Populate;
use crate::sources::DataSources;

/// Computes [`StatisticsSnapshot`]s from the site data sources.
#[derive(Clone)]
pub struct StatisticsAggregator {
    sources: DataSources,
    clock: Arc<dyn Clock>,
    config: StatisticsConfig,
}

impl StatisticsAggregator {
    pub fn new(sources: DataSources, clock: Arc<dyn Clock>, config: StatisticsConfig) -> Self {
        Self {
            sources,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// `[earliest_date, yesterday]`.
    pub fn all_time_range(&self) -> DateRange {
        DateRange::new(self.config.earliest_date, self.yesterday())
    }

    /// `[today - last_month_days, yesterday]`.
    pub fn last_month_range(&self) -> DateRange {
        let today = self.clock.today();
        let start = today
            .checked_sub_days(Days::new(u64::from(self.config.last_month_days)))
            .unwrap_or(self.config.earliest_date);
        DateRange::new(start, self.yesterday())
    }

    fn yesterday(&self) -> NaiveDate {
        let today = self.clock.today();
        today.pred_opt().unwrap_or(today)
    }

    /// Query every data source and build a new snapshot.
    ///
    /// Any data-source failure aborts the computation; no partial snapshot
    /// is ever returned.
    pub async fn compute(&self) -> SiteStatsResult<StatisticsSnapshot> {
        let started = Instant::now();
        let all_time = self.all_time_range();
        let last_month = self.last_month_range();

        let (tenants, submission_count, issue_count, all_time_downloads) = tokio::try_join!(
            self.sources.tenants.list_enabled(),
            self.sources
                .submissions
                .count(PublicationStatus::Published, ContextScope::All),
            self.sources.issues.count(true, ContextScope::All),
            self.sources
                .metrics
                .sum(all_time, AssocType::SubmissionFile, ContextScope::All),
        )?;

        let all_time_most_read = self.most_read(all_time).await?;
        let last_month_most_read = self.most_read(last_month).await?;

        let snapshot = StatisticsSnapshot {
            journal_count: tenants.len() as u64,
            issue_count,
            submission_count,
            all_time_downloads,
            all_time_most_read,
            last_month_most_read,
        };

        info!(
            journals = snapshot.journal_count,
            issues = snapshot.issue_count,
            submissions = snapshot.submission_count,
            downloads = snapshot.all_time_downloads,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Site statistics computed"
        );
        Ok(snapshot)
    }

    /// Ranking of submissions by downloads over `range`.
    ///
    /// Rows with a zero metric or whose submission no longer exists are
    /// dropped; the list is not padded back up to the limit.
    pub async fn most_read(&self, range: DateRange) -> SiteStatsResult<Vec<MostReadRecord>> {
        let limit = self.config.most_read_limit;
        let rows = self
            .sources
            .metrics
            .top_submissions(limit, range, AssocType::SubmissionFile, ContextScope::All)
            .await?;

        let mut ranking = Vec::with_capacity(rows.len().min(limit));
        for row in rows {
            if row.metric == 0 {
                debug!(submission_id = row.submission_id, %range, "Dropping zero-metric row");
                continue;
            }
            if self.sources.submissions.get(row.submission_id).await?.is_none() {
                debug!(submission_id = row.submission_id, %range, "Dropping unresolved submission");
                continue;
            }
            ranking.push(row);
        }

        rank_descending(&mut ranking, limit);
        Ok(ranking)
    }
}

/// Stable sort by metric, highest first, then cut to `limit`.
pub(crate) fn rank_descending(records: &mut Vec<MostReadRecord>, limit: usize) {
    records.sort_by(|a, b| b.metric.cmp(&a.metric));
    records.truncate(limit);
}

#[async_trait]
impl Populate<StatisticsSnapshot> for StatisticsAggregator {
    async fn populate(&self) -> SiteStatsResult<StatisticsSnapshot> {
        self.compute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySiteStore;
    use chrono::{TimeZone, Utc};
    use sitestats_core::{
        Issue, LocalizedText, ManualClock, MetricRecord, Publication, Submission, Tenant,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()))
    }

    fn tenant(id: i64, enabled: bool) -> Tenant {
        Tenant {
            id,
            path: format!("j{}", id),
            name: LocalizedText::single("en", format!("Journal {}", id)),
            enabled,
            primary_locale: "en".to_string(),
        }
    }

    fn submission(id: i64, status: PublicationStatus) -> Submission {
        Submission {
            id,
            context_id: 1,
            status,
            current_publication: Publication {
                status,
                full_title: LocalizedText::single("en", format!("Paper {}", id)),
                url_path: None,
                locale: "en".to_string(),
            },
        }
    }

    fn download(submission_id: i64, date: NaiveDate, metric: u64) -> MetricRecord {
        MetricRecord {
            submission_id,
            context_id: 1,
            assoc_type: AssocType::SubmissionFile,
            date,
            metric,
        }
    }

    fn aggregator(store: Arc<InMemorySiteStore>) -> StatisticsAggregator {
        StatisticsAggregator::new(
            DataSources::from_store(store),
            clock(),
            StatisticsConfig::default(),
        )
    }

    #[test]
    fn test_windows_end_yesterday() {
        let agg = aggregator(Arc::new(InMemorySiteStore::new()));

        assert_eq!(
            agg.all_time_range(),
            DateRange::new(date(2001, 1, 1), date(2024, 6, 14))
        );
        assert_eq!(
            agg.last_month_range(),
            DateRange::new(date(2024, 5, 16), date(2024, 6, 14))
        );
    }

    #[tokio::test]
    async fn test_compute_counts() {
        let store = Arc::new(InMemorySiteStore::new());
        for t in [tenant(1, true), tenant(2, true), tenant(3, false)] {
            store.insert_tenant(t).unwrap();
        }
        store.insert_submission(submission(1, PublicationStatus::Published)).unwrap();
        store.insert_submission(submission(2, PublicationStatus::Published)).unwrap();
        store.insert_submission(submission(3, PublicationStatus::Queued)).unwrap();
        store.insert_issue(Issue { id: 1, context_id: 1, published: true }).unwrap();
        store.insert_issue(Issue { id: 2, context_id: 2, published: false }).unwrap();
        store.record_metric(download(1, date(2024, 6, 1), 30)).unwrap();
        store.record_metric(download(2, date(2010, 3, 3), 12)).unwrap();
        // Today's downloads are outside both windows.
        store.record_metric(download(2, date(2024, 6, 15), 1000)).unwrap();

        let snapshot = aggregator(store).compute().await.unwrap();

        assert_eq!(snapshot.journal_count, 2);
        assert_eq!(snapshot.submission_count, 2);
        assert_eq!(snapshot.issue_count, 1);
        assert_eq!(snapshot.all_time_downloads, 42);
        assert_eq!(
            snapshot.all_time_most_read,
            vec![MostReadRecord::new(1, 30), MostReadRecord::new(2, 12)]
        );
        assert_eq!(snapshot.last_month_most_read, vec![MostReadRecord::new(1, 30)]);
    }

    #[test]
    fn test_rank_descending_is_stable() {
        let mut records = vec![
            MostReadRecord::new(1, 5),
            MostReadRecord::new(2, 9),
            MostReadRecord::new(3, 5),
        ];
        rank_descending(&mut records, 10);
        assert_eq!(
            records,
            vec![
                MostReadRecord::new(2, 9),
                MostReadRecord::new(1, 5),
                MostReadRecord::new(3, 5),
            ]
        );
    }
}
