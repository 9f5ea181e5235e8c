//! Background timers: the daily full reconciliation and the periodic
//! maintenance pass.
//!
//! Both run as independent tokio tasks and only share `Arc`-wrapped
//! components that synchronize internally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use rolegate_db::{Address, DbResult, IdentityStatus, RolegateDb, queries};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::auth::ChallengeStore;
use crate::cache::TtlCache;
use crate::reconcile::Reconciler;

/// Next time strictly after `now` whose local time of day is `at`.
///
/// Days where `at` falls into a DST gap are skipped; for repeated local times
/// the earlier instant is used.
pub fn next_daily_run<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    now.clone() + TimeDelta::days(1)
}

/// Spawn the task that reconciles every guild once a day at local time `at`.
pub fn spawn_daily_reconcile(reconciler: Arc<Reconciler>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = next_daily_run(&now, at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!("Next full role update at {}", next.format("%Y-%m-%d %H:%M %Z"));

            tokio::time::sleep(wait).await;

            match reconciler.reconcile_all().await {
                Ok(reports) => {
                    let updated: usize = reports.iter().map(|(_, r)| r.updated).sum();
                    let failed: usize = reports.iter().map(|(_, r)| r.failed).sum();
                    info!(
                        "Daily role update finished: {} guilds, {} members updated, {} failures",
                        reports.len(),
                        updated,
                        failed
                    );
                }
                Err(e) => error!("Daily role update failed: {}", e),
            }
        }
    })
}

/// Receives the bound identity count after each maintenance pass.
#[async_trait]
pub trait PresenceReporter: Send + Sync {
    async fn report_identity_count(&self, count: u64);
}

/// Result of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub sessions_swept: u64,
    pub cache_entries_purged: usize,
    pub identities: u64,
}

/// Periodic housekeeping: sweep stale logins, purge expired status cache
/// entries and publish the identity count.
pub struct Maintenance {
    challenges: ChallengeStore,
    db: RolegateDb,
    session_ttl: Duration,
    status_cache: Option<Arc<TtlCache<Address, IdentityStatus>>>,
    reporter: Option<Arc<dyn PresenceReporter>>,
}

impl Maintenance {
    pub fn new(db: RolegateDb, session_ttl: Duration) -> Self {
        Self {
            challenges: ChallengeStore::new(db.clone()),
            db,
            session_ttl,
            status_cache: None,
            reporter: None,
        }
    }

    pub fn with_status_cache(mut self, cache: Arc<TtlCache<Address, IdentityStatus>>) -> Self {
        self.status_cache = Some(cache);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PresenceReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Run one pass.
    pub async fn tick(&self) -> DbResult<MaintenanceReport> {
        let sessions_swept = self.challenges.sweep(self.session_ttl).await?;
        let cache_entries_purged = self
            .status_cache
            .as_ref()
            .map(|cache| cache.purge_expired())
            .unwrap_or(0);
        let identities = queries::count_bound_identities(self.db.pool()).await?;

        if let Some(reporter) = &self.reporter {
            reporter.report_identity_count(identities).await;
        }

        Ok(MaintenanceReport {
            sessions_swept,
            cache_entries_purged,
            identities,
        })
    }

    /// Run a pass now and then every `period`.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.tick().await {
                    warn!("Maintenance pass failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use rolegate_db::{MemberId, unix_now};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(&now, at(15, 45)),
            Utc.with_ymd_and_hms(2024, 3, 10, 15, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_tomorrow_when_passed() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 15, 45, 0).unwrap();
        assert_eq!(
            next_daily_run(&now, at(15, 45)),
            Utc.with_ymd_and_hms(2025, 1, 1, 15, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_uses_local_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 14:00 UTC is 16:00 local, past 15:45 local
        let now = Utc
            .with_ymd_and_hms(2024, 6, 1, 14, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        let next = next_daily_run(&now, at(15, 45));
        assert_eq!(next, tz.with_ymd_and_hms(2024, 6, 2, 15, 45, 0).unwrap());
    }

    #[derive(Default)]
    struct RecordingReporter {
        counts: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl PresenceReporter for RecordingReporter {
        async fn report_identity_count(&self, count: u64) {
            self.counts.lock().push(count);
        }
    }

    #[tokio::test]
    async fn test_maintenance_tick() {
        let db = RolegateDb::open_in_memory().await.unwrap();
        let reporter = Arc::new(RecordingReporter::default());

        queries::upsert_pending_auth(db.pool(), MemberId(1), "stale", unix_now() - 7200)
            .await
            .unwrap();
        queries::upsert_pending_auth(db.pool(), MemberId(2), "fresh", unix_now())
            .await
            .unwrap();
        for (member, address) in [
            (1, "0x1111111111111111111111111111111111111111"),
            (2, "0x2222222222222222222222222222222222222222"),
        ] {
            queries::bind_identity(db.pool(), MemberId(member), &address.parse().unwrap(), 0)
                .await
                .unwrap();
        }

        let maintenance = Maintenance::new(db.clone(), Duration::from_secs(3600))
            .with_reporter(reporter.clone());
        let report = maintenance.tick().await.unwrap();

        assert_eq!(
            report,
            MaintenanceReport {
                sessions_swept: 1,
                cache_entries_purged: 0,
                identities: 2,
            }
        );
        assert_eq!(*reporter.counts.lock(), vec![2]);
        assert_eq!(db.stats().await.unwrap().pending_count, 1);
    }
}
