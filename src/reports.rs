//! Report filtering and dashboard statistics.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::error::Result;
use crate::models::{Delivery, GateRecord, RecordKind, Visitor};
use crate::store::GateStore;

/// Active/exited filter of the reports view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Exited,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [StatusFilter::All, StatusFilter::Active, StatusFilter::Exited];

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "Todos",
            StatusFilter::Active => "Na obra",
            StatusFilter::Exited => "Saída finalizada",
        }
    }

    fn accepts(&self, active: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => active,
            StatusFilter::Exited => !active,
        }
    }
}

/// Free text, inclusive local date range and status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: StatusFilter,
}

impl RecordFilter {
    pub fn matches<R: GateRecord>(&self, record: &R) -> bool {
        if !self.status.accepts(record.is_active()) {
            return false;
        }

        let day = record.entry_time().with_timezone(&Local).date_naive();
        if self.start_date.is_some_and(|start| day < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| day > end) {
            return false;
        }

        record.matches_search(&self.search)
    }

    pub fn apply<'a, R: GateRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Counts for one record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Entries registered today.
    pub today_total: usize,
    /// Of today's entries, still on site.
    pub today_active: usize,
    /// Of today's entries, already left.
    pub today_exited: usize,
    /// Still on site regardless of entry day.
    pub active_total: usize,
}

impl KindStats {
    pub fn compute<R: GateRecord>(records: &[R], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        for record in records {
            let active = record.is_active();
            if active {
                stats.active_total += 1;
            }
            if record.entry_time().with_timezone(&Local).date_naive() == today {
                stats.today_total += 1;
                if active {
                    stats.today_active += 1;
                } else {
                    stats.today_exited += 1;
                }
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyStats {
    pub visitors: KindStats,
    pub deliveries: KindStats,
}

/// Dashboard contents: today's counts and everyone still on site.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub stats: DailyStats,
    pub active_visitors: Vec<Visitor>,
    pub active_deliveries: Vec<Delivery>,
}

/// Start of the local day containing `now`, in UTC.
pub fn start_of_local_day(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Fetch today's entries plus everything still active.
pub async fn load_dashboard(store: &dyn GateStore, now: DateTime<Local>) -> Result<DashboardData> {
    let since = start_of_local_day(now);
    let today = now.date_naive();

    let todays_visitors = store.visitors_since(since).await?;
    let todays_deliveries = store.deliveries_since(since).await?;
    let active_visitors = store.active_visitors().await?;
    let active_deliveries = store.active_deliveries().await?;

    let mut visitors = KindStats::compute(&todays_visitors, today);
    visitors.active_total = active_visitors.len();
    let mut deliveries = KindStats::compute(&todays_deliveries, today);
    deliveries.active_total = active_deliveries.len();

    Ok(DashboardData {
        stats: DailyStats { visitors, deliveries },
        active_visitors,
        active_deliveries,
    })
}

/// Register an exit now. `false` if someone else registered it first.
pub async fn register_exit(store: &dyn GateStore, kind: RecordKind, id: i64) -> Result<bool> {
    let done = store.mark_exit(kind, id, Utc::now()).await?;
    if !done {
        tracing::info!("{} {id} already had an exit", kind.label());
    }
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery::tests::sample_delivery;
    use crate::models::visitor::tests::sample_visitor;
    use crate::store::tests::FakeStore;
    use chrono::Duration;

    fn local_day(v: &Visitor) -> NaiveDate {
        v.entry_time.with_timezone(&Local).date_naive()
    }

    #[test]
    fn test_status_filter() {
        let active = sample_visitor(1);
        let mut exited = sample_visitor(2);
        exited.mark_exit(exited.entry_time + Duration::hours(1));
        let records = vec![active, exited];

        let filter = RecordFilter {
            status: StatusFilter::Active,
            ..Default::default()
        };
        assert_eq!(filter.apply(&records).len(), 1);
        assert_eq!(filter.apply(&records)[0].id, 1);

        let filter = RecordFilter {
            status: StatusFilter::Exited,
            ..Default::default()
        };
        assert_eq!(filter.apply(&records)[0].id, 2);
        assert_eq!(RecordFilter::default().apply(&records).len(), 2);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let visitor = sample_visitor(1);
        let day = local_day(&visitor);

        let same_day = RecordFilter {
            start_date: Some(day),
            end_date: Some(day),
            ..Default::default()
        };
        assert!(same_day.matches(&visitor));

        let after = RecordFilter {
            start_date: day.succ_opt(),
            ..Default::default()
        };
        assert!(!after.matches(&visitor));

        let before = RecordFilter {
            end_date: day.pred_opt(),
            ..Default::default()
        };
        assert!(!before.matches(&visitor));
    }

    #[test]
    fn test_search_and_date_combined() {
        let deliveries = vec![sample_delivery(1), sample_delivery(2)];
        let filter = RecordFilter {
            search: "nf-44".to_string(),
            start_date: Some(deliveries[0].entry_time.with_timezone(&Local).date_naive()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&deliveries).len(), 2);

        let filter = RecordFilter {
            search: "outro".to_string(),
            ..Default::default()
        };
        assert!(filter.apply(&deliveries).is_empty());
    }

    #[test]
    fn test_kind_stats() {
        let today_active = sample_visitor(1);
        let mut today_exited = sample_visitor(2);
        today_exited.mark_exit(today_exited.entry_time + Duration::minutes(30));
        let mut yesterday_active = sample_visitor(3);
        yesterday_active.entry_time -= Duration::days(1);

        let today = local_day(&today_active);
        let stats = KindStats::compute(&[today_active, today_exited, yesterday_active], today);
        assert_eq!(
            stats,
            KindStats {
                today_total: 2,
                today_active: 1,
                today_exited: 1,
                active_total: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_load_dashboard_and_exit() {
        let now = Local::now();
        let mut visitor = sample_visitor(1);
        visitor.entry_time = now.with_timezone(&Utc);
        let mut old_delivery = sample_delivery(1);
        old_delivery.entry_time = now.with_timezone(&Utc) - Duration::days(3);

        let store = FakeStore::with_records(vec![visitor], vec![old_delivery]);
        let data = load_dashboard(&store, now).await.unwrap();
        assert_eq!(data.stats.visitors.today_total, 1);
        assert_eq!(data.stats.visitors.today_active, 1);
        assert_eq!(data.stats.deliveries.today_total, 0);
        assert_eq!(data.stats.deliveries.active_total, 1);
        assert_eq!(data.active_deliveries.len(), 1);

        assert!(register_exit(&store, RecordKind::Delivery, 1).await.unwrap());
        assert!(!register_exit(&store, RecordKind::Delivery, 1).await.unwrap());

        let data = load_dashboard(&store, now).await.unwrap();
        assert!(data.active_deliveries.is_empty());
    }

    #[test]
    fn test_start_of_local_day() {
        let now = Local::now();
        let start = start_of_local_day(now).with_timezone(&Local);
        assert_eq!(start.date_naive(), now.date_naive());
        assert!(start <= now);
    }
}
