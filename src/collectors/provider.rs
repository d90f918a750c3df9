use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::collectors::aladhan::{
    fallback_report, fetch_timings_body, parse_timings_body, FetchError, PrayerTimesReport,
    TimingsRequest,
};
use crate::utils::db;

/// Resolves a city to today's prayer times: SQLite cache first, then the
/// remote API, then the built-in fallback.
pub struct TimingsProvider {
    client: reqwest::Client,
    request: TimingsRequest,
    db_path: PathBuf,
    cache_ttl_secs: i64,
}

impl TimingsProvider {
    pub fn new(request: TimingsRequest, db_path: PathBuf, cache_ttl_secs: i64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            request,
            db_path,
            cache_ttl_secs,
        })
    }

    /// Never fails: any fetch or parse problem degrades to the fallback report.
    pub async fn lookup(&self, city: &str, today: NaiveDate, now_ts: i64) -> PrayerTimesReport {
        match self.try_lookup(city, today, now_ts).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, city, "Using fallback prayer times");
                fallback_report(city, today)
            }
        }
    }

    async fn try_lookup(&self, city: &str, today: NaiveDate, now_ts: i64) -> Result<PrayerTimesReport, FetchError> {
        let day = today.format("%Y-%m-%d").to_string();

        if let Some(body) = self.cached(city, &day, now_ts) {
            match parse_timings_body(city, &body) {
                Ok(report) => {
                    debug!(city, day = %day, "Prayer times served from cache");
                    return Ok(report);
                }
                Err(e) => warn!(error = %e, city, "Discarding unreadable cache entry"),
            }
        }

        let body = fetch_timings_body(&self.client, &self.request, city).await?;
        let report = parse_timings_body(city, &body)?;
        self.store(city, &day, &body, now_ts);
        Ok(report)
    }

    fn cached(&self, city: &str, day: &str, now_ts: i64) -> Option<String> {
        let not_before = now_ts - self.cache_ttl_secs;
        match db::open_or_init(&self.db_path).and_then(|c| db::get_cached_timings(&c, city, day, not_before)) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to read timings cache");
                None
            }
        }
    }

    fn store(&self, city: &str, day: &str, body: &str, now_ts: i64) {
        let result = db::open_or_init(&self.db_path).and_then(|c| {
            db::put_cached_timings(&c, city, day, body, now_ts)?;
            db::prune_timings(&c, day)
        });
        match result {
            Ok(pruned) => debug!(city, pruned, "Cached prayer times"),
            Err(e) => warn!(error = %e, city, "Failed to cache prayer times"),
        }
    }
}
