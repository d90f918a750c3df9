use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::qibla::GeoPoint;
use crate::core::schedule::{PrayerSchedule, ScheduleError, TimeOfDay};

pub const COUNTRY: &str = "Algeria";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api returned code {code}: {status}")]
    Api { code: u16, status: String },
    #[error("bad timing in response: {0}")]
    Timing(#[from] ScheduleError),
}

/// Everything a city lookup produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrayerTimesReport {
    pub city: String,
    pub schedule: PrayerSchedule,
    pub sunrise: TimeOfDay,
    pub sunset: TimeOfDay,
    pub date: String,
    pub hijri_date: String,
    pub coordinates: GeoPoint,
    pub timezone: String,
    pub is_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: u16,
    status: String,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    timings: ApiTimings,
    date: ApiDate,
    meta: ApiMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiTimings {
    fajr: String,
    sunrise: String,
    dhuhr: String,
    asr: String,
    sunset: String,
    maghrib: String,
    isha: String,
}

#[derive(Debug, Deserialize)]
struct ApiDate {
    readable: String,
    hijri: ApiHijri,
}

#[derive(Debug, Deserialize)]
struct ApiHijri {
    date: String,
    month: ApiHijriMonth,
    year: String,
    designation: ApiDesignation,
}

#[derive(Debug, Deserialize)]
struct ApiHijriMonth {
    en: String,
}

#[derive(Debug, Deserialize)]
struct ApiDesignation {
    abbreviated: String,
}

#[derive(Debug, Deserialize)]
struct ApiMeta {
    latitude: f64,
    longitude: f64,
    timezone: String,
}

/// Query parameters for the timings endpoint.
#[derive(Debug, Clone)]
pub struct TimingsRequest {
    pub base_url: String,
    pub method: u8,
    pub school: u8,
}

impl TimingsRequest {
    pub fn url(&self) -> String {
        format!("{}/v1/timingsByCity", self.base_url.trim_end_matches('/'))
    }
}

/// Fetches today's timings for `city` and returns the raw response body.
pub async fn fetch_timings_body(
    client: &reqwest::Client,
    req: &TimingsRequest,
    city: &str,
) -> Result<String, FetchError> {
    let url = req.url();
    let method = req.method.to_string();
    let school = req.school.to_string();
    info!(city, url = %url, "Fetching prayer times");

    let resp = client
        .get(&url)
        .query(&[
            ("city", city),
            ("country", COUNTRY),
            ("method", method.as_str()),
            ("school", school.as_str()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        warn!(status = ?resp.status(), city, "Non-success response fetching prayer times");
        return Err(FetchError::Api {
            code: resp.status().as_u16(),
            status: resp.status().to_string(),
        });
    }

    Ok(resp.text().await?)
}

/// Builds a report from an API body.
pub fn parse_timings_body(city: &str, body: &str) -> Result<PrayerTimesReport, FetchError> {
    let parsed: ApiResponse = serde_json::from_str(body)?;
    let data = match (parsed.code, parsed.data) {
        (200, Some(data)) => data,
        (code, _) => {
            return Err(FetchError::Api {
                code,
                status: parsed.status,
            })
        }
    };

    let t = &data.timings;
    let schedule = PrayerSchedule::parse([
        clock_part(&t.fajr),
        clock_part(&t.dhuhr),
        clock_part(&t.asr),
        clock_part(&t.maghrib),
        clock_part(&t.isha),
    ])?;
    let hijri = &data.date.hijri;
    debug!(city, timezone = %data.meta.timezone, "Parsed prayer times");

    Ok(PrayerTimesReport {
        city: city.to_string(),
        schedule,
        sunrise: clock_part(&t.sunrise).parse()?,
        sunset: clock_part(&t.sunset).parse()?,
        date: data.date.readable,
        hijri_date: format!(
            "{} {} {} {}",
            hijri.date, hijri.month.en, hijri.year, hijri.designation.abbreviated
        ),
        coordinates: GeoPoint {
            latitude: data.meta.latitude,
            longitude: data.meta.longitude,
        },
        timezone: data.meta.timezone,
        is_fallback: false,
    })
}

// The API may append a zone label, e.g. "05:15 (CET)".
fn clock_part(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

/// Typical Algiers times, served when the API cannot be reached.
pub fn fallback_report(city: &str, today: NaiveDate) -> PrayerTimesReport {
    let t = |h, m| TimeOfDay::new(h, m).unwrap_or(TimeOfDay::MIDNIGHT);
    PrayerTimesReport {
        city: city.to_string(),
        schedule: PrayerSchedule::new([t(5, 15), t(12, 30), t(15, 45), t(18, 20), t(19, 50)]),
        sunrise: t(6, 45),
        sunset: t(18, 15),
        date: today.format("%A, %B %-d, %Y").to_string(),
        hijri_date: "15 Jumada al-Awwal 1446 AH".to_string(),
        coordinates: GeoPoint {
            latitude: 36.7538,
            longitude: 3.0588,
        },
        timezone: "Africa/Algiers".to_string(),
        is_fallback: true,
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_BODY: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": {
            "timings": {
                "Fajr": "06:02", "Sunrise": "07:30", "Dhuhr": "12:38", "Asr": "15:24",
                "Sunset": "17:47", "Maghrib": "17:47", "Isha": "19:10 (CET)",
                "Imsak": "05:52", "Midnight": "00:38", "Firstthird": "22:01", "Lastthird": "03:15"
            },
            "date": {
                "readable": "16 Nov 2024",
                "timestamp": "1731744000",
                "hijri": {
                    "date": "14-05-1446", "format": "DD-MM-YYYY", "day": "14",
                    "weekday": {"en": "Al Sabt", "ar": "السبت"},
                    "month": {"number": 5, "en": "Jumādá al-ūlá", "ar": "جُمادى الأولى"},
                    "year": "1446",
                    "designation": {"abbreviated": "AH", "expanded": "Anno Hegirae"}
                }
            },
            "meta": {
                "latitude": 36.7537703, "longitude": 3.0587927, "timezone": "Africa/Algiers",
                "method": {"id": 3, "name": "Muslim World League"}
            }
        }
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::Prayer;

    const BODY: &str = SAMPLE_BODY;

    #[test]
    fn parses_timings_response() {
        let report = parse_timings_body("Algiers", BODY).unwrap();
        assert_eq!(report.schedule.time_of(Prayer::Fajr).to_string(), "06:02");
        assert_eq!(report.schedule.time_of(Prayer::Isha).to_string(), "19:10");
        assert_eq!(report.sunset.to_string(), "17:47");
        assert_eq!(report.hijri_date, "14-05-1446 Jumādá al-ūlá 1446 AH");
        assert_eq!(report.timezone, "Africa/Algiers");
        assert_eq!(report.coordinates.qibla_bearing(), 105);
        assert!(!report.is_fallback);
    }

    #[test]
    fn non_200_code_is_an_api_error() {
        let body = r#"{"code": 400, "status": "Unable to locate city", "data": null}"#;
        match parse_timings_body("Nowhere", body) {
            Err(FetchError::Api { code, status }) => {
                assert_eq!(code, 400);
                assert_eq!(status, "Unable to locate city");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bad_timing_is_rejected() {
        let body = BODY.replace("\"Asr\": \"15:24\"", "\"Asr\": \"late\"");
        assert!(matches!(
            parse_timings_body("Algiers", &body),
            Err(FetchError::Timing(ScheduleError::InvalidTimeOfDay(_)))
        ));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(parse_timings_body("Algiers", "<html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn fallback_uses_algiers_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 16).unwrap();
        let report = fallback_report("Oran", today);
        assert!(report.is_fallback);
        assert_eq!(report.city, "Oran");
        assert_eq!(report.schedule.time_of(Prayer::Maghrib).to_string(), "18:20");
        assert_eq!(report.date, "Saturday, November 16, 2024");
        assert_eq!(report.hijri_date, "15 Jumada al-Awwal 1446 AH");
    }

    #[test]
    fn url_joins_base() {
        let req = TimingsRequest {
            base_url: "https://api.aladhan.com/".into(),
            method: 3,
            school: 0,
        };
        assert_eq!(req.url(), "https://api.aladhan.com/v1/timingsByCity");
    }
}
