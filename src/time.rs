//! Time and Timezone Utilities Module
//!
//! Timestamp parsing for weather files, timezone resolution and
//! localization of naive site times.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::sync::OnceLock;
use tzf_rs::DefaultFinder;

use crate::error::{PvError, Result};

// tzf-rs DefaultFinder is pre-compiled and very fast
static TZF_FINDER: OnceLock<DefaultFinder> = OnceLock::new();

/// Formats accepted for the weather file `DateTime` column.
const TIMESTAMP_FORMATS: [&str; 5] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M"];

// ===================== TIME PARSING =====================

/// Parse a naive (zone-less) timestamp as written by pandas and the METPV converters.
///
/// Returns `None` if none of the accepted formats match.
pub fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Attach the site timezone to a naive local timestamp.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant.
/// Skipped local times are an error since the weather row cannot be placed.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t),
        LocalResult::Ambiguous(t, _) => Ok(t),
        LocalResult::None => Err(PvError::NonexistentLocalTime(naive.to_string())),
    }
}

// ===================== TIMEZONE UTILITIES =====================

/// Resolve timezone from geographic coordinates.
///
/// # Arguments
/// * `lon` - Longitude in degrees
/// * `lat` - Latitude in degrees
///
/// # Returns
/// The resolved timezone, or UTC if resolution fails
pub fn resolve_timezone(lon: f64, lat: f64) -> Tz {
    let finder = TZF_FINDER.get_or_init(DefaultFinder::new);

    // Get the IANA string (e.g., "Asia/Tokyo")
    let tzid = finder.get_tz_name(lon, lat);

    tzid.parse::<Tz>().unwrap_or(Tz::UTC)
}

/// Turn a timezone option into a concrete zone.
///
/// `"location"` looks the zone up from the site coordinates, anything else
/// must be an IANA name.
pub fn site_timezone(name: &str, lat: f64, lon: f64) -> Result<Tz> {
    match name {
        "location" => Ok(resolve_timezone(lon, lat)),
        "utc" | "UTC" => Ok(Tz::UTC),
        other => other
            .parse::<Tz>()
            .map_err(|_| PvError::Config(format!("unknown time zone '{}'", other))),
    }
}

// ===================== TESTS =====================
