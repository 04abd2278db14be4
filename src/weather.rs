//! Weather Loader
//!
//! Reads the clean hourly weather CSV (one calendar year at one site),
//! validates its shape and localizes the timestamps to the site zone.
//!
//! # File layout
//!
//! | column        | unit  | required |
//! |---------------|-------|----------|
//! | `DateTime`    | local | yes      |
//! | `GHI`         | W/m²  | yes      |
//! | `Temperature` | °C    | yes      |
//! | `DNI`         | W/m²  | no       |
//! | `DNI_horiz`   | W/m²  | no, beam on the horizontal plane |
//! | `DHI`         | W/m²  | no       |
//! | `WindSpeed`   | m/s   | no       |
//! | `Latitude`, `Longitude`, `Elevation` | | no, site metadata |

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PvError, Result};
use crate::irradiance::ineichen_perez_clearsky;
use crate::solar::SunPosition;
use crate::time::{localize, parse_naive_timestamp};

/// Hours in a common year
pub const HOURS_PER_YEAR: usize = 8760;
/// Hours in a leap year
pub const HOURS_PER_LEAP_YEAR: usize = 8784;

/// Air temperature used when the file has no earlier valid value (°C)
const FALLBACK_TEMPERATURE_C: f64 = 20.0;

/// Linke turbidity for the clear-sky QC envelope
const QC_LINKE_TURBIDITY: f64 = 3.0;

const REQUIRED_COLUMNS: [(&str, &[&str]); 3] = [
    ("DateTime", &["DateTime", "datetime", "timestamp"]),
    ("GHI", &["GHI", "ghi"]),
    ("Temperature", &["Temperature", "temp_air", "tdry"]),
];

// ===================== TYPES =====================

/// One row of the weather CSV as written on disk. Numeric cells stay text
/// until [`cell`] parses them with row context.
#[derive(Debug, Deserialize)]
struct WeatherRow {
    #[serde(rename = "DateTime", alias = "datetime", alias = "timestamp")]
    date_time: String,
    #[serde(rename = "GHI", alias = "ghi", default)]
    ghi: Option<String>,
    #[serde(rename = "DNI", alias = "dni", default)]
    dni: Option<String>,
    #[serde(rename = "DNI_horiz", alias = "beam_horizontal", default)]
    beam_horizontal: Option<String>,
    #[serde(rename = "DHI", alias = "dhi", default)]
    dhi: Option<String>,
    #[serde(rename = "Temperature", alias = "temp_air", alias = "tdry", default)]
    temperature: Option<String>,
    #[serde(rename = "WindSpeed", alias = "wind_speed", alias = "wspd", default)]
    wind_speed: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<String>,
    #[serde(rename = "Longitude", default)]
    longitude: Option<String>,
    #[serde(rename = "Elevation", default)]
    elevation: Option<String>,
}

/// Parse one numeric cell. Empty cells are missing; `nan` is accepted as a
/// missing-value marker; anything else that is not a finite number aborts.
fn cell(line: usize, field: &str, value: Option<&str>) -> Result<Option<f64>> {
    let Some(text) = value.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    match text.parse::<f64>() {
        Ok(v) if !v.is_infinite() => Ok(Some(v)),
        _ => Err(PvError::Parse { row: line, field: field.to_string(), value: text.to_string() }),
    }
}

/// Site metadata some weather files carry on every row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FileMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
}

/// Weather row before the site zone is known
#[derive(Debug, Clone)]
pub struct NaiveRecord {
    pub local_time: NaiveDateTime,
    pub ghi: f64,
    pub dni: Option<f64>,
    pub dhi: Option<f64>,
    pub beam_horizontal: Option<f64>,
    pub temp_air: f64,
    pub wind_speed: Option<f64>,
}

/// Parsed file, not yet localized
#[derive(Debug, Clone)]
pub struct RawWeather {
    pub records: Vec<NaiveRecord>,
    pub metadata: FileMetadata,
}

/// One hour of weather at the site
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    /// Start of the hourly interval, site-local
    pub timestamp: DateTime<Tz>,
    /// Global horizontal irradiance (W/m²)
    pub ghi: f64,
    /// Direct normal irradiance (W/m²), if measured
    pub dni: Option<f64>,
    /// Diffuse horizontal irradiance (W/m²)
    pub dhi: Option<f64>,
    /// Beam irradiance on the horizontal plane (W/m²)
    pub beam_horizontal: Option<f64>,
    /// Ambient air temperature (°C)
    pub temp_air: f64,
    /// Wind speed (m/s)
    pub wind_speed: Option<f64>,
}

/// A validated year of hourly weather
#[derive(Debug, Clone)]
pub struct WeatherSeries {
    pub records: Vec<WeatherRecord>,
}

// ===================== LOADING =====================

impl RawWeather {
    /// Read a weather CSV from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "reading weather file");
        Self::from_reader(file)
    }

    /// Parse weather CSV content.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = rdr.headers()?.clone();
        for (name, aliases) in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| aliases.contains(&h)) {
                return Err(PvError::MissingColumn(name.to_string()));
            }
        }

        let mut records = Vec::with_capacity(HOURS_PER_LEAP_YEAR);
        let mut metadata = FileMetadata::default();
        let mut nan_ghi = 0usize;
        let mut filled_temperature = 0usize;
        let mut last_temperature: Option<f64> = None;

        for (idx, row) in rdr.deserialize::<WeatherRow>().enumerate() {
            let row = row?;
            let line = idx + 2;

            let local_time = parse_naive_timestamp(&row.date_time).ok_or_else(|| PvError::Parse {
                row: line,
                field: "DateTime".into(),
                value: row.date_time.clone(),
            })?;

            let ghi = cell(line, "GHI", row.ghi.as_deref())?;
            let dni = cell(line, "DNI", row.dni.as_deref())?;
            let beam_horizontal = cell(line, "DNI_horiz", row.beam_horizontal.as_deref())?;
            let dhi = cell(line, "DHI", row.dhi.as_deref())?;
            let temperature = cell(line, "Temperature", row.temperature.as_deref())?;
            let wind_speed = cell(line, "WindSpeed", row.wind_speed.as_deref())?;

            if metadata.latitude.is_none() {
                metadata = FileMetadata {
                    latitude: cell(line, "Latitude", row.latitude.as_deref())?,
                    longitude: cell(line, "Longitude", row.longitude.as_deref())?,
                    elevation: cell(line, "Elevation", row.elevation.as_deref())?,
                };
            }

            let ghi = match ghi {
                Some(v) if !v.is_nan() => v,
                _ => {
                    nan_ghi += 1;
                    f64::NAN
                }
            };

            let temp_air = match temperature {
                Some(t) if !t.is_nan() => {
                    last_temperature = Some(t);
                    t
                }
                _ => {
                    filled_temperature += 1;
                    last_temperature.unwrap_or(FALLBACK_TEMPERATURE_C)
                }
            };

            records.push(NaiveRecord {
                local_time,
                ghi,
                dni,
                dhi,
                beam_horizontal,
                temp_air,
                wind_speed: wind_speed.filter(|w| !w.is_nan()),
            });
        }

        if nan_ghi > 0 {
            warn!(rows = nan_ghi, "GHI missing or NaN, treated as zero");
        }
        if filled_temperature > 0 {
            warn!(rows = filled_temperature, "temperature missing, carried forward");
        }
        debug!(rows = records.len(), "weather rows parsed");

        Ok(Self { records, metadata })
    }

    /// Attach the site zone and validate the series.
    pub fn localize(self, tz: &Tz) -> Result<WeatherSeries> {
        let records = self
            .records
            .into_iter()
            .map(|r| {
                Ok(WeatherRecord {
                    timestamp: localize(tz, r.local_time)?,
                    ghi: r.ghi,
                    dni: r.dni,
                    dhi: r.dhi,
                    beam_horizontal: r.beam_horizontal,
                    temp_air: r.temp_air,
                    wind_speed: r.wind_speed,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut series = WeatherSeries { records };
        series.validate()?;
        series.clamp_irradiance();
        Ok(series)
    }
}

impl WeatherSeries {
    /// Check row count and strict hourly spacing.
    pub fn validate(&self) -> Result<()> {
        let n = self.records.len();
        if n != HOURS_PER_YEAR && n != HOURS_PER_LEAP_YEAR {
            return Err(PvError::RowCount { found: n });
        }

        for (i, pair) in self.records.windows(2).enumerate() {
            if pair[1].timestamp - pair[0].timestamp != Duration::hours(1) {
                return Err(PvError::TimestampGap {
                    row: i + 3,
                    previous: pair[0].timestamp.to_string(),
                    current: pair[1].timestamp.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Replace non-finite and negative irradiance with zero.
    fn clamp_irradiance(&mut self) {
        fn fix(v: &mut f64, count: &mut usize) {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
                *count += 1;
            }
        }

        let mut clamped = 0usize;
        for r in &mut self.records {
            fix(&mut r.ghi, &mut clamped);
            for v in [&mut r.dni, &mut r.dhi, &mut r.beam_horizontal].into_iter().flatten() {
                fix(v, &mut clamped);
            }
        }
        if clamped > 0 {
            warn!(values = clamped, "negative or non-finite irradiance clamped to zero");
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Tz>> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    /// Sum of GHI over the year (kWh/m²)
    pub fn annual_ghi_kwh_m2(&self) -> f64 {
        self.records.iter().map(|r| r.ghi).sum::<f64>() / 1000.0
    }
}

// ===================== QUALITY CHECK =====================

/// Count daylight hours where GHI exceeds the clear-sky envelope by more than 50%.
///
/// Flags unit mistakes (e.g. MJ/m² left unconverted) and timestamp shifts.
pub fn count_clear_sky_exceedances(
    records: &[WeatherRecord],
    suns: &[SunPosition],
    altitude_m: f64,
) -> usize {
    records
        .iter()
        .zip(suns)
        .filter(|(r, sun)| {
            let (_, _, cs_ghi) = ineichen_perez_clearsky(
                sun.zenith_deg,
                altitude_m,
                r.timestamp.ordinal(),
                QC_LINKE_TURBIDITY,
            );
            r.ghi > 50.0 && r.ghi > 1.5 * cs_ghi
        })
        .count()
}

// ===================== TESTS =====================
