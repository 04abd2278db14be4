//! METPV Converters
//!
//! Turns NEDO METPV typical-year data into the clean weather CSV read by
//! [`crate::weather`]. Two inputs are understood:
//!
//! - METPV-11 fixed-width text (`meaNNNNN.txt`, Shift-JIS)
//! - METPV "horizontal" CSV exports (`hmNNNNNyear.csv`)
//!
//! Irradiance arrives as hourly sums in 0.01 MJ/m², temperature in 0.1 °C and
//! wind in 0.1 m/s.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PvError, Result};
use crate::weather::HOURS_PER_YEAR;

/// 0.01 MJ/m² per hour to W/m²
pub const IRRADIANCE_SCALE: f64 = 10_000.0 / 3600.0;
/// 0.1 unit fields
pub const TENTHS_SCALE: f64 = 0.1;
/// Missing-value marker in METPV-11
pub const MISSING: i64 = 8888;

/// Both exports are laid out on this (leap) year
const BASE_YEAR: i32 = 2016;

const ELEMENT_GHI: &str = "00001";
const ELEMENT_BEAM_HORIZONTAL: &str = "00002";
const ELEMENT_DIFFUSE: &str = "00003";
const ELEMENT_TEMPERATURE: &str = "00005";
const ELEMENT_WIND: &str = "00007";

// Fixed-width layout (0-based byte ranges)
const HEADER_MIN_LEN: usize = 54;
const DATA_MIN_LEN: usize = 130;
const ID: Range<usize> = 0..5;
const NAME: Range<usize> = 6..26;
const LAT_DEG: Range<usize> = 26..31;
const LAT_MIN: Range<usize> = 31..36;
const LON_DEG: Range<usize> = 36..41;
const LON_MIN: Range<usize> = 41..46;
const ELEVATION: Range<usize> = 46..54;
const ELEMENT: Range<usize> = 0..5;
const FIRST_HOUR_BYTE: usize = 15;
const HOUR_FIELD_WIDTH: usize = 5;
const HOUR_VALUE_WIDTH: usize = 4;

/// Horizontal export: type, month, day, year, then 24 hourly values
const HORIZONTAL_MIN_FIELDS: usize = 28;
const HORIZONTAL_FIRST_HOUR: usize = 4;

// ===================== TYPES =====================

/// Station header of a METPV file
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// One row of the clean weather CSV
#[derive(Debug, Clone, Serialize)]
pub struct CleanRow {
    #[serde(rename = "DateTime")]
    pub date_time: String,
    #[serde(rename = "GHI")]
    pub ghi: Option<f64>,
    #[serde(rename = "DNI_horiz")]
    pub beam_horizontal: Option<f64>,
    #[serde(rename = "DHI")]
    pub dhi: Option<f64>,
    #[serde(rename = "Temperature")]
    pub temperature: Option<f64>,
    #[serde(rename = "WindSpeed")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "Elevation")]
    pub elevation: Option<f64>,
}

/// Figures printed after a conversion
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub rows: usize,
    pub station: Option<Station>,
    pub annual_ghi_kwh_m2: f64,
    pub peak_ghi: f64,
    pub mean_temperature: f64,
}

impl ConversionSummary {
    fn from_rows(rows: &[CleanRow], station: Option<Station>) -> Self {
        let ghi = rows.iter().filter_map(|r| r.ghi);
        let annual_ghi_kwh_m2 = ghi.clone().sum::<f64>() / 1000.0;
        let peak_ghi = ghi.fold(0.0, f64::max);
        let temps: Vec<f64> = rows.iter().filter_map(|r| r.temperature).collect();
        let mean_temperature = if temps.is_empty() {
            f64::NAN
        } else {
            temps.iter().sum::<f64>() / temps.len() as f64
        };
        Self { rows: rows.len(), station, annual_ghi_kwh_m2, peak_ghi, mean_temperature }
    }
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(BASE_YEAR, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn format_time(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Write rows to the clean weather CSV, replacing any existing file.
pub fn write_clean_csv<P: AsRef<Path>>(path: P, rows: &[CleanRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(path = %path.as_ref().display(), rows = rows.len(), "clean weather file written");
    Ok(())
}

// ===================== METPV-11 FIXED WIDTH =====================

/// Parsed METPV-11 file: station header plus hourly values per element code.
#[derive(Debug, Clone)]
pub struct Metpv11 {
    pub station: Station,
    /// Values in file units, `NaN` where missing, in file order
    pub elements: HashMap<String, Vec<f64>>,
}

fn field<'a>(line: &'a [u8], range: Range<usize>, what: &str) -> Result<&'a str> {
    line.get(range)
        .and_then(|b| std::str::from_utf8(b).ok())
        .map(str::trim)
        .ok_or_else(|| PvError::Metpv(format!("header field '{}' is missing or not ASCII", what)))
}

fn number(line: &[u8], range: Range<usize>, what: &str) -> Result<f64> {
    let s = field(line, range, what)?;
    s.parse::<f64>()
        .map_err(|_| PvError::Metpv(format!("header field '{}' is not a number: '{}'", what, s)))
}

fn parse_station(header: &[u8]) -> Result<Station> {
    if header.len() < HEADER_MIN_LEN {
        return Err(PvError::Metpv(format!(
            "header record is {} bytes, expected at least {}",
            header.len(),
            HEADER_MIN_LEN
        )));
    }
    Ok(Station {
        id: field(header, ID, "station id")?.to_string(),
        // Shift-JIS names survive only as lossy text; they are informational
        name: String::from_utf8_lossy(&header[NAME]).trim().to_string(),
        latitude: number(header, LAT_DEG, "latitude")? + number(header, LAT_MIN, "latitude minutes")? / 60.0,
        longitude: number(header, LON_DEG, "longitude")? + number(header, LON_MIN, "longitude minutes")? / 60.0,
        elevation: number(header, ELEVATION, "elevation")?,
    })
}

fn hourly_value(line: &[u8], hour: usize) -> f64 {
    let start = FIRST_HOUR_BYTE + hour * HOUR_FIELD_WIDTH;
    // Last byte of each field is a remark flag
    line.get(start..start + HOUR_VALUE_WIDTH)
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&v| v != MISSING)
        .map(|v| v as f64)
        .unwrap_or(f64::NAN)
}

impl Metpv11 {
    /// Parse raw file bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut lines = bytes
            .split(|&b| b == b'\n')
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l));

        let header = lines.next().ok_or_else(|| PvError::Metpv("empty file".into()))?;
        let station = parse_station(header)?;

        let mut elements: HashMap<String, Vec<f64>> = HashMap::new();
        let mut skipped = 0usize;
        for line in lines {
            if line.len() < DATA_MIN_LEN {
                if !line.is_empty() {
                    skipped += 1;
                }
                continue;
            }
            let Some(code) = line.get(ELEMENT).and_then(|b| std::str::from_utf8(b).ok()) else {
                skipped += 1;
                continue;
            };
            let values = elements.entry(code.trim().to_string()).or_default();
            values.extend((0..24).map(|h| hourly_value(line, h)));
        }
        if skipped > 0 {
            debug!(lines = skipped, "short or unreadable METPV-11 records skipped");
        }

        Ok(Self { station, elements })
    }

    /// Values of one element scaled to SI units, padded or cut to a typical year.
    pub fn series(&self, code: &str, scale: f64) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .elements
            .get(code)
            .map(|v| v.iter().map(|x| x * scale).collect())
            .unwrap_or_default();
        if values.len() < HOURS_PER_YEAR {
            warn!(element = code, found = values.len(), "METPV-11 element short of a full year, padding");
        } else if values.len() > HOURS_PER_YEAR {
            warn!(
                element = code,
                found = values.len(),
                dropped = values.len() - HOURS_PER_YEAR,
                "METPV-11 element longer than a typical year, truncating"
            );
        }
        values.resize(HOURS_PER_YEAR, f64::NAN);
        values
    }

    /// Clean rows on consecutive hours from 2016-01-01 00:00.
    pub fn to_clean_rows(&self) -> Vec<CleanRow> {
        let ghi = self.series(ELEMENT_GHI, IRRADIANCE_SCALE);
        let beam = self.series(ELEMENT_BEAM_HORIZONTAL, IRRADIANCE_SCALE);
        let dhi = self.series(ELEMENT_DIFFUSE, IRRADIANCE_SCALE);
        let temp = self.series(ELEMENT_TEMPERATURE, TENTHS_SCALE);
        let wind = self.series(ELEMENT_WIND, TENTHS_SCALE);

        let finite = |v: f64| Some(v).filter(|x| x.is_finite());
        let start = base_time();
        (0..HOURS_PER_YEAR)
            .map(|h| CleanRow {
                date_time: format_time(start + Duration::hours(h as i64)),
                ghi: finite(ghi[h]),
                beam_horizontal: finite(beam[h]),
                dhi: finite(dhi[h]),
                temperature: finite(temp[h]),
                wind_speed: finite(wind[h]),
                latitude: Some(self.station.latitude),
                longitude: Some(self.station.longitude),
                elevation: Some(self.station.elevation),
            })
            .collect()
    }
}

/// Convert a METPV-11 fixed-width file to the clean weather CSV.
pub fn convert_metpv11<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ConversionSummary> {
    let bytes = fs::read(input.as_ref())?;
    let parsed = Metpv11::parse(&bytes)?;
    info!(
        id = %parsed.station.id,
        name = %parsed.station.name,
        lat = parsed.station.latitude,
        lon = parsed.station.longitude,
        elevation = parsed.station.elevation,
        "METPV-11 station"
    );
    let rows = parsed.to_clean_rows();
    write_clean_csv(output, &rows)?;
    Ok(ConversionSummary::from_rows(&rows, Some(parsed.station)))
}

// ===================== HORIZONTAL CSV =====================

/// Element type codes of the horizontal export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HorizontalElement {
    Ghi,
    Diffuse,
    Temperature,
    Wind,
}

impl HorizontalElement {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Ghi),
            2 => Some(Self::Diffuse),
            5 => Some(Self::Temperature),
            7 => Some(Self::Wind),
            _ => None,
        }
    }

    fn scale(self) -> f64 {
        match self {
            Self::Ghi | Self::Diffuse => IRRADIANCE_SCALE,
            Self::Temperature | Self::Wind => TENTHS_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HourValues {
    ghi: f64,
    dhi: f64,
    temperature: f64,
    wind: f64,
}

/// Parsed horizontal export
#[derive(Debug, Clone)]
pub struct HorizontalExport {
    /// Latitude, longitude, elevation from the first row, when readable
    pub location: Option<(f64, f64, f64)>,
    /// Keyed by (month, day), 24 hourly values per day
    days: BTreeMap<(u32, u32), [HourValues; 24]>,
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse::<f64>().ok().map(|v| v as i64)
}

fn parse_location(fields: &[String]) -> Option<(f64, f64, f64)> {
    if fields.len() < 7 {
        return None;
    }
    let num = |i: usize| fields[i].trim().parse::<f64>().ok();
    Some((num(2)? + num(3)? / 60.0, num(4)? + num(5)? / 60.0, num(6)?))
}

impl HorizontalExport {
    /// Parse a horizontal export.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);

        let mut location = None;
        let mut days: BTreeMap<(u32, u32), [HourValues; 24]> = BTreeMap::new();
        let mut skipped = 0usize;

        for (idx, rec) in rdr.byte_records().enumerate() {
            let rec = rec?;
            let fields: Vec<String> = rec
                .iter()
                .map(|f| String::from_utf8_lossy(f).trim().trim_start_matches('\u{feff}').to_string())
                .collect();

            if idx == 0 {
                location = parse_location(&fields);
                match location {
                    Some((lat, lon, elev)) => info!(lat, lon, elevation = elev, "station metadata found"),
                    None => warn!("station header row unreadable, no site metadata"),
                }
                continue;
            }
            if fields.len() < HORIZONTAL_MIN_FIELDS {
                continue;
            }

            let parsed = (|| {
                let element = HorizontalElement::from_code(parse_int(&fields[0])?);
                let month = u32::try_from(parse_int(&fields[1])?).ok()?;
                let day = u32::try_from(parse_int(&fields[2])?).ok()?;
                NaiveDate::from_ymd_opt(BASE_YEAR, month, day)?;
                let values: Option<Vec<f64>> = fields[HORIZONTAL_FIRST_HOUR..HORIZONTAL_FIRST_HOUR + 24]
                    .iter()
                    .map(|v| if v.is_empty() { Some(0.0) } else { v.parse::<f64>().ok() })
                    .collect();
                Some((element, month, day, values?))
            })();

            let Some((element, month, day, values)) = parsed else {
                skipped += 1;
                continue;
            };
            let hours = days.entry((month, day)).or_insert([HourValues::default(); 24]);
            let Some(element) = element else { continue };
            let scale = element.scale();
            for (slot, v) in hours.iter_mut().zip(values) {
                let v = v * scale;
                match element {
                    HorizontalElement::Ghi => slot.ghi = v,
                    HorizontalElement::Diffuse => slot.dhi = v,
                    HorizontalElement::Temperature => slot.temperature = v,
                    HorizontalElement::Wind => slot.wind = v,
                }
            }
        }

        if skipped > 0 {
            warn!(rows = skipped, "unparsable horizontal export rows skipped");
        }
        if days.is_empty() {
            return Err(PvError::Metpv("no data records found in horizontal export".into()));
        }
        Ok(Self { location, days })
    }

    /// Number of distinct days present
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Clean rows, days in calendar order laid out on consecutive hours from
    /// 2016-01-01 00:00 so a 365-day export stays gap-free.
    pub fn to_clean_rows(&self) -> Vec<CleanRow> {
        let start = base_time();
        let (latitude, longitude, elevation) = match self.location {
            Some((lat, lon, elev)) => (Some(lat), Some(lon), Some(elev)),
            None => (None, None, None),
        };
        self.days
            .values()
            .flat_map(|hours| hours.iter())
            .enumerate()
            .map(|(h, v)| CleanRow {
                date_time: format_time(start + Duration::hours(h as i64)),
                ghi: Some(v.ghi),
                beam_horizontal: None,
                dhi: Some(v.dhi),
                temperature: Some(v.temperature),
                wind_speed: Some(v.wind),
                latitude,
                longitude,
                elevation,
            })
            .collect()
    }
}

/// Convert a METPV horizontal CSV export to the clean weather CSV.
pub fn convert_metpv_horizontal<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<ConversionSummary> {
    let file = fs::File::open(input.as_ref())?;
    let export = HorizontalExport::parse(file)?;
    info!(days = export.day_count(), "horizontal export parsed");
    let rows = export.to_clean_rows();
    write_clean_csv(output, &rows)?;
    let station = export.location.map(|(latitude, longitude, elevation)| Station {
        id: String::new(),
        name: String::new(),
        latitude,
        longitude,
        elevation,
    });
    Ok(ConversionSummary::from_rows(&rows, station))
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::tests::capture_logs;
    use crate::weather::{HOURS_PER_LEAP_YEAR, RawWeather};
    use chrono::Datelike;
    use chrono_tz::Asia::Tokyo;

    fn metpv11_header() -> String {
        format!("{:>5} {:<20}{:>5}{:>5}{:>5}{:>5}{:>8}", "53091", "TSU", "34", "43.8", "136", "31.2", "2.7")
    }

    fn metpv11_day(element: &str, month: u32, day: u32, value: impl Fn(usize) -> i64) -> String {
        let mut s = format!("{:>5} {:>2}{:>2}     ", element, month, day);
        for h in 0..24 {
            s.push_str(&format!("{:>4} ", value(h)));
        }
        s
    }

    fn sample_metpv11() -> String {
        let mut lines = vec![metpv11_header()];
        for day in 1..=2 {
            lines.push(metpv11_day("00001", 1, day, |h| if (9..15).contains(&h) { 100 } else { 0 }));
            lines.push(metpv11_day("00002", 1, day, |h| if (9..15).contains(&h) { 60 } else { 0 }));
            lines.push(metpv11_day("00003", 1, day, |h| if (9..15).contains(&h) { 40 } else { 0 }));
            lines.push(metpv11_day("00005", 1, day, |h| if h == 3 { MISSING } else { 52 }));
            lines.push(metpv11_day("00007", 1, day, |_| 25));
        }
        lines.join("\r\n")
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pvyield-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_parse_metpv11_station() {
        let parsed = Metpv11::parse(sample_metpv11().as_bytes()).unwrap();
        let st = &parsed.station;
        assert_eq!(st.id, "53091");
        assert_eq!(st.name, "TSU");
        assert!((st.latitude - 34.73).abs() < 1e-9);
        assert!((st.longitude - 136.52).abs() < 1e-9);
        assert_eq!(st.elevation, 2.7);
    }

    #[test]
    fn test_parse_metpv11_values_and_units() {
        let parsed = Metpv11::parse(sample_metpv11().as_bytes()).unwrap();
        assert_eq!(parsed.elements["00001"].len(), 48);

        let rows = parsed.to_clean_rows();
        assert_eq!(rows.len(), HOURS_PER_YEAR);
        assert_eq!(rows[0].date_time, "2016-01-01 00:00:00");
        assert_eq!(rows[8759].date_time, "2016-12-30 23:00:00");

        let noon = &rows[10];
        assert!((noon.ghi.unwrap() - 277.78).abs() < 0.01);
        assert!((noon.beam_horizontal.unwrap() - 166.67).abs() < 0.01);
        assert!((noon.temperature.unwrap() - 5.2).abs() < 1e-9);
        assert!((noon.wind_speed.unwrap() - 2.5).abs() < 1e-9);

        // 8888 is missing, not a temperature
        assert_eq!(rows[3].temperature, None);
        // Hours beyond the data are missing
        assert_eq!(rows[100].ghi, None);
    }

    #[test]
    fn test_metpv11_series_truncates_long_element() {
        let mut parsed = Metpv11::parse(sample_metpv11().as_bytes()).unwrap();
        let leap: Vec<f64> = (0..HOURS_PER_LEAP_YEAR).map(|h| h as f64).collect();
        parsed.elements.insert(ELEMENT_TEMPERATURE.to_string(), leap);

        let (temps, logs) = capture_logs(|| parsed.series(ELEMENT_TEMPERATURE, 1.0));
        assert_eq!(temps.len(), HOURS_PER_YEAR);
        assert_eq!(temps[HOURS_PER_YEAR - 1], (HOURS_PER_YEAR - 1) as f64);
        assert!(logs.contains("truncating"), "logs: {}", logs);
        assert!(logs.contains("dropped=24"), "logs: {}", logs);
    }

    #[test]
    fn test_metpv11_rejects_short_header() {
        assert!(matches!(Metpv11::parse(b"53091 TSU"), Err(PvError::Metpv(_))));
        assert!(matches!(Metpv11::parse(b""), Err(PvError::Metpv(_))));
    }

    #[test]
    fn test_metpv11_multibyte_station_name() {
        // Shift-JIS bytes in the name field must not shift the numeric columns
        let mut header = metpv11_header().into_bytes();
        header[6] = 0x92;
        header[7] = 0xc3;
        let parsed = Metpv11::parse(&header).unwrap();
        assert!((parsed.station.latitude - 34.73).abs() < 1e-9);
    }

    #[test]
    fn test_convert_metpv11_round_trips_through_loader() {
        let input = temp_path("mea.txt");
        let output = temp_path("mea.csv");
        fs::write(&input, sample_metpv11()).unwrap();

        let summary = convert_metpv11(&input, &output).unwrap();
        assert_eq!(summary.rows, HOURS_PER_YEAR);
        assert!((summary.annual_ghi_kwh_m2 - 12.0 * 0.27778).abs() < 0.01);

        let raw = RawWeather::from_path(&output).unwrap();
        assert!((raw.metadata.latitude.unwrap() - 34.73).abs() < 1e-9);
        let series = raw.localize(&Tokyo).unwrap();
        assert_eq!(series.len(), HOURS_PER_YEAR);
        assert!(series.records[10].beam_horizontal.is_some());

        let _ = fs::remove_file(input);
        let _ = fs::remove_file(output);
    }

    fn sample_horizontal() -> String {
        let mut s = String::from("\u{feff}53091,TSU,34,43.8,136,31.2,2.7\n");
        for (month, days) in [(1, 31), (2, 28), (3, 31), (4, 30), (5, 31), (6, 30),
                              (7, 31), (8, 31), (9, 30), (10, 31), (11, 30), (12, 31)] {
            for day in 1..=days {
                for (kind, v) in [(1, "90"), (2, "36"), (5, "150"), (7, "20")] {
                    s.push_str(&format!("{},{},{},2009", kind, month, day));
                    for h in 0..24 {
                        let v = if kind <= 2 && !(8..16).contains(&h) { "0" } else { v };
                        s.push_str(&format!(",{}", v));
                    }
                    s.push_str(",999\n");
                }
            }
        }
        s
    }

    #[test]
    fn test_parse_horizontal_export() {
        let export = HorizontalExport::parse(sample_horizontal().as_bytes()).unwrap();
        let (lat, lon, elev) = export.location.unwrap();
        assert!((lat - 34.73).abs() < 1e-9);
        assert!((lon - 136.52).abs() < 1e-9);
        assert_eq!(elev, 2.7);
        assert_eq!(export.day_count(), 365);

        let rows = export.to_clean_rows();
        assert_eq!(rows.len(), HOURS_PER_YEAR);
        assert!((rows[12].ghi.unwrap() - 250.0).abs() < 1e-9);
        assert!((rows[12].dhi.unwrap() - 100.0).abs() < 1e-9);
        assert!((rows[12].temperature.unwrap() - 15.0).abs() < 1e-9);
        assert_eq!(rows[12].beam_horizontal, None);
    }

    #[test]
    fn test_horizontal_layout_is_gap_free() {
        let rows = HorizontalExport::parse(sample_horizontal().as_bytes()).unwrap().to_clean_rows();
        // March 1st data follows Feb 28th directly on leap-year 2016
        let march_first = 59 * 24;
        assert_eq!(rows[march_first].date_time, "2016-02-29 00:00:00");

        let output = temp_path("hm.csv");
        write_clean_csv(&output, &rows).unwrap();
        let series = RawWeather::from_path(&output).unwrap().localize(&Tokyo).unwrap();
        assert_eq!(series.records.last().unwrap().timestamp.day(), 30);
        let _ = fs::remove_file(output);
    }

    #[test]
    fn test_horizontal_skips_junk_rows() {
        let mut text = sample_horizontal();
        text.push_str("x,y,z\n");
        text.push_str(&format!("abc,1,1,2009{}\n", ",0".repeat(24)));
        let export = HorizontalExport::parse(text.as_bytes()).unwrap();
        assert_eq!(export.day_count(), 365);
    }

    #[test]
    fn test_horizontal_without_data_is_error() {
        assert!(matches!(
            HorizontalExport::parse("53091,TSU\n".as_bytes()),
            Err(PvError::Metpv(_))
        ));
    }
}
