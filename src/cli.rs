//! Command-Line Interface Module
//!
//! Handles argument parsing and validation for the pvyield application.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{IrradianceMode, IrradianceOverrides, Preset, SiteOverrides};
use crate::decomposition::DecompositionModel;
use crate::pvsystem::Engine;
use crate::report::Granularity;
use crate::solar::{SamplingInstant, SolarModel};

// ===================== CLI =====================

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true, env = "PVYIELD_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a year of hourly AC output for a plant
    Simulate(SimulateArgs),
    /// Convert a METPV-11 fixed-width station file to the weather CSV
    #[command(name = "convert-metpv11")]
    ConvertMetpv11(ConvertArgs),
    /// Convert a METPV horizontal CSV export to the weather CSV
    ConvertMetpvHorizontal(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Source file
    #[arg(long)]
    pub input: PathBuf,
    /// Weather CSV to write (replaced if present)
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Hourly weather CSV (DateTime, GHI, Temperature, optional DNI/DHI/wind)
    #[arg(long, env = "PVYIELD_WEATHER")]
    pub weather: PathBuf,
    /// Plant description (JSON); the built-in 9-PCS plant when omitted
    #[arg(long, env = "PVYIELD_PLANT")]
    pub plant: Option<PathBuf>,

    // ===================== SITE =====================
    /// Site latitude in decimal degrees (-90 to 90)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude, env = "PVYIELD_LATITUDE")]
    pub latitude: Option<f64>,
    /// Site longitude in decimal degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude, env = "PVYIELD_LONGITUDE")]
    pub longitude: Option<f64>,
    /// Site elevation above mean sea level (meters, may be negative)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_elevation, env = "PVYIELD_ELEVATION")]
    pub elevation: Option<f64>,
    /// Time zone of the weather timestamps ("location", "utc", or IANA name)
    #[arg(long, env = "PVYIELD_TIMEZONE")]
    pub timezone: Option<String>,

    // ===================== ARRAY =====================
    /// Panel tilt in degrees, replaces the plant file value (0 = horizontal)
    #[arg(long, value_parser = parse_tilt, env = "PVYIELD_TILT")]
    pub tilt: Option<f64>,
    /// Panel azimuth: degrees (180 = south) or text such as "10 degrees West"
    #[arg(long, allow_hyphen_values = true, value_parser = parse_azimuth, env = "PVYIELD_AZIMUTH")]
    pub azimuth: Option<f64>,

    // ===================== IRRADIANCE MODEL =====================
    /// Named model setup; explicit options below override it
    #[arg(long, value_enum, env = "PVYIELD_PRESET")]
    pub preset: Option<Preset>,
    /// Mono-facial or bifacial irradiance
    #[arg(long, value_enum, env = "PVYIELD_MODE")]
    pub mode: Option<IrradianceMode>,
    /// Ground albedo (0.0-1.0, 0.2 = grass)
    #[arg(long, value_parser = parse_fraction, env = "PVYIELD_ALBEDO")]
    pub albedo: Option<f64>,
    /// Height of the module center above ground (meters)
    #[arg(long, value_parser = parse_positive_f64, env = "PVYIELD_HUB_HEIGHT")]
    pub hub_height: Option<f64>,
    /// Rear-to-front efficiency ratio (0.0-1.0)
    #[arg(long, value_parser = parse_fraction, env = "PVYIELD_BIFACIALITY")]
    pub bifaciality: Option<f64>,
    /// Ground coverage ratio, collector width over row pitch (0-1)
    #[arg(long, value_parser = parse_gcr, env = "PVYIELD_GCR")]
    pub gcr: Option<f64>,
    /// Instant within each hour at which the sun is sampled
    #[arg(long, value_enum, env = "PVYIELD_SAMPLING")]
    pub sampling: Option<SamplingInstant>,

    // ===================== MODEL CHAIN =====================
    /// Sun position algorithm
    #[arg(long, value_enum, default_value_t = SolarModel::Spa, env = "PVYIELD_SOLAR_MODEL")]
    pub solar_model: SolarModel,
    /// GHI decomposition used when no beam component is available
    #[arg(long, value_enum, default_value_t = DecompositionModel::Erbs, env = "PVYIELD_DECOMPOSITION")]
    pub decomposition: DecompositionModel,
    /// DC/AC model chain
    #[arg(long, value_enum, default_value_t = Engine::Pvlib, env = "PVYIELD_ENGINE")]
    pub engine: Engine,
    /// System losses in percent, replaces the engine default
    #[arg(long, value_parser = parse_percent, env = "PVYIELD_LOSSES")]
    pub losses: Option<f64>,

    // ===================== OUTPUT =====================
    /// Results CSV to write
    #[arg(long, default_value = "pv_results.csv", env = "PVYIELD_OUTPUT")]
    pub output: PathBuf,
    /// Rows in the results CSV
    #[arg(long, value_enum, default_value_t = Granularity::Monthly, env = "PVYIELD_GRANULARITY")]
    pub granularity: Granularity,
    /// Annual energy (kWh) from another tool to compare against
    #[arg(long, value_parser = parse_positive_f64, env = "PVYIELD_TARGET_KWH")]
    pub target_kwh: Option<f64>,
    /// Accepted gap to the target in percent
    #[arg(long, default_value_t = 2.0, value_parser = parse_percent, env = "PVYIELD_TARGET_TOLERANCE")]
    pub target_tolerance: f64,
}

impl SimulateArgs {
    pub fn site_overrides(&self) -> SiteOverrides {
        SiteOverrides {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            timezone: self.timezone.clone(),
        }
    }

    pub fn irradiance_overrides(&self) -> IrradianceOverrides {
        IrradianceOverrides {
            mode: self.mode,
            albedo: self.albedo,
            hub_height: self.hub_height,
            bifaciality: self.bifaciality,
            gcr: self.gcr,
            sampling: self.sampling,
        }
    }
}

// ===================== CLI VALUE PARSERS =====================

fn parse_number(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !v.is_finite() {
        return Err(format!("Value must be finite, got {}", s));
    }
    Ok(v)
}

fn parse_latitude(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(-90.0..=90.0).contains(&v) {
        return Err(format!("Latitude must be between -90 and 90, got {}", v));
    }
    Ok(v)
}

fn parse_longitude(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(-180.0..=180.0).contains(&v) {
        return Err(format!("Longitude must be between -180 and 180, got {}", v));
    }
    Ok(v)
}

fn parse_elevation(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(-500.0..=9000.0).contains(&v) {
        return Err(format!("Elevation must be between -500 and 9000 meters, got {}", v));
    }
    Ok(v)
}

fn parse_positive_f64(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if v <= 0.0 {
        return Err(format!("Value must be positive, got {}", v));
    }
    Ok(v)
}

fn parse_tilt(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(0.0..=90.0).contains(&v) {
        return Err(format!("Tilt must be between 0 and 90 degrees, got {}", v));
    }
    Ok(v)
}

fn parse_azimuth(s: &str) -> Result<f64, String> {
    crate::config::parse_azimuth(s).map_err(|e| e.to_string())
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("Value must be between 0.0 and 1.0, got {}", v));
    }
    Ok(v)
}

fn parse_gcr(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if v <= 0.0 || v >= 1.0 {
        return Err(format!("Ground coverage ratio must be between 0 and 1 (exclusive), got {}", v));
    }
    Ok(v)
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let v = parse_number(s)?;
    if !(0.0..100.0).contains(&v) {
        return Err(format!("Percentage must be between 0 and 100, got {}", v));
    }
    Ok(v)
}

// ===================== TESTS =====================
