//! Plant and model configuration
//!
//! The plant (site, orientation, inverter groups, rack geometry) can be read
//! from JSON; anything absent falls back to the built-in 9-PCS plant.
//! Irradiance model settings come from a preset plus explicit overrides.

use std::path::Path;

use chrono_tz::Tz;
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::bifacial::ShedGeometry;
use crate::error::{PvError, Result};
use crate::pvsystem::InverterGroup;
use crate::solar::SamplingInstant;
use crate::time::site_timezone;
use crate::weather::FileMetadata;

/// Tsu, Mie prefecture
pub const DEFAULT_LATITUDE: f64 = 34.856;
pub const DEFAULT_LONGITUDE: f64 = 136.452;

/// Ground reflectance assumed when none is given
pub const FALLBACK_ALBEDO: f64 = 0.2;
/// Row-center height assumed when none is given (m)
pub const FALLBACK_HUB_HEIGHT: f64 = 1.5;
pub const DEFAULT_BIFACIALITY: f64 = 0.8;
/// Ground coverage ratio that makes row-to-row effects negligible
pub const IDEALIZED_GCR: f64 = 0.01;
pub const REALISTIC_GCR: f64 = 0.326;
pub const REALISTIC_HUB_HEIGHT: f64 = 1.2;

fn default_tilt() -> f64 {
    20.0
}
fn default_azimuth() -> f64 {
    185.0
}
fn default_timezone() -> String {
    "location".to_string()
}
/// Slant length of a 625 W module mounted portrait (m)
fn default_collector_width() -> f64 {
    2.382
}
fn default_groups() -> Vec<InverterGroup> {
    vec![InverterGroup::new("A", 4, 140.0, 100.0), InverterGroup::new("B", 5, 130.0, 95.0)]
}

// ===================== AZIMUTH =====================

/// Parse a surface azimuth given as degrees or compass text.
///
/// Plain numbers are absolute (0 = North, 180 = South). Text such as
/// `"5 degrees West"` is an offset from due South: West adds, East subtracts.
pub fn parse_azimuth(text: &str) -> Result<f64> {
    let text = text.trim();
    if let Ok(deg) = text.parse::<f64>() {
        return normalize_azimuth(deg, text);
    }

    let lower = text.to_ascii_lowercase();
    let number: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let offset = if number.is_empty() {
        None
    } else {
        Some(number.parse::<f64>().map_err(|_| PvError::Config(format!("invalid azimuth '{}'", text)))?)
    };

    let west = lower.contains("west");
    let east = lower.contains("east");
    let deg = match (offset, west, east) {
        (_, true, true) => return Err(PvError::Config(format!("ambiguous azimuth '{}'", text))),
        (Some(o), true, false) => 180.0 + o,
        (Some(o), false, true) => 180.0 - o,
        (Some(_), false, false) if lower.contains("deg") => 180.0,
        (None, false, false) if lower == "south" || lower == "s" => 180.0,
        _ => return Err(PvError::Config(format!("cannot read azimuth '{}'", text))),
    };
    normalize_azimuth(deg, text)
}

fn normalize_azimuth(deg: f64, text: &str) -> Result<f64> {
    if !(0.0..=360.0).contains(&deg) {
        return Err(PvError::Config(format!("azimuth '{}' is outside 0-360 degrees", text)));
    }
    Ok(deg)
}

fn deserialize_azimuth<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Azimuth {
        Degrees(f64),
        Text(String),
    }

    let parsed = match Azimuth::deserialize(deserializer)? {
        Azimuth::Degrees(d) => normalize_azimuth(d, &d.to_string()),
        Azimuth::Text(t) => parse_azimuth(&t),
    };
    parsed.map_err(serde::de::Error::custom)
}

// ===================== PLANT =====================

/// Site as written in the plant file; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub timezone: Option<String>,
}

/// Rack side-profile measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RackProfile {
    /// Front-to-front row spacing (m)
    pub pitch: Option<f64>,
    /// Ground to top edge of the rack (m)
    pub max_height: Option<f64>,
}

impl RackProfile {
    /// Ground coverage ratio implied by the pitch
    pub fn gcr(&self, collector_width: f64) -> Option<f64> {
        self.pitch.filter(|p| *p > 0.0).map(|p| collector_width / p)
    }

    /// Row-center height, half the top-edge height
    pub fn hub_height(&self) -> Option<f64> {
        self.max_height.filter(|h| *h > 0.0).map(|h| h / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default = "default_tilt")]
    pub tilt: f64,
    #[serde(default = "default_azimuth", deserialize_with = "deserialize_azimuth")]
    pub azimuth: f64,
    #[serde(default = "default_collector_width")]
    pub collector_width: f64,
    #[serde(default)]
    pub rack: Option<RackProfile>,
    #[serde(default = "default_groups")]
    pub groups: Vec<InverterGroup>,
}

impl Default for PlantConfig {
    /// The 9-PCS plant: 4 × 140/100 kW and 5 × 130/95 kW, 20° tilt, 5° West of South
    fn default() -> Self {
        Self {
            name: "9-PCS".to_string(),
            site: SiteConfig::default(),
            tilt: default_tilt(),
            azimuth: default_azimuth(),
            collector_width: default_collector_width(),
            rack: None,
            groups: default_groups(),
        }
    }
}

impl PlantConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.as_ref().display(), name = %config.name, "plant configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=90.0).contains(&self.tilt) {
            return Err(PvError::Config(format!("tilt {} is outside 0-90 degrees", self.tilt)));
        }
        if self.collector_width <= 0.0 {
            return Err(PvError::Config("collector_width must be positive".into()));
        }
        if self.groups.is_empty() {
            return Err(PvError::Config("plant has no inverter groups".into()));
        }
        for g in &self.groups {
            if g.unit_count == 0 || g.dc_kw <= 0.0 || g.ac_kw <= 0.0 {
                return Err(PvError::Config(format!(
                    "inverter group '{}' needs a positive unit count and ratings",
                    g.id
                )));
            }
        }
        let mut ids: Vec<&str> = self.groups.iter().map(|g| g.id.as_str()).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(PvError::Config("inverter group ids must be unique".into()));
        }
        Ok(())
    }

    pub fn unit_count(&self) -> u32 {
        self.groups.iter().map(|g| g.unit_count).sum()
    }

    pub fn dc_rating_kw(&self) -> f64 {
        self.groups.iter().map(|g| g.dc_rating_kw()).sum()
    }

    pub fn ac_rating_kw(&self) -> f64 {
        self.groups.iter().map(|g| g.ac_rating_kw()).sum()
    }
}

// ===================== SITE =====================

/// Resolved site location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub elevation: f64,
    pub timezone: Tz,
}

/// Site values given on the command line
#[derive(Debug, Clone, Default)]
pub struct SiteOverrides {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub timezone: Option<String>,
}

impl SiteLocation {
    /// Combine site sources, first present wins: command line, plant file,
    /// weather file metadata, built-in default.
    pub fn resolve(cli: &SiteOverrides, plant: &SiteConfig, file: &FileMetadata) -> Result<Self> {
        let latitude = cli
            .latitude
            .or(plant.latitude)
            .or(file.latitude)
            .unwrap_or(DEFAULT_LATITUDE);
        let longitude = cli
            .longitude
            .or(plant.longitude)
            .or(file.longitude)
            .unwrap_or(DEFAULT_LONGITUDE);
        let elevation = cli.elevation.or(plant.elevation).or(file.elevation).unwrap_or(0.0);

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PvError::Config(format!("site {}, {} is not a valid location", latitude, longitude)));
        }

        let tz_name = cli
            .timezone
            .clone()
            .or_else(|| plant.timezone.clone())
            .unwrap_or_else(default_timezone);
        let timezone = site_timezone(&tz_name, latitude, longitude)?;

        Ok(Self { latitude, longitude, elevation, timezone })
    }
}

// ===================== IRRADIANCE MODEL =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IrradianceMode {
    /// Front side only, isotropic transposition
    #[default]
    Mono,
    /// Front plus rear side, infinite-sheds model
    Bifacial,
}

/// Named model setups
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Mono-facial, no row-to-row effects
    #[value(name = "level1")]
    Level1,
    /// Bifacial, no row-to-row effects
    #[value(name = "level2")]
    Level2,
    /// Bifacial with realistic row spacing and ground clearance
    #[value(name = "level3")]
    Level3,
}

impl Preset {
    fn mode(self) -> IrradianceMode {
        match self {
            Preset::Level1 => IrradianceMode::Mono,
            Preset::Level2 | Preset::Level3 => IrradianceMode::Bifacial,
        }
    }

    fn gcr(self) -> f64 {
        match self {
            Preset::Level1 | Preset::Level2 => IDEALIZED_GCR,
            Preset::Level3 => REALISTIC_GCR,
        }
    }

    fn hub_height(self) -> Option<f64> {
        match self {
            Preset::Level1 => None,
            Preset::Level2 => Some(FALLBACK_HUB_HEIGHT),
            Preset::Level3 => Some(REALISTIC_HUB_HEIGHT),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Preset::Level1 => write!(f, "LEVEL_1"),
            Preset::Level2 => write!(f, "LEVEL_2"),
            Preset::Level3 => write!(f, "LEVEL_3"),
        }
    }
}

/// Explicit model settings; each one beats the preset
#[derive(Debug, Clone, Default)]
pub struct IrradianceOverrides {
    pub mode: Option<IrradianceMode>,
    pub albedo: Option<f64>,
    pub hub_height: Option<f64>,
    pub bifaciality: Option<f64>,
    pub gcr: Option<f64>,
    pub sampling: Option<SamplingInstant>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrradianceModelConfig {
    pub mode: IrradianceMode,
    pub albedo: f64,
    pub hub_height: f64,
    pub bifaciality: f64,
    pub gcr: f64,
    pub collector_width: f64,
    pub sampling: SamplingInstant,
}

impl IrradianceModelConfig {
    /// Resolve settings: explicit override, then preset, then the plant's
    /// rack profile, then documented fallbacks. Falling back for albedo or
    /// hub height in bifacial mode is logged.
    pub fn resolve(preset: Option<Preset>, overrides: &IrradianceOverrides, plant: &PlantConfig) -> Self {
        let rack = plant.rack.unwrap_or_default();
        let mode = overrides.mode.or(preset.map(Preset::mode)).unwrap_or_default();
        let bifacial = mode == IrradianceMode::Bifacial;

        let albedo = overrides.albedo.unwrap_or_else(|| {
            if bifacial {
                warn!(albedo = FALLBACK_ALBEDO, "no albedo given for bifacial mode, using fallback");
            }
            FALLBACK_ALBEDO
        });

        let hub_height = overrides
            .hub_height
            .or(preset.and_then(Preset::hub_height))
            .or(rack.hub_height())
            .unwrap_or_else(|| {
                if bifacial {
                    warn!(hub_height = FALLBACK_HUB_HEIGHT, "no hub height given for bifacial mode, using fallback");
                }
                FALLBACK_HUB_HEIGHT
            });

        let gcr = overrides
            .gcr
            .or(preset.map(Preset::gcr))
            .or(rack.gcr(plant.collector_width))
            .unwrap_or(IDEALIZED_GCR);

        Self {
            mode,
            albedo,
            hub_height,
            bifaciality: overrides.bifaciality.unwrap_or(DEFAULT_BIFACIALITY),
            gcr,
            collector_width: plant.collector_width,
            sampling: overrides.sampling.unwrap_or_default(),
        }
    }

    pub fn geometry(&self) -> ShedGeometry {
        ShedGeometry { gcr: self.gcr, hub_height: self.hub_height, collector_width: self.collector_width }
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::tests::capture_logs;

    #[test]
    fn test_parse_azimuth_text() {
        assert_eq!(parse_azimuth("5 degrees West").unwrap(), 185.0);
        assert_eq!(parse_azimuth("11 degrees east").unwrap(), 169.0);
        assert_eq!(parse_azimuth("0 degrees").unwrap(), 180.0);
        assert_eq!(parse_azimuth("7.5 deg West").unwrap(), 187.5);
        assert_eq!(parse_azimuth("South").unwrap(), 180.0);
        assert_eq!(parse_azimuth(" 185 ").unwrap(), 185.0);
    }

    #[test]
    fn test_parse_azimuth_rejects_nonsense() {
        assert!(parse_azimuth("up").is_err());
        assert!(parse_azimuth("5 degrees East West").is_err());
        assert!(parse_azimuth("400").is_err());
    }

    #[test]
    fn test_default_plant_is_nine_pcs() {
        let plant = PlantConfig::default();
        assert_eq!(plant.unit_count(), 9);
        assert_eq!(plant.dc_rating_kw(), 4.0 * 140.0 + 5.0 * 130.0);
        assert_eq!(plant.ac_rating_kw(), 4.0 * 100.0 + 5.0 * 95.0);
        assert_eq!(plant.tilt, 20.0);
        assert_eq!(plant.azimuth, 185.0);
        plant.validate().unwrap();
    }

    #[test]
    fn test_plant_json_with_text_azimuth() {
        let json = r#"{
            "name": "north field",
            "site": { "latitude": 35.0, "longitude": 136.9, "timezone": "Asia/Tokyo" },
            "azimuth": "10 degrees East",
            "rack": { "pitch": 7.306, "max_height": 2.372 },
            "groups": [ { "id": "P1", "unit_count": 2, "dc_kw": 120.0, "ac_kw": 90.0 } ]
        }"#;
        let plant: PlantConfig = serde_json::from_str(json).unwrap();
        assert_eq!(plant.azimuth, 170.0);
        assert_eq!(plant.tilt, 20.0);
        assert_eq!(plant.groups.len(), 1);
        assert_eq!(plant.site.elevation, None);

        let rack = plant.rack.unwrap();
        assert!((rack.gcr(plant.collector_width).unwrap() - 0.326).abs() < 1e-3);
        assert!((rack.hub_height().unwrap() - 1.186).abs() < 1e-9);
    }

    #[test]
    fn test_plant_json_numeric_azimuth_and_defaults() {
        let plant: PlantConfig = serde_json::from_str(r#"{ "azimuth": 190 }"#).unwrap();
        assert_eq!(plant.azimuth, 190.0);
        assert_eq!(plant.groups, PlantConfig::default().groups);
        assert!(serde_json::from_str::<PlantConfig>(r#"{ "azimuth": "sideways" }"#).is_err());
    }

    #[test]
    fn test_plant_validation() {
        let mut plant = PlantConfig::default();
        plant.groups[1].id = "A".into();
        assert!(matches!(plant.validate(), Err(PvError::Config(_))));

        let mut plant = PlantConfig::default();
        plant.tilt = 95.0;
        assert!(plant.validate().is_err());

        let mut plant = PlantConfig::default();
        plant.groups[0].ac_kw = 0.0;
        assert!(plant.validate().is_err());
    }

    #[test]
    fn test_site_precedence() {
        let file = FileMetadata { latitude: Some(34.73), longitude: Some(136.52), elevation: Some(2.7) };
        let plant = SiteConfig { latitude: Some(35.0), ..Default::default() };
        let cli = SiteOverrides { elevation: Some(10.0), timezone: Some("Asia/Tokyo".into()), ..Default::default() };

        let site = SiteLocation::resolve(&cli, &plant, &file).unwrap();
        assert_eq!(site.latitude, 35.0);
        assert_eq!(site.longitude, 136.52);
        assert_eq!(site.elevation, 10.0);
        assert_eq!(site.timezone, chrono_tz::Asia::Tokyo);

        let site = SiteLocation::resolve(&SiteOverrides::default(), &SiteConfig::default(), &FileMetadata::default())
            .unwrap();
        assert_eq!(site.latitude, DEFAULT_LATITUDE);
        assert_eq!(site.timezone, chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_site_rejects_bad_coordinates() {
        let cli = SiteOverrides { latitude: Some(95.0), ..Default::default() };
        assert!(SiteLocation::resolve(&cli, &SiteConfig::default(), &FileMetadata::default()).is_err());
    }

    #[test]
    fn test_presets() {
        let plant = PlantConfig::default();
        let none = IrradianceOverrides::default();

        let l1 = IrradianceModelConfig::resolve(Some(Preset::Level1), &none, &plant);
        assert_eq!(l1.mode, IrradianceMode::Mono);

        let l2 = IrradianceModelConfig::resolve(Some(Preset::Level2), &none, &plant);
        assert_eq!(l2.mode, IrradianceMode::Bifacial);
        assert_eq!(l2.albedo, FALLBACK_ALBEDO);
        assert_eq!(l2.hub_height, 1.5);
        assert_eq!(l2.gcr, IDEALIZED_GCR);
        assert_eq!(l2.bifaciality, 0.8);

        let l3 = IrradianceModelConfig::resolve(Some(Preset::Level3), &none, &plant);
        assert_eq!(l3.gcr, REALISTIC_GCR);
        assert_eq!(l3.hub_height, REALISTIC_HUB_HEIGHT);
        assert_eq!(l3.sampling, SamplingInstant::MidHour);
    }

    #[test]
    fn test_bifacial_without_settings_logs_fallbacks() {
        let bifacial = IrradianceOverrides { mode: Some(IrradianceMode::Bifacial), ..Default::default() };
        let (cfg, logs) =
            capture_logs(|| IrradianceModelConfig::resolve(None, &bifacial, &PlantConfig::default()));
        assert_eq!(cfg.mode, IrradianceMode::Bifacial);
        assert_eq!(cfg.albedo, FALLBACK_ALBEDO);
        assert_eq!(cfg.hub_height, FALLBACK_HUB_HEIGHT);
        assert_eq!(cfg.gcr, IDEALIZED_GCR);
        assert!(logs.contains("no albedo given for bifacial mode"), "logs: {}", logs);
        assert!(logs.contains("no hub height given for bifacial mode"), "logs: {}", logs);

        // Mono-facial runs use the same fallbacks silently
        let (_, logs) = capture_logs(|| {
            IrradianceModelConfig::resolve(None, &IrradianceOverrides::default(), &PlantConfig::default())
        });
        assert!(!logs.contains("bifacial mode"), "logs: {}", logs);
    }

    #[test]
    fn test_overrides_beat_preset() {
        let overrides = IrradianceOverrides {
            albedo: Some(0.3),
            hub_height: Some(2.0),
            mode: Some(IrradianceMode::Mono),
            sampling: Some(SamplingInstant::TopOfHour),
            ..Default::default()
        };
        let cfg = IrradianceModelConfig::resolve(Some(Preset::Level3), &overrides, &PlantConfig::default());
        assert_eq!(cfg.mode, IrradianceMode::Mono);
        assert_eq!(cfg.albedo, 0.3);
        assert_eq!(cfg.hub_height, 2.0);
        assert_eq!(cfg.gcr, REALISTIC_GCR);
        assert_eq!(cfg.sampling, SamplingInstant::TopOfHour);
    }

    #[test]
    fn test_rack_profile_fills_geometry_without_preset() {
        let plant = PlantConfig {
            rack: Some(RackProfile { pitch: Some(4.764), max_height: Some(3.0) }),
            ..Default::default()
        };
        let overrides = IrradianceOverrides { mode: Some(IrradianceMode::Bifacial), ..Default::default() };
        let cfg = IrradianceModelConfig::resolve(None, &overrides, &plant);
        assert!((cfg.gcr - 0.5).abs() < 1e-9);
        assert_eq!(cfg.hub_height, 1.5);
        assert!((cfg.geometry().pitch() - 4.764).abs() < 1e-9);
    }
}
