//! Simulation pipeline
//!
//! Weather → sun position → DNI/DHI resolution → plane-of-array irradiance
//! (mono-facial or bifacial) → per-group AC power, one hour at a time.

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::bifacial::InfiniteSheds;
use crate::config::{IrradianceMode, IrradianceModelConfig, PlantConfig, SiteLocation};
use crate::decomposition::{DecompositionModel, DniPolicy, DniSource, resolve_components};
use crate::error::Result;
use crate::irradiance::plane_of_array_irradiance;
use crate::pvsystem::{Engine, PlaneIrradiance, SystemModel};
use crate::solar::{SolarCalc, SolarModel, series_year};
use crate::weather::{WeatherSeries, count_clear_sky_exceedances};

/// Everything that selects a model variant for a run
#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub engine: Engine,
    pub solar_model: SolarModel,
    pub decomposition: DecompositionModel,
    pub irradiance: IrradianceModelConfig,
    /// System losses (%), engine default when `None`
    pub losses_percent: Option<f64>,
}

/// AC output for one hour
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyResult {
    pub timestamp: DateTime<Tz>,
    /// kW per inverter group, in plant order
    pub group_ac_kw: Vec<f64>,
    pub total_ac_kw: f64,
}

/// Where the beam component came from over the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DniSourceCounts {
    pub measured: usize,
    pub beam_horizontal: usize,
    pub decomposed: usize,
}

/// Run-level figures for the report header
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunDiagnostics {
    /// Plane-of-array insolation, rear contribution included (kWh/m²)
    pub poa_kwh_m2: f64,
    pub dni_sources: DniSourceCounts,
    /// Hours above the clear-sky envelope
    pub clear_sky_exceedances: usize,
    pub losses_percent: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub group_ids: Vec<String>,
    pub hourly: Vec<HourlyResult>,
    pub diagnostics: RunDiagnostics,
}

/// Run the full year.
pub fn simulate(
    weather: &WeatherSeries,
    site: &SiteLocation,
    plant: &PlantConfig,
    settings: &SimulationSettings,
) -> Result<SimulationRun> {
    let timestamps = weather.timestamps();
    let calc = SolarCalc::new(
        site.latitude,
        site.longitude,
        site.elevation,
        series_year(&timestamps),
        settings.solar_model,
    )?;
    let sampling = settings.irradiance.sampling;
    let suns = calc.positions(&timestamps, sampling)?;
    debug!(hours = suns.len(), %sampling, "sun positions computed");

    let clear_sky_exceedances = count_clear_sky_exceedances(&weather.records, &suns, site.elevation);
    if clear_sky_exceedances > 0 {
        warn!(
            hours = clear_sky_exceedances,
            "GHI exceeds the clear-sky envelope by more than 50%, check units and timestamps"
        );
    }

    let policy = DniPolicy {
        decomposition: settings.decomposition,
        beam_zenith_cutoff: settings.engine.beam_zenith_cutoff(),
    };
    let model = SystemModel::new(settings.engine, settings.losses_percent);
    let irr = &settings.irradiance;
    let sheds = match irr.mode {
        IrradianceMode::Bifacial => {
            let sheds = InfiniteSheds::new(plant.tilt, plant.azimuth, irr.geometry(), irr.albedo, irr.bifaciality);
            info!(
                albedo = irr.albedo,
                hub_height = irr.hub_height,
                gcr = irr.gcr,
                pitch = sheds.geometry().pitch(),
                bifaciality = irr.bifaciality,
                ground_sky_view = sheds.ground_sky_view_factor(),
                "bifacial infinite-sheds model"
            );
            Some(sheds)
        }
        IrradianceMode::Mono => None,
    };

    let mut diagnostics = RunDiagnostics { clear_sky_exceedances, losses_percent: model.losses_percent, ..Default::default() };
    let mut hourly = Vec::with_capacity(weather.len());

    for (record, sun) in weather.records.iter().zip(&suns) {
        let c = resolve_components(record, sun, record.timestamp.ordinal(), site.elevation, &policy);
        match c.source {
            DniSource::Measured => diagnostics.dni_sources.measured += 1,
            DniSource::BeamHorizontal => diagnostics.dni_sources.beam_horizontal += 1,
            DniSource::Decomposed(_) => diagnostics.dni_sources.decomposed += 1,
        }

        let plane = match &sheds {
            Some(sheds) => {
                let bi = sheds.irradiance(sun, c.dni, c.dhi, c.ghi);
                PlaneIrradiance { poa_global: bi.poa_global, poa_direct: bi.front.poa_direct, aoi_deg: bi.front.aoi_deg }
            }
            None => {
                let poa = plane_of_array_irradiance(
                    c.dni,
                    c.dhi,
                    c.ghi,
                    sun.zenith_deg,
                    sun.azimuth_deg,
                    plant.tilt,
                    plant.azimuth,
                    irr.albedo,
                );
                PlaneIrradiance { poa_global: poa.poa_global, poa_direct: poa.poa_direct, aoi_deg: poa.aoi_deg }
            }
        };
        diagnostics.poa_kwh_m2 += plane.poa_global / 1000.0;

        let wind = record.wind_speed.unwrap_or(0.0);
        let group_ac_kw: Vec<f64> = plant
            .groups
            .iter()
            .map(|g| model.group_ac_kw(g, &plane, record.temp_air, wind))
            .collect();
        let total_ac_kw = group_ac_kw.iter().sum();

        hourly.push(HourlyResult { timestamp: record.timestamp, group_ac_kw, total_ac_kw });
    }

    if let Some(noon) = hourly.get(12) {
        debug!(timestamp = %noon.timestamp, total_ac_kw = noon.total_ac_kw, "first-day noon output");
    }

    Ok(SimulationRun { group_ids: plant.groups.iter().map(|g| g.id.clone()).collect(), hourly, diagnostics })
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IrradianceOverrides, Preset};
    use crate::solar::SamplingInstant;
    use crate::weather::tests::{TEST_LAT, TEST_LON, synthetic_series};
    use chrono_tz::Asia::Tokyo;

    fn site() -> SiteLocation {
        SiteLocation { latitude: TEST_LAT, longitude: TEST_LON, elevation: 0.0, timezone: Tokyo }
    }

    fn settings(preset: Preset, overrides: IrradianceOverrides) -> SimulationSettings {
        SimulationSettings {
            engine: Engine::Pvlib,
            solar_model: SolarModel::Spa,
            decomposition: DecompositionModel::Erbs,
            irradiance: IrradianceModelConfig::resolve(Some(preset), &overrides, &PlantConfig::default()),
            losses_percent: None,
        }
    }

    fn annual_kwh(run: &SimulationRun) -> f64 {
        run.hourly.iter().map(|h| h.total_ac_kw).sum()
    }

    #[test]
    fn test_deterministic() {
        let weather = synthetic_series();
        let s = settings(Preset::Level3, IrradianceOverrides::default());
        let a = simulate(&weather, &site(), &PlantConfig::default(), &s).unwrap();
        let b = simulate(&weather, &site(), &PlantConfig::default(), &s).unwrap();
        assert_eq!(a.hourly, b.hourly);
        assert_eq!(a.diagnostics, b.diagnostics);
    }

    #[test]
    fn test_plausible_yield_and_clipping() {
        let weather = synthetic_series();
        let plant = PlantConfig::default();
        let run = simulate(&weather, &site(), &plant, &settings(Preset::Level1, IrradianceOverrides::default())).unwrap();

        assert_eq!(run.hourly.len(), weather.len());
        assert_eq!(run.group_ids, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(run.diagnostics.dni_sources.beam_horizontal, weather.len());

        // Specific yield of a fixed-tilt plant in central Japan
        let specific = annual_kwh(&run) / plant.dc_rating_kw();
        assert!(specific > 900.0 && specific < 1800.0, "specific yield {}", specific);

        for h in &run.hourly {
            for (g, ac) in plant.groups.iter().zip(&h.group_ac_kw) {
                assert!(*ac >= 0.0 && *ac <= g.ac_rating_kw() + 1e-9);
            }
            assert!((h.total_ac_kw - h.group_ac_kw.iter().sum::<f64>()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bifacial_increases_yield() {
        let weather = synthetic_series();
        let plant = PlantConfig::default();
        let mono = simulate(&weather, &site(), &plant, &settings(Preset::Level1, IrradianceOverrides::default())).unwrap();
        let bifacial = simulate(&weather, &site(), &plant, &settings(Preset::Level2, IrradianceOverrides::default())).unwrap();

        let uplift = annual_kwh(&bifacial) / annual_kwh(&mono) - 1.0;
        assert!(uplift > 0.03 && uplift < 0.25, "uplift {}", uplift);
        assert!(bifacial.diagnostics.poa_kwh_m2 > mono.diagnostics.poa_kwh_m2);
    }

    #[test]
    fn test_sampling_instant_shift_is_small() {
        let weather = synthetic_series();
        let plant = PlantConfig::default();
        let top = IrradianceOverrides { sampling: Some(SamplingInstant::TopOfHour), ..Default::default() };
        let a = simulate(&weather, &site(), &plant, &settings(Preset::Level1, top)).unwrap();
        let b = simulate(&weather, &site(), &plant, &settings(Preset::Level1, IrradianceOverrides::default())).unwrap();

        let (ea, eb) = (annual_kwh(&a), annual_kwh(&b));
        assert!(ea != eb);
        assert!(((ea - eb) / eb).abs() < 0.15, "top {} vs mid {}", ea, eb);
    }

    #[test]
    fn test_ghi_only_weather_uses_decomposition() {
        let beam = synthetic_series();
        let mut ghi_only = beam.clone();
        for r in &mut ghi_only.records {
            r.beam_horizontal = None;
            r.dhi = None;
        }
        let plant = PlantConfig::default();
        let s = settings(Preset::Level1, IrradianceOverrides::default());
        let reference = annual_kwh(&simulate(&beam, &site(), &plant, &s).unwrap());

        for model in [DecompositionModel::Erbs, DecompositionModel::Disc] {
            let run = simulate(&ghi_only, &site(), &plant, &SimulationSettings { decomposition: model, ..s }).unwrap();
            assert_eq!(run.diagnostics.dni_sources.decomposed, ghi_only.len());
            let rel = (annual_kwh(&run) - reference).abs() / reference;
            assert!(rel < 0.2, "{:?} differs by {}", model, rel);
        }
    }

    #[test]
    fn test_pvwatts8_engine() {
        let weather = synthetic_series();
        let plant = PlantConfig::default();
        let base = settings(Preset::Level1, IrradianceOverrides::default());
        let pvlib = simulate(&weather, &site(), &plant, &base).unwrap();
        let pvwatts = simulate(&weather, &site(), &plant, &SimulationSettings { engine: Engine::Pvwatts8, ..base }).unwrap();

        assert_eq!(pvwatts.diagnostics.losses_percent, 5.0);
        assert!(annual_kwh(&pvwatts) > annual_kwh(&pvlib));
    }
}
