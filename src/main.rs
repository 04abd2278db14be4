use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod bifacial;
mod cli;
mod config;
mod decomposition;
mod error;
mod irradiance;
mod metpv;
mod pvsystem;
mod report;
mod simulation;
mod solar;
mod time;
mod weather;

use cli::{Cli, Command, ConvertArgs, SimulateArgs};
use config::{IrradianceModelConfig, PlantConfig, SiteLocation};
use metpv::ConversionSummary;
use report::{CalibrationTarget, ReportContext};
use simulation::SimulationSettings;
use weather::RawWeather;

// ===================== MAIN =====================

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Simulate(args) => run_simulation(&args),
        Command::ConvertMetpv11(args) => {
            let summary = metpv::convert_metpv11(&args.input, &args.output)
                .with_context(|| format!("converting METPV-11 file {}", args.input.display()))?;
            print_conversion(&args, &summary);
            Ok(())
        }
        Command::ConvertMetpvHorizontal(args) => {
            let summary = metpv::convert_metpv_horizontal(&args.input, &args.output)
                .with_context(|| format!("converting METPV horizontal export {}", args.input.display()))?;
            print_conversion(&args, &summary);
            Ok(())
        }
    }
}

/// Log to stderr; RUST_LOG wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

// ===================== SIMULATE =====================

fn run_simulation(args: &SimulateArgs) -> Result<()> {
    let mut plant = match &args.plant {
        Some(path) => {
            PlantConfig::load(path).with_context(|| format!("loading plant configuration {}", path.display()))?
        }
        None => PlantConfig::default(),
    };
    if let Some(tilt) = args.tilt {
        plant.tilt = tilt;
    }
    if let Some(azimuth) = args.azimuth {
        plant.azimuth = azimuth;
    }
    plant.validate().context("invalid plant configuration")?;
    debug!(?plant, "plant");

    let raw = RawWeather::from_path(&args.weather)
        .with_context(|| format!("reading weather file {}", args.weather.display()))?;
    let site = SiteLocation::resolve(&args.site_overrides(), &plant.site, &raw.metadata)
        .context("resolving site location")?;
    info!(
        lat = site.latitude,
        lon = site.longitude,
        elevation = site.elevation,
        timezone = %site.timezone,
        "site"
    );

    let weather = raw
        .localize(&site.timezone)
        .with_context(|| format!("validating weather file {}", args.weather.display()))?;
    info!(
        hours = weather.len(),
        annual_ghi_kwh_m2 = weather.annual_ghi_kwh_m2(),
        "weather loaded"
    );

    let irradiance = IrradianceModelConfig::resolve(args.preset, &args.irradiance_overrides(), &plant);
    let settings = SimulationSettings {
        engine: args.engine,
        solar_model: args.solar_model,
        decomposition: args.decomposition,
        irradiance,
        losses_percent: args.losses,
    };

    let run = simulation::simulate(&weather, &site, &plant, &settings).context("running simulation")?;
    let summary = report::summarize(&run);
    let calibration = args
        .target_kwh
        .map(|energy_kwh| CalibrationTarget { energy_kwh, tolerance_percent: args.target_tolerance })
        .map(|target| target.compare(summary.energy_kwh));

    let ctx = ReportContext {
        weather_path: &args.weather,
        site: &site,
        plant: &plant,
        engine: args.engine,
        solar_model: args.solar_model,
        decomposition: args.decomposition,
        preset: args.preset,
        irradiance: &irradiance,
    };
    report::print_report(&ctx, &run, &summary, calibration.as_ref());

    report::write_results(&args.output, args.granularity, &run, &summary)
        .with_context(|| format!("writing results to {}", args.output.display()))?;
    println!();
    println!("Results written to {}", args.output.display());
    Ok(())
}

// ===================== CONVERT =====================

fn print_conversion(args: &ConvertArgs, summary: &ConversionSummary) {
    println!("=== Weather Conversion ===");
    println!("Input     : {}", args.input.display());
    println!("Output    : {}", args.output.display());
    if let Some(st) = &summary.station {
        if st.name.is_empty() {
            println!("Location  : {:.4}°, {:.4}° @ {:.1} m", st.latitude, st.longitude, st.elevation);
        } else {
            println!(
                "Station   : {} {} ({:.4}°, {:.4}° @ {:.1} m)",
                st.id, st.name, st.latitude, st.longitude, st.elevation
            );
        }
    }
    println!("Rows      : {}", summary.rows);
    println!("GHI       : {:.1} kWh/m² per year, peak {:.0} W/m²", summary.annual_ghi_kwh_m2, summary.peak_ghi);
    println!("Mean temp : {:.1} °C", summary.mean_temperature);
}
