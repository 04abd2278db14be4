//! Aggregation and Reporting Module
//!
//! Sums hourly AC output into monthly and annual energy, prints the console
//! report and writes the results CSV.

use std::path::Path;

use chrono::Datelike;
use clap::ValueEnum;
use tracing::{info, warn};

use crate::config::{IrradianceMode, IrradianceModelConfig, PlantConfig, Preset, SiteLocation};
use crate::decomposition::DecompositionModel;
use crate::error::Result;
use crate::pvsystem::Engine;
use crate::simulation::SimulationRun;
use crate::solar::SolarModel;

// ===================== SUMMARIES =====================

/// AC energy of one calendar month
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    /// Year and month, e.g. "2017-01"
    pub label: String,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub id: String,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSummary {
    pub energy_kwh: f64,
    pub monthly: Vec<MonthlySummary>,
    pub groups: Vec<GroupTotal>,
    /// Highest hourly plant output (kW)
    pub peak_kw: f64,
}

/// Aggregate hourly output. Each hour contributes kW × 1 h.
pub fn summarize(run: &SimulationRun) -> AnnualSummary {
    let mut monthly: Vec<MonthlySummary> = Vec::new();
    let mut group_kwh = vec![0.0; run.group_ids.len()];
    let mut peak_kw: f64 = 0.0;

    for h in &run.hourly {
        let (year, month) = (h.timestamp.year(), h.timestamp.month());
        match monthly.last_mut() {
            Some(m) if m.year == year && m.month == month => m.energy_kwh += h.total_ac_kw,
            _ => monthly.push(MonthlySummary {
                year,
                month,
                label: h.timestamp.format("%Y-%m").to_string(),
                energy_kwh: h.total_ac_kw,
            }),
        }
        for (acc, kw) in group_kwh.iter_mut().zip(&h.group_ac_kw) {
            *acc += kw;
        }
        peak_kw = peak_kw.max(h.total_ac_kw);
    }

    let energy_kwh = monthly.iter().map(|m| m.energy_kwh).sum();
    let groups = run
        .group_ids
        .iter()
        .zip(group_kwh)
        .map(|(id, energy_kwh)| GroupTotal { id: id.clone(), energy_kwh })
        .collect();

    AnnualSummary { energy_kwh, monthly, groups, peak_kw }
}

// ===================== CALIBRATION =====================

/// External annual figure the run is compared against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTarget {
    pub energy_kwh: f64,
    /// Accepted gap (%)
    pub tolerance_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub target: CalibrationTarget,
    pub difference_kwh: f64,
    pub difference_percent: f64,
}

impl Calibration {
    pub fn within_tolerance(&self) -> bool {
        self.difference_percent.abs() <= self.target.tolerance_percent
    }
}

impl CalibrationTarget {
    /// Compare an annual result with the target. A gap beyond the tolerance
    /// is reported, never corrected.
    pub fn compare(&self, annual_kwh: f64) -> Calibration {
        let difference_kwh = annual_kwh - self.energy_kwh;
        let difference_percent =
            if self.energy_kwh != 0.0 { difference_kwh / self.energy_kwh * 100.0 } else { f64::INFINITY };
        let cal = Calibration { target: *self, difference_kwh, difference_percent };
        if !cal.within_tolerance() {
            warn!(
                target_kwh = self.energy_kwh,
                simulated_kwh = annual_kwh,
                gap_percent = %format!("{:+.2}", difference_percent),
                tolerance_percent = self.tolerance_percent,
                "calibration gap"
            );
        }
        cal
    }
}

// ===================== FORMATTING =====================

/// Format an energy figure with thousands separators, no decimals.
pub fn format_kwh(kwh: f64) -> String {
    let rounded = kwh.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// What the run was configured with, for the report header
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub weather_path: &'a Path,
    pub site: &'a SiteLocation,
    pub plant: &'a PlantConfig,
    pub engine: Engine,
    pub solar_model: SolarModel,
    pub decomposition: DecompositionModel,
    pub preset: Option<Preset>,
    pub irradiance: &'a IrradianceModelConfig,
}

/// Print the console report.
pub fn print_report(
    ctx: &ReportContext<'_>,
    run: &SimulationRun,
    summary: &AnnualSummary,
    calibration: Option<&Calibration>,
) {
    let irr = ctx.irradiance;
    let diag = &run.diagnostics;

    println!("=== PV Yield Simulation: {} ===", ctx.plant.name);
    println!("Weather   : {}", ctx.weather_path.display());
    println!(
        "Site      : {:.4}°, {:.4}° @ {:.1} m ({})",
        ctx.site.latitude, ctx.site.longitude, ctx.site.elevation, ctx.site.timezone
    );
    println!(
        "Array     : {:.0}° tilt, {:.0}° azimuth, {} inverters, {:.0} kW DC / {:.0} kW AC",
        ctx.plant.tilt,
        ctx.plant.azimuth,
        ctx.plant.unit_count(),
        ctx.plant.dc_rating_kw(),
        ctx.plant.ac_rating_kw()
    );
    println!("Engine    : {}", ctx.engine);
    match ctx.preset {
        Some(p) => println!("Preset    : {}", p),
        None => println!("Preset    : none"),
    }
    match irr.mode {
        IrradianceMode::Mono => println!("Mode      : mono-facial (albedo {:.2})", irr.albedo),
        IrradianceMode::Bifacial => println!(
            "Mode      : bifacial (albedo {:.2}, hub {:.2} m, GCR {:.3}, bifaciality {:.0}%)",
            irr.albedo,
            irr.hub_height,
            irr.gcr,
            irr.bifaciality * 100.0
        ),
    }
    println!("Sun       : {:?}, sampled {}", ctx.solar_model, irr.sampling);
    println!(
        "DNI       : {} measured, {} from beam-horizontal, {} decomposed ({:?})",
        diag.dni_sources.measured, diag.dni_sources.beam_horizontal, diag.dni_sources.decomposed, ctx.decomposition
    );
    println!("Losses    : {:.2}%", diag.losses_percent);
    println!("POA       : {:.1} kWh/m²", diag.poa_kwh_m2);

    println!();
    println!("Annual AC Energy: {} kWh", format_kwh(summary.energy_kwh));
    println!(
        "Specific yield  : {:.0} kWh/kWp | Peak output: {:.1} kW",
        summary.energy_kwh / ctx.plant.dc_rating_kw(),
        summary.peak_kw
    );
    for (g, cfg) in summary.groups.iter().zip(&ctx.plant.groups) {
        println!(
            "  Group {:<8}: {:>12} kWh ({} × {:.0}/{:.0} kW, DC/AC {:.2})",
            g.id,
            format_kwh(g.energy_kwh),
            cfg.unit_count,
            cfg.dc_kw,
            cfg.ac_kw,
            cfg.dc_ac_ratio()
        );
    }

    if let Some(cal) = calibration {
        println!();
        println!("Target          : {} kWh", format_kwh(cal.target.energy_kwh));
        println!(
            "Difference      : {} kWh ({:+.1}%){}",
            format_kwh(cal.difference_kwh),
            cal.difference_percent,
            if cal.within_tolerance() { "" } else { " [calibration gap]" }
        );
    }

    println!();
    println!("Monthly Production (kWh):");
    for m in &summary.monthly {
        println!("  {}: {:>10}", m.label, format_kwh(m.energy_kwh));
    }
}

// ===================== CSV OUTPUT =====================

/// Rows written to the results file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Granularity {
    /// `Month,AC_Energy_kWh`
    #[default]
    Monthly,
    /// `DateTime,<group ids>,Total_kW`
    Hourly,
}

pub fn write_monthly_csv<P: AsRef<Path>>(path: P, summary: &AnnualSummary) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(["Month", "AC_Energy_kWh"])?;
    for m in &summary.monthly {
        wtr.write_record([m.label.clone(), format!("{:.3}", m.energy_kwh)])?;
    }
    wtr.flush()?;
    info!(path = %path.as_ref().display(), rows = summary.monthly.len(), "monthly results written");
    Ok(())
}

pub fn write_hourly_csv<P: AsRef<Path>>(path: P, run: &SimulationRun) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    let header: Vec<&str> = std::iter::once("DateTime")
        .chain(run.group_ids.iter().map(String::as_str))
        .chain(std::iter::once("Total_kW"))
        .collect();
    wtr.write_record(&header)?;

    for h in &run.hourly {
        let mut row = Vec::with_capacity(header.len());
        row.push(h.timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string());
        row.extend(h.group_ac_kw.iter().map(|kw| format!("{:.3}", kw)));
        row.push(format!("{:.3}", h.total_ac_kw));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    info!(path = %path.as_ref().display(), rows = run.hourly.len(), "hourly results written");
    Ok(())
}

/// Write the results file at the requested granularity, replacing it.
pub fn write_results<P: AsRef<Path>>(
    path: P,
    granularity: Granularity,
    run: &SimulationRun,
    summary: &AnnualSummary,
) -> Result<()> {
    match granularity {
        Granularity::Monthly => write_monthly_csv(path, summary),
        Granularity::Hourly => write_hourly_csv(path, run),
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{HourlyResult, RunDiagnostics};
    use chrono::{Duration, TimeZone};
    use chrono_tz::Asia::Tokyo;

    /// Group A at 1 kW and group B at 2 kW around the clock, except a 50 kW
    /// spike at hour 100.
    fn flat_run() -> SimulationRun {
        let start = Tokyo.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let hourly = (0..8760)
            .map(|h| {
                let a = if h == 100 { 50.0 } else { 1.0 };
                HourlyResult { timestamp: start + Duration::hours(h), group_ac_kw: vec![a, 2.0], total_ac_kw: a + 2.0 }
            })
            .collect();
        SimulationRun {
            group_ids: vec!["A".into(), "B".into()],
            hourly,
            diagnostics: RunDiagnostics::default(),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pvyield-report-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_summarize_months_and_groups() {
        let s = summarize(&flat_run());
        assert_eq!(s.monthly.len(), 12);
        assert_eq!(s.monthly[0].label, "2017-01");
        assert_eq!(s.monthly[11].label, "2017-12");
        assert!((s.monthly[0].energy_kwh - (744.0 * 3.0 + 49.0)).abs() < 1e-9);
        assert!((s.monthly[1].energy_kwh - 672.0 * 3.0).abs() < 1e-9);

        let monthly_total: f64 = s.monthly.iter().map(|m| m.energy_kwh).sum();
        assert!((monthly_total - s.energy_kwh).abs() < 1e-9);
        assert!((s.energy_kwh - (8760.0 * 3.0 + 49.0)).abs() < 1e-9);

        assert_eq!(s.groups[0].id, "A");
        assert!((s.groups[0].energy_kwh - (8760.0 + 49.0)).abs() < 1e-9);
        assert!((s.groups[1].energy_kwh - 8760.0 * 2.0).abs() < 1e-9);
        assert_eq!(s.peak_kw, 52.0);
    }

    #[test]
    fn test_year_starting_mid_month_keeps_labels_distinct() {
        let mut run = flat_run();
        let start = Tokyo.with_ymd_and_hms(2017, 7, 15, 0, 0, 0).unwrap();
        for (h, r) in run.hourly.iter_mut().enumerate() {
            r.timestamp = start + Duration::hours(h as i64);
        }

        let s = summarize(&run);
        assert_eq!(s.monthly.len(), 13);
        assert_eq!(s.monthly[0].label, "2017-07");
        assert_eq!(s.monthly[12].label, "2018-07");
        let mut labels: Vec<&str> = s.monthly.iter().map(|m| m.label.as_str()).collect();
        labels.dedup();
        assert_eq!(labels.len(), 13);
    }

    #[test]
    fn test_calibration_gap() {
        let target = CalibrationTarget { energy_kwh: 1_535_110.0, tolerance_percent: 2.0 };
        let cal = target.compare(1_499_135.0);
        assert!((cal.difference_kwh + 35_975.0).abs() < 1e-6);
        assert!((cal.difference_percent + 2.343).abs() < 0.01);
        assert!(!cal.within_tolerance());

        assert!(target.compare(1_520_000.0).within_tolerance());
    }

    #[test]
    fn test_format_kwh() {
        assert_eq!(format_kwh(1_352_112.4), "1,352,112");
        assert_eq!(format_kwh(999.6), "1,000");
        assert_eq!(format_kwh(12.0), "12");
        assert_eq!(format_kwh(-35_975.0), "-35,975");
        assert_eq!(format_kwh(0.0), "0");
    }

    #[test]
    fn test_monthly_csv() {
        let run = flat_run();
        let path = temp_path("monthly.csv");
        write_results(&path, Granularity::Monthly, &run, &summarize(&run)).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.headers().unwrap(), vec!["Month", "AC_Energy_kWh"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 12);
        assert_eq!(&rows[1][0], "2017-02");
        assert_eq!(&rows[1][1], "2016.000");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_hourly_csv() {
        let run = flat_run();
        let path = temp_path("hourly.csv");
        write_results(&path, Granularity::Hourly, &run, &summarize(&run)).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        assert_eq!(rdr.headers().unwrap(), vec!["DateTime", "A", "B", "Total_kW"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 8760);
        assert_eq!(&rows[0][0], "2017-01-01 00:00:00+09:00");
        assert_eq!(&rows[100][1], "50.000");
        assert_eq!(&rows[100][3], "52.000");
        let _ = std::fs::remove_file(path);
    }
}
