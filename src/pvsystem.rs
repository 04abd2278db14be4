//! PV System Model
//!
//! Per inverter group: cell temperature, incidence-angle modifier on the
//! beam, PVWatts DC power, system losses and the PVWatts inverter clipped
//! at the group's AC rating. Groups never interact.
//!
//! Powers are in kW, irradiance in W/m², temperatures in °C.
//!
//! References:
//! - Dobos, A. P. (2014). "PVWatts Version 5 Manual"
//! - King, D. L., Boyson, W. E. and Kratochvil, J. A. (2004). "Photovoltaic
//!   Array Performance Model" (SAPM cell temperature)
//! - De Soto, W., Klein, S. A. and Beckman, W. A. (2006). "Improvement and
//!   validation of a model for photovoltaic array performance" (physical IAM)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::irradiance::non_negative;

/// Reference irradiance for DC ratings (W/m²)
const REFERENCE_IRRADIANCE: f64 = 1000.0;
/// Reference cell temperature for DC ratings (°C)
const REFERENCE_CELL_TEMPERATURE: f64 = 25.0;

/// Nominal inverter efficiency
pub const ETA_INV_NOMINAL: f64 = 0.984;
/// Reference efficiency of the PVWatts inverter curve
const ETA_INV_REFERENCE: f64 = 0.9637;

/// Zeroth-order glass cover properties for the physical IAM
const GLASS_INDEX: f64 = 1.526;
const GLASS_EXTINCTION: f64 = 4.0;
const GLASS_THICKNESS: f64 = 0.002;

// ===================== ENGINE =====================

/// Set of sub-models used to turn plane-of-array irradiance into AC power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Engine {
    /// SAPM cell temperature, γ −0.29 %/°C, 14.08 % losses, no beam cutoff
    #[default]
    Pvlib,
    /// NOCT cell temperature, γ −0.37 %/°C, 5 % losses, beam cut beyond 87° zenith
    Pvwatts8,
}

impl Engine {
    pub fn temperature_model(self) -> TemperatureModel {
        match self {
            Engine::Pvlib => TemperatureModel::SAPM_OPEN_RACK_GLASS_GLASS,
            Engine::Pvwatts8 => TemperatureModel::NOCT_STANDARD,
        }
    }

    /// DC temperature coefficient (1/°C)
    pub fn gamma_pdc(self) -> f64 {
        match self {
            Engine::Pvlib => -0.0029,
            Engine::Pvwatts8 => -0.0037,
        }
    }

    /// System losses applied to DC power (%)
    pub fn default_losses_percent(self) -> f64 {
        match self {
            Engine::Pvlib => LossBreakdown::default().total_percent(),
            Engine::Pvwatts8 => 5.0,
        }
    }

    /// Zenith beyond which beam-on-horizontal is not converted to DNI
    pub fn beam_zenith_cutoff(self) -> Option<f64> {
        match self {
            Engine::Pvlib => None,
            Engine::Pvwatts8 => Some(87.0),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Pvlib => write!(f, "pvlib (PVWatts DC/AC, SAPM temperature)"),
            Engine::Pvwatts8 => write!(f, "pvwatts8 (PVWatts v8 conventions)"),
        }
    }
}

// ===================== CELL TEMPERATURE =====================

/// Cell temperature model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureModel {
    /// Sandia model: T_m = E·exp(a + b·WS) + T_a, T_c = T_m + E/1000·ΔT
    Sapm { a: f64, b: f64, delta_t: f64 },
    /// NOCT model as used by SAM, without mounting standoff adjustment
    Noct { noct: f64, module_efficiency: f64 },
}

impl TemperatureModel {
    pub const SAPM_OPEN_RACK_GLASS_GLASS: Self = Self::Sapm { a: -3.47, b: -0.0594, delta_t: 3.0 };
    pub const NOCT_STANDARD: Self = Self::Noct { noct: 45.0, module_efficiency: 0.191 };

    /// # Arguments
    /// * `poa_global` - Plane-of-array irradiance (W/m²)
    /// * `temp_air` - Ambient temperature (°C)
    /// * `wind_speed` - Wind speed at 10 m (m/s)
    pub fn cell_temperature(&self, poa_global: f64, temp_air: f64, wind_speed: f64) -> f64 {
        let e = non_negative(poa_global);
        let ws = non_negative(wind_speed);
        match *self {
            Self::Sapm { a, b, delta_t } => {
                let module = e * (a + b * ws).exp() + temp_air;
                module + e / REFERENCE_IRRADIANCE * delta_t
            }
            Self::Noct { noct, module_efficiency } => {
                const TAU_ALPHA: f64 = 0.9;
                // Wind measured at 10 m, reduced to array height
                let wind_adj = 0.51 * ws;
                let heat_transfer = 9.5 / (5.7 + 3.8 * wind_adj);
                temp_air
                    + e / 800.0 * (noct - 20.0) * (1.0 - module_efficiency / TAU_ALPHA) * heat_transfer
            }
        }
    }
}

// ===================== IAM / DC / LOSSES / INVERTER =====================

/// Physical incidence angle modifier for a glass cover (Fresnel reflection
/// plus absorption), relative to normal incidence.
pub fn iam_physical(aoi_deg: f64) -> f64 {
    if !aoi_deg.is_finite() || aoi_deg.abs() >= 90.0 {
        return 0.0;
    }
    let aoi = if aoi_deg == 0.0 { 1e-6 } else { aoi_deg }.to_radians();
    let n = GLASS_INDEX;
    let kl = GLASS_EXTINCTION * GLASS_THICKNESS;

    let refracted = (aoi.sin() / n).asin();
    let rho_zero = ((1.0 - n) / (1.0 + n)).powi(2);
    let tau_zero = (-kl).exp();

    let rho_para = ((refracted - aoi).tan() / (refracted + aoi).tan()).powi(2);
    let rho_perp = ((refracted - aoi).sin() / (refracted + aoi).sin()).powi(2);
    let tau = (-kl / refracted.cos()).exp();

    non_negative((1.0 - (rho_para + rho_perp) / 2.0) / (1.0 - rho_zero) * tau / tau_zero)
}

/// PVWatts DC power (kW).
///
/// # Arguments
/// * `effective_irradiance` - Irradiance reaching the cells (W/m²)
/// * `temp_cell` - Cell temperature (°C)
/// * `pdc0_kw` - DC rating at 1000 W/m², 25 °C
/// * `gamma_pdc` - Temperature coefficient (1/°C)
pub fn pvwatts_dc(effective_irradiance: f64, temp_cell: f64, pdc0_kw: f64, gamma_pdc: f64) -> f64 {
    effective_irradiance / REFERENCE_IRRADIANCE
        * pdc0_kw
        * (1.0 + gamma_pdc * (temp_cell - REFERENCE_CELL_TEMPERATURE))
}

/// PVWatts loss categories (%), combined multiplicatively
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    pub soiling: f64,
    pub shading: f64,
    pub snow: f64,
    pub mismatch: f64,
    pub wiring: f64,
    pub connections: f64,
    pub lid: f64,
    pub nameplate_rating: f64,
    pub age: f64,
    pub availability: f64,
}

impl Default for LossBreakdown {
    fn default() -> Self {
        Self {
            soiling: 2.0,
            shading: 3.0,
            snow: 0.0,
            mismatch: 2.0,
            wiring: 2.0,
            connections: 0.5,
            lid: 1.5,
            nameplate_rating: 1.0,
            age: 0.0,
            availability: 3.0,
        }
    }
}

impl LossBreakdown {
    pub fn total_percent(&self) -> f64 {
        let parts = [
            self.soiling,
            self.shading,
            self.snow,
            self.mismatch,
            self.wiring,
            self.connections,
            self.lid,
            self.nameplate_rating,
            self.age,
            self.availability,
        ];
        let kept: f64 = parts.iter().map(|l| 1.0 - l / 100.0).product();
        (1.0 - kept) * 100.0
    }
}

/// PVWatts inverter model (kW), clipped to `[0, pac0_kw]`.
///
/// The DC input rating is `pac0_kw / eta_nom`, so the curve reaches the AC
/// rating at nominal efficiency.
pub fn pvwatts_inverter(pdc_kw: f64, pac0_kw: f64, eta_nom: f64) -> f64 {
    let pdc = non_negative(pdc_kw);
    if pdc == 0.0 || pac0_kw <= 0.0 {
        return 0.0;
    }
    let pdc0 = pac0_kw / eta_nom;
    let zeta = pdc / pdc0;
    let eta = eta_nom / ETA_INV_REFERENCE * (-0.0162 * zeta - 0.0059 / zeta + 0.9858);
    non_negative(eta * pdc).min(pac0_kw)
}

// ===================== INVERTER GROUPS =====================

/// Identical inverter units sharing one DC/AC sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterGroup {
    pub id: String,
    pub unit_count: u32,
    /// DC rating per unit (kW)
    pub dc_kw: f64,
    /// AC rating per unit (kW)
    pub ac_kw: f64,
}

impl InverterGroup {
    pub fn new(id: &str, unit_count: u32, dc_kw: f64, ac_kw: f64) -> Self {
        Self { id: id.to_string(), unit_count, dc_kw, ac_kw }
    }

    pub fn dc_rating_kw(&self) -> f64 {
        self.unit_count as f64 * self.dc_kw
    }

    pub fn ac_rating_kw(&self) -> f64 {
        self.unit_count as f64 * self.ac_kw
    }

    pub fn dc_ac_ratio(&self) -> f64 {
        self.dc_kw / self.ac_kw
    }
}

/// Plane-of-array input to the system model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaneIrradiance {
    /// Total irradiance, including any rear-side contribution (W/m²)
    pub poa_global: f64,
    /// Front beam component (W/m²)
    pub poa_direct: f64,
    /// Front angle of incidence (degrees)
    pub aoi_deg: f64,
}

/// Engine parameters resolved for a run
#[derive(Debug, Clone, Copy)]
pub struct SystemModel {
    pub temperature: TemperatureModel,
    pub gamma_pdc: f64,
    pub losses_percent: f64,
    pub eta_inv_nom: f64,
}

impl SystemModel {
    /// Engine defaults, with an optional system loss override (%).
    pub fn new(engine: Engine, losses_percent: Option<f64>) -> Self {
        Self {
            temperature: engine.temperature_model(),
            gamma_pdc: engine.gamma_pdc(),
            losses_percent: losses_percent.unwrap_or_else(|| engine.default_losses_percent()),
            eta_inv_nom: ETA_INV_NOMINAL,
        }
    }

    /// Irradiance reaching the cells: the beam is reduced by the IAM,
    /// diffuse passes unchanged.
    pub fn effective_irradiance(&self, plane: &PlaneIrradiance) -> f64 {
        let direct = non_negative(plane.poa_direct);
        let diffuse = non_negative(plane.poa_global - direct);
        direct * iam_physical(plane.aoi_deg) + diffuse
    }

    /// AC output of one group for one hour (kW).
    pub fn group_ac_kw(
        &self,
        group: &InverterGroup,
        plane: &PlaneIrradiance,
        temp_air: f64,
        wind_speed: f64,
    ) -> f64 {
        let effective = self.effective_irradiance(plane);
        if effective <= 0.0 {
            return 0.0;
        }
        let temp_cell = self.temperature.cell_temperature(plane.poa_global, temp_air, wind_speed);
        let pdc = pvwatts_dc(effective, temp_cell, group.dc_kw, self.gamma_pdc)
            * (1.0 - self.losses_percent / 100.0);
        let unit_ac = pvwatts_inverter(pdc, group.ac_kw, self.eta_inv_nom);
        non_negative(unit_ac * group.unit_count as f64)
    }
}

// ===================== TESTS =====================
