//! Beam/diffuse resolution
//!
//! Weather files carry different subsets of irradiance: measured DNI,
//! beam-on-horizontal (METPV element 00002) or GHI only. This module turns
//! whatever is present into a consistent (DNI, DHI, GHI) triple.
//!
//! References:
//! - Erbs, D. G., Klein, S. A. and Duffie, J. A. (1982). "Estimation of the
//!   diffuse radiation fraction for hourly, daily and monthly-average global
//!   radiation"
//! - Maxwell, E. L. (1987). "A quasi-physical model for converting hourly
//!   global horizontal to direct normal insolation" (DISC)

use clap::ValueEnum;

use crate::irradiance::{
    MAX_DNI, extraterrestrial_irradiance, non_negative, pressure_ratio, relative_air_mass,
};
use crate::solar::SunPosition;
use crate::weather::WeatherRecord;

/// Smallest cos(zenith) used when forming the clearness index
const MIN_COS_ZENITH: f64 = 0.065;

/// Beyond this zenith the decomposition models return no beam
const MAX_DECOMPOSITION_ZENITH: f64 = 87.0;

/// Air mass ceiling for DISC
const DISC_MAX_AIRMASS: f64 = 12.0;

/// GHI to DNI decomposition model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DecompositionModel {
    /// Erbs et al. diffuse-fraction correlation
    #[default]
    Erbs,
    /// Maxwell DISC model
    Disc,
}

/// Where the beam component of a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DniSource {
    Measured,
    BeamHorizontal,
    Decomposed(DecompositionModel),
}

/// Resolved horizontal and normal irradiance for one record (W/m²)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components {
    pub dni: f64,
    pub dhi: f64,
    pub ghi: f64,
    pub source: DniSource,
}

/// How DNI is obtained when the weather file has no measured DNI
#[derive(Debug, Clone, Copy)]
pub struct DniPolicy {
    pub decomposition: DecompositionModel,
    /// Zenith beyond which beam-horizontal is not divided by cos(zenith).
    /// `None` divides at every daylight zenith.
    pub beam_zenith_cutoff: Option<f64>,
}

impl Default for DniPolicy {
    fn default() -> Self {
        Self { decomposition: DecompositionModel::Erbs, beam_zenith_cutoff: None }
    }
}

/// Clearness index kt = GHI / (I0 · cos Z), bounded to [0, max_kt].
pub fn clearness_index(ghi: f64, zenith_deg: f64, dni_extra: f64, max_kt: f64) -> f64 {
    let cos_zen = zenith_deg.to_radians().cos().max(MIN_COS_ZENITH);
    (non_negative(ghi) / (dni_extra * cos_zen)).clamp(0.0, max_kt)
}

/// Erbs decomposition, returns (DNI, DHI).
pub fn erbs(ghi: f64, zenith_deg: f64, day_of_year: u32) -> (f64, f64) {
    let ghi = non_negative(ghi);
    let kt = clearness_index(ghi, zenith_deg, extraterrestrial_irradiance(day_of_year), 2.0);

    let df = if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.8 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    };

    let dhi = df * ghi;
    let cos_zen = zenith_deg.to_radians().cos();
    let dni = if zenith_deg > MAX_DECOMPOSITION_ZENITH || cos_zen <= 0.0 {
        0.0
    } else {
        ((ghi - dhi) / cos_zen).max(0.0)
    };
    (dni, dhi)
}

/// DISC decomposition, returns DNI.
pub fn disc(ghi: f64, zenith_deg: f64, day_of_year: u32, altitude_m: f64) -> f64 {
    if zenith_deg > MAX_DECOMPOSITION_ZENITH {
        return 0.0;
    }
    let ghi = non_negative(ghi);
    let i0 = extraterrestrial_irradiance(day_of_year);
    let kt = clearness_index(ghi, zenith_deg, i0, 1.0);

    let am = (relative_air_mass(zenith_deg) * pressure_ratio(altitude_m)).min(DISC_MAX_AIRMASS);

    let kt2 = kt * kt;
    let kt3 = kt2 * kt;
    let (a, b, c) = if kt <= 0.6 {
        (
            0.512 - 1.56 * kt + 2.286 * kt2 - 2.222 * kt3,
            0.37 + 0.962 * kt,
            -0.28 + 0.932 * kt - 2.048 * kt2,
        )
    } else {
        (
            -5.743 + 21.77 * kt - 27.49 * kt2 + 11.56 * kt3,
            41.4 - 118.5 * kt + 66.05 * kt2 + 31.9 * kt3,
            -47.01 + 184.2 * kt - 222.0 * kt2 + 73.81 * kt3,
        )
    };
    let delta_kn = a + b * (c * am).exp();
    let knc = 0.866 - 0.122 * am + 0.0121 * am.powi(2) - 0.000653 * am.powi(3)
        + 1.4e-5 * am.powi(4);
    let kn = knc - delta_kn;

    non_negative(kn * i0)
}

/// Divide beam-on-horizontal by cos(zenith) to get DNI.
///
/// Results are clipped to `[0, MAX_DNI]`; with no cutoff, values near the
/// horizon saturate at the clip.
pub fn beam_horizontal_to_dni(beam_horizontal: f64, zenith_deg: f64, cutoff: Option<f64>) -> f64 {
    if let Some(max_zenith) = cutoff
        && zenith_deg >= max_zenith
    {
        return 0.0;
    }
    let cos_zen = zenith_deg.to_radians().cos();
    if cos_zen <= 0.0 {
        return 0.0;
    }
    non_negative(beam_horizontal / cos_zen).min(MAX_DNI)
}

/// Resolve (DNI, DHI, GHI) for one record.
///
/// Measured DNI wins, then beam-on-horizontal, then decomposition of GHI.
/// Missing DHI is the closure remainder GHI − DNI·cos Z.
pub fn resolve_components(
    record: &WeatherRecord,
    sun: &SunPosition,
    day_of_year: u32,
    altitude_m: f64,
    policy: &DniPolicy,
) -> Components {
    let ghi = non_negative(record.ghi);
    let cos_zen = sun.zenith_deg.to_radians().cos().max(0.0);

    let (dni, decomposed_dhi, source) = if let Some(dni) = record.dni {
        (non_negative(dni).min(MAX_DNI), None, DniSource::Measured)
    } else if let Some(bh) = record.beam_horizontal {
        let dni = beam_horizontal_to_dni(bh, sun.zenith_deg, policy.beam_zenith_cutoff);
        (dni, None, DniSource::BeamHorizontal)
    } else {
        match policy.decomposition {
            DecompositionModel::Erbs => {
                let (dni, dhi) = erbs(ghi, sun.zenith_deg, day_of_year);
                (dni, Some(dhi), DniSource::Decomposed(DecompositionModel::Erbs))
            }
            DecompositionModel::Disc => {
                let dni = disc(ghi, sun.zenith_deg, day_of_year, altitude_m);
                (dni, None, DniSource::Decomposed(DecompositionModel::Disc))
            }
        }
    };

    let dhi = match (record.dhi, decomposed_dhi) {
        (Some(dhi), _) => non_negative(dhi).min(MAX_DNI),
        (None, Some(dhi)) => dhi,
        (None, None) => (ghi - dni * cos_zen).max(0.0),
    };

    Components { dni, dhi, ghi, source }
}

// ===================== TESTS =====================
