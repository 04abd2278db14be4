//! Bifacial Irradiance (2-D infinite sheds)
//!
//! Front and rear plane-of-array irradiance for fixed-tilt rows in an
//! infinitely long array. Rows mask part of the sky from each other, shade
//! part of the ground, and see reflected light from the ground between rows.
//!
//! Positions along the module slant height are expressed as a fraction
//! `x` of the collector width (0 = lower edge, 1 = upper edge); positions on
//! the ground as a fraction of the pitch.
//!
//! References:
//! - Mikofski, M., Darawali, R., Hamer, M., Neubert, A. and Newmiller, J.
//!   (2019). "Bifacial Performance Modeling in Large Arrays"
//! - Marion, B. et al. (2017). "A Practical Irradiance Model for Bifacial PV
//!   Modules"

use crate::irradiance::{PoaComponents, angle_of_incidence, cos_aoi, non_negative};
use crate::solar::SunPosition;

/// Integration points along the slant height and along the ground
const NPOINTS: usize = 100;

/// Beyond this zenith no beam reaches the ground between rows
const MAX_GROUND_BEAM_ZENITH: f64 = 87.0;

/// Rows beyond this elevation above the horizon (seen from the ground) are ignored
const HORIZON_CUTOFF_DEG: f64 = 5.0;

/// Upper bound on rows considered on each side
const MAX_ROWS_LIMIT: i64 = 100;

/// Rear-side mismatch and structure shading, applied to the rear contribution
pub const SHADE_FACTOR: f64 = -0.02;

// ===================== GEOMETRY =====================

/// Row layout of the array
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShedGeometry {
    /// Ground coverage ratio, collector width / pitch
    pub gcr: f64,
    /// Height of the row center above ground (m)
    pub hub_height: f64,
    /// Collector slant width (m)
    pub collector_width: f64,
}

impl ShedGeometry {
    /// Row-to-row spacing (m)
    pub fn pitch(&self) -> f64 {
        self.collector_width / self.gcr
    }

    /// Rows on each side needed to see the sky down to a few degrees above the horizon
    fn max_rows(&self) -> i64 {
        let rows = (self.hub_height / (self.pitch() * HORIZON_CUTOFF_DEG.to_radians().tan())).ceil();
        (rows as i64).clamp(1, MAX_ROWS_LIMIT)
    }
}

/// Sample points 0, 1/(n-1), ..., 1 integrated with the trapezoidal rule.
fn integrate_unit<F: Fn(f64) -> f64>(f: F) -> f64 {
    let step = 1.0 / (NPOINTS - 1) as f64;
    let values: Vec<f64> = (0..NPOINTS).map(|i| f(i as f64 * step)).collect();
    values.windows(2).map(|w| 0.5 * (w[0] + w[1]) * step).sum()
}

/// Elevation angle (degrees) of the top of the row in front, seen from
/// position `x` on the slant height.
pub fn masking_angle(surface_tilt_deg: f64, gcr: f64, x: f64) -> f64 {
    let tilt = surface_tilt_deg.to_radians();
    let numerator = gcr * (1.0 - x) * tilt.sin();
    let denominator = 1.0 - gcr * (1.0 - x) * tilt.cos();
    (numerator / denominator).atan().to_degrees()
}

/// View factor from position `x` on the row to the unmasked sky.
pub fn vf_row_sky(surface_tilt_deg: f64, gcr: f64, x: f64) -> f64 {
    let psi = masking_angle(surface_tilt_deg, gcr, x);
    0.5 * (1.0 + (surface_tilt_deg + psi).to_radians().cos())
}

/// Angle (degrees) from position `x` on the row to the foot of the row in front.
pub fn ground_angle(surface_tilt_deg: f64, gcr: f64, x: f64) -> f64 {
    let tilt = surface_tilt_deg.to_radians();
    let x1 = gcr * x * tilt.sin();
    let x2 = gcr * x * tilt.cos() + 1.0;
    x1.atan2(x2).to_degrees()
}

/// View factor from position `x` on the row to the ground between rows.
pub fn vf_row_ground(surface_tilt_deg: f64, gcr: f64, x: f64) -> f64 {
    let psi = ground_angle(surface_tilt_deg, gcr, x);
    0.5 * (1.0 - (surface_tilt_deg - psi).to_radians().cos())
}

/// View factor from ground position `x` (fraction of pitch) to the sky
/// gaps between the surrounding rows.
pub fn vf_ground_sky(x: f64, rotation_deg: f64, geometry: &ShedGeometry, max_rows: i64) -> f64 {
    let pitch = geometry.pitch();
    let half_width = geometry.gcr * pitch / 2.0;
    let rot = rotation_deg.to_radians();
    let dy = half_width * rot.sin();
    let dx = half_width * rot.cos();
    let h = geometry.hub_height;

    // (lower, upper) angle from the ground point to each row's edges, left to right
    let edges: Vec<(f64, f64)> = (-max_rows..=max_rows)
        .map(|k| {
            let d = (k as f64 - x) * pitch;
            let a = (h + dy).atan2(d + dx);
            let b = (h - dy).atan2(d - dx);
            (a.min(b), a.max(b))
        })
        .collect();

    edges
        .windows(2)
        .map(|w| (0.5 * (w[1].1.cos() - w[0].0.cos())).max(0.0))
        .sum::<f64>()
        .min(1.0)
}

/// Tangent of the sun zenith projected onto the plane across the rows.
fn solar_projection_tangent(sun: &SunPosition, surface_azimuth_deg: f64) -> f64 {
    let rotation = (sun.azimuth_deg - surface_azimuth_deg).to_radians();
    sun.zenith_deg.to_radians().tan() * rotation.cos()
}

/// Fraction of the ground between rows in direct sun.
pub fn unshaded_ground_fraction(
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
    sun: &SunPosition,
    gcr: f64,
) -> f64 {
    if sun.zenith_deg > MAX_GROUND_BEAM_ZENITH {
        return 0.0;
    }
    let tan_phi = solar_projection_tangent(sun, surface_azimuth_deg);
    let tilt = surface_tilt_deg.to_radians();
    1.0 - (gcr * (tilt.cos() + tilt.sin() * tan_phi).abs()).min(1.0)
}

/// Fraction of the row slant height in the shadow of the row in front.
pub fn shaded_fraction(surface_tilt_deg: f64, surface_azimuth_deg: f64, sun: &SunPosition, gcr: f64) -> f64 {
    let tan_phi = solar_projection_tangent(sun, surface_azimuth_deg);
    let tilt = surface_tilt_deg.to_radians();
    // Shadow length behind a row as a fraction of the pitch
    let x = gcr * (tilt.sin() * tan_phi + tilt.cos());
    if x <= 1.0 {
        0.0
    } else if angle_of_incidence(sun.zenith_deg, sun.azimuth_deg, surface_tilt_deg, surface_azimuth_deg) >= 90.0 {
        1.0
    } else {
        1.0 - 1.0 / x
    }
}

// ===================== SURFACES =====================

/// Sun-independent view factors of one row face
#[derive(Debug, Clone, Copy)]
struct Surface {
    tilt_deg: f64,
    azimuth_deg: f64,
    vf_sky: f64,
    vf_ground: f64,
    vf_ground_sky: f64,
}

impl Surface {
    fn new(tilt_deg: f64, azimuth_deg: f64, geometry: &ShedGeometry) -> Self {
        let gcr = geometry.gcr;
        let max_rows = geometry.max_rows();
        Self {
            tilt_deg,
            azimuth_deg,
            vf_sky: integrate_unit(|x| vf_row_sky(tilt_deg, gcr, x)),
            vf_ground: integrate_unit(|x| vf_row_ground(tilt_deg, gcr, x)),
            vf_ground_sky: integrate_unit(|x| vf_ground_sky(x, tilt_deg, geometry, max_rows)),
        }
    }

    fn irradiance(&self, sun: &SunPosition, gcr: f64, albedo: f64, dni: f64, dhi: f64, ghi: f64) -> PoaComponents {
        let (dni, dhi, ghi) = (non_negative(dni), non_negative(dhi), non_negative(ghi));

        let diffuse_fraction = if ghi < 1e-4 { 0.0 } else { (dhi / ghi).clamp(0.0, 1.0) };
        let f_gnd_beam = unshaded_ground_fraction(self.tilt_deg, self.azimuth_deg, sun, gcr);

        // Reflected light leaving the ground, reduced by row shadows and
        // the rows blocking the ground's view of the sky
        let ground = ghi
            * albedo
            * (f_gnd_beam * (1.0 - diffuse_fraction) + diffuse_fraction * self.vf_ground_sky);
        let poa_ground_diffuse = ground * self.vf_ground;
        let poa_sky_diffuse = dhi * self.vf_sky;

        let cos_inc = cos_aoi(sun.zenith_deg, sun.azimuth_deg, self.tilt_deg, self.azimuth_deg);
        let poa_direct = if sun.is_up() && cos_inc > 0.0 {
            let f_x = shaded_fraction(self.tilt_deg, self.azimuth_deg, sun, gcr);
            dni * cos_inc * (1.0 - f_x)
        } else {
            0.0
        };

        PoaComponents {
            poa_global: poa_direct + poa_sky_diffuse + poa_ground_diffuse,
            poa_direct,
            poa_sky_diffuse,
            poa_ground_diffuse,
            aoi_deg: cos_inc.clamp(-1.0, 1.0).acos().to_degrees(),
        }
    }
}

/// Front, rear and combined irradiance for one hour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BifacialIrradiance {
    pub front: PoaComponents,
    pub back: PoaComponents,
    /// front + bifaciality × rear × (1 + shade factor)
    pub poa_global: f64,
}

/// Infinite-sheds model for one array orientation
#[derive(Debug, Clone, Copy)]
pub struct InfiniteSheds {
    geometry: ShedGeometry,
    albedo: f64,
    bifaciality: f64,
    front: Surface,
    back: Surface,
}

impl InfiniteSheds {
    /// Precompute the view factors of both faces.
    pub fn new(
        surface_tilt_deg: f64,
        surface_azimuth_deg: f64,
        geometry: ShedGeometry,
        albedo: f64,
        bifaciality: f64,
    ) -> Self {
        let back_tilt = 180.0 - surface_tilt_deg;
        let back_azimuth = (surface_azimuth_deg + 180.0).rem_euclid(360.0);
        Self {
            geometry,
            albedo,
            bifaciality,
            front: Surface::new(surface_tilt_deg, surface_azimuth_deg, &geometry),
            back: Surface::new(back_tilt, back_azimuth, &geometry),
        }
    }

    pub fn geometry(&self) -> &ShedGeometry {
        &self.geometry
    }

    /// Ground-to-sky view factor averaged over the ground between rows
    pub fn ground_sky_view_factor(&self) -> f64 {
        self.front.vf_ground_sky
    }

    pub fn irradiance(&self, sun: &SunPosition, dni: f64, dhi: f64, ghi: f64) -> BifacialIrradiance {
        let gcr = self.geometry.gcr;
        let front = self.front.irradiance(sun, gcr, self.albedo, dni, dhi, ghi);
        let back = self.back.irradiance(sun, gcr, self.albedo, dni, dhi, ghi);
        let poa_global = front.poa_global + self.bifaciality * back.poa_global * (1.0 + SHADE_FACTOR);
        BifacialIrradiance { front, back, poa_global }
    }
}

// ===================== TESTS =====================
