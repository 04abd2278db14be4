//! Irradiance Geometry and Transposition
//!
//! Angle of incidence, air mass, extraterrestrial irradiance, the
//! Ineichen-Perez clear-sky model (used for weather QC) and isotropic
//! plane-of-array transposition for mono-facial modules.
//!
//! References:
//! - Ineichen, P. and Perez, R. (2002). "A new airmass independent formulation
//!   for the Linke turbidity coefficient"
//! - Kasten, F. and Young, A. T. (1989). "Revised optical air mass tables and
//!   approximation formula"

use std::f64::consts::PI;

// ===================== CONSTANTS =====================

/// Solar constant in W/m², same value pvlib uses for `get_extra_radiation`
const SOLAR_CONSTANT: f64 = 1366.1;

/// Upper bound applied to derived beam irradiance (W/m²)
pub const MAX_DNI: f64 = 1500.0;

// ===================== POA RESULTS =====================

/// Irradiance components on one module surface
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoaComponents {
    /// Total plane-of-array irradiance (W/m²)
    pub poa_global: f64,
    /// Beam component on the plane (W/m²)
    pub poa_direct: f64,
    /// Sky diffuse component (W/m²)
    pub poa_sky_diffuse: f64,
    /// Ground reflected component (W/m²)
    pub poa_ground_diffuse: f64,
    /// Angle of incidence (degrees)
    pub aoi_deg: f64,
}

/// Clamp NaN and negative values to zero.
pub fn non_negative(v: f64) -> f64 {
    if v.is_nan() || v < 0.0 { 0.0 } else { v }
}

// ===================== GEOMETRY =====================

/// Calculate angle of incidence between sun rays and the surface normal
///
/// # Arguments
/// * `sun_zenith_deg` - Apparent sun zenith in degrees
/// * `sun_azimuth_deg` - Sun azimuth in degrees (0 = North, 90 = East, 180 = South)
/// * `surface_tilt_deg` - Surface tilt from horizontal in degrees
/// * `surface_azimuth_deg` - Surface facing direction in degrees (180 = South)
///
/// # Returns
/// Angle of incidence in degrees (0 = sun perpendicular to surface)
pub fn angle_of_incidence(
    sun_zenith_deg: f64,
    sun_azimuth_deg: f64,
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
) -> f64 {
    cos_aoi(sun_zenith_deg, sun_azimuth_deg, surface_tilt_deg, surface_azimuth_deg)
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
}

/// Cosine of the angle of incidence, unclamped.
pub fn cos_aoi(
    sun_zenith_deg: f64,
    sun_azimuth_deg: f64,
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
) -> f64 {
    let zen = sun_zenith_deg.to_radians();
    let tilt = surface_tilt_deg.to_radians();
    let daz = (sun_azimuth_deg - surface_azimuth_deg).to_radians();
    zen.cos() * tilt.cos() + zen.sin() * tilt.sin() * daz.cos()
}

// ===================== ATMOSPHERIC CALCULATIONS =====================

/// Relative air mass, Kasten-Young (1989). Infinite below the horizon.
pub fn relative_air_mass(sun_zenith_deg: f64) -> f64 {
    if sun_zenith_deg >= 90.0 {
        return f64::INFINITY;
    }
    let zenith_rad = sun_zenith_deg.to_radians();
    1.0 / (zenith_rad.cos() + 0.50572 * (96.07995 - sun_zenith_deg).powf(-1.6364))
}

/// Calculate absolute air mass (pressure-corrected)
///
/// Kasten-Young relative air mass with the ISA pressure ratio for the
/// site altitude.
pub fn air_mass(sun_zenith_deg: f64, altitude_m: f64) -> f64 {
    relative_air_mass(sun_zenith_deg) * pressure_ratio(altitude_m)
}

/// Ratio of site pressure to sea-level pressure, ISA troposphere.
pub fn pressure_ratio(altitude_m: f64) -> f64 {
    if altitude_m.abs() < 1e-5 {
        return 1.0;
    }
    (1.0 - 2.25577e-5 * altitude_m).powf(5.25588)
}

/// Calculate extraterrestrial irradiance corrected for Earth-Sun distance
///
/// Uses Spencer (1971) formula for orbital eccentricity correction
///
/// # Arguments
/// * `day_of_year` - Day of year (1-366)
///
/// # Returns
/// Extraterrestrial irradiance in W/m²
pub fn extraterrestrial_irradiance(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - 1.0) / 365.0;

    let eccentricity_correction = 1.000110
        + 0.034221 * b.cos()
        + 0.001280 * b.sin()
        + 0.000719 * (2.0 * b).cos()
        + 0.000077 * (2.0 * b).sin();

    SOLAR_CONSTANT * eccentricity_correction
}

// ===================== INEICHEN-PEREZ CLEAR SKY MODEL =====================

/// Calculate clear-sky irradiance using Ineichen-Perez model
///
/// # Arguments
/// * `sun_zenith_deg` - Sun zenith in degrees
/// * `altitude_m` - Site altitude in meters
/// * `day_of_year` - Day of year (1-366)
/// * `linke_turbidity` - Linke turbidity factor (typical 2-7)
///
/// # Returns
/// Tuple of (DNI, DHI, GHI) in W/m²
pub fn ineichen_perez_clearsky(
    sun_zenith_deg: f64,
    altitude_m: f64,
    day_of_year: u32,
    linke_turbidity: f64,
) -> (f64, f64, f64) {
    if sun_zenith_deg >= 90.0 {
        return (0.0, 0.0, 0.0);
    }

    let am = air_mass(sun_zenith_deg, altitude_m);
    if !am.is_finite() || am <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let i0 = extraterrestrial_irradiance(day_of_year);
    let cos_zen = sun_zenith_deg.to_radians().cos();

    // Clamp altitude for atmospheric coefficients to prevent model drift/NaN
    let clamped_alt = altitude_m.clamp(-500.0, 11000.0);

    let fh1 = (-clamped_alt / 8000.0).exp();
    let fh2 = (-clamped_alt / 1250.0).exp();

    let altitude_km = clamped_alt / 1000.0;
    let tl = (linke_turbidity - 0.15 * altitude_km).max(1.0);

    let cg1 = 5.09e-5 * clamped_alt + 0.868;
    let cg2 = 3.92e-5 * clamped_alt + 0.0387;

    let b = 0.664 + 0.163 / fh1;
    let exponent = -cg2 * am * (fh1 + fh2 * (tl - 1.0));
    let dni = (b * i0 * exponent.exp()).max(0.0).min(i0);

    let ghi_raw = (cg1 * i0 * cos_zen * (exponent * 1.1).exp()).max(0.0);

    // GHI cannot be less than the direct beam component hitting the ground.
    let direct_horizontal = dni * cos_zen;
    let ghi = ghi_raw.max(direct_horizontal);
    let dhi = (ghi - direct_horizontal).max(0.0);

    (dni, dhi, ghi)
}

// ===================== PLANE OF ARRAY IRRADIANCE =====================

/// Isotropic-sky transposition onto a fixed tilted plane
///
/// # Arguments
/// * `dni` - Direct Normal Irradiance (W/m²)
/// * `dhi` - Diffuse Horizontal Irradiance (W/m²)
/// * `ghi` - Global Horizontal Irradiance (W/m²)
/// * `sun_zenith_deg` - Sun zenith in degrees
/// * `sun_azimuth_deg` - Sun azimuth in degrees
/// * `surface_tilt_deg` - Surface tilt from horizontal in degrees
/// * `surface_azimuth_deg` - Surface azimuth in degrees
/// * `albedo` - Ground reflectance (0-1)
#[allow(clippy::too_many_arguments)]
pub fn plane_of_array_irradiance(
    dni: f64,
    dhi: f64,
    ghi: f64,
    sun_zenith_deg: f64,
    sun_azimuth_deg: f64,
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
    albedo: f64,
) -> PoaComponents {
    let cos_inc = cos_aoi(sun_zenith_deg, sun_azimuth_deg, surface_tilt_deg, surface_azimuth_deg);
    let aoi_deg = cos_inc.clamp(-1.0, 1.0).acos().to_degrees();
    let tilt_rad = surface_tilt_deg.to_radians();

    let poa_direct =
        if cos_inc > 0.0 && sun_zenith_deg < 90.0 { non_negative(dni) * cos_inc } else { 0.0 };

    let sky_view_factor = (1.0 + tilt_rad.cos()) / 2.0;
    let poa_sky_diffuse = non_negative(dhi) * sky_view_factor;

    let ground_view_factor = (1.0 - tilt_rad.cos()) / 2.0;
    let poa_ground_diffuse = non_negative(ghi) * albedo * ground_view_factor;

    PoaComponents {
        poa_global: poa_direct + poa_sky_diffuse + poa_ground_diffuse,
        poa_direct,
        poa_sky_diffuse,
        poa_ground_diffuse,
        aoi_deg,
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraterrestrial_irradiance_range() {
        let min = (1..=366).map(extraterrestrial_irradiance).fold(f64::INFINITY, f64::min);
        let max = (1..=366).map(extraterrestrial_irradiance).fold(f64::NEG_INFINITY, f64::max);

        // Perihelion (early January) above aphelion (early July)
        assert!(extraterrestrial_irradiance(3) > extraterrestrial_irradiance(185));
        assert!(min > 1310.0 && min < 1330.0);
        assert!(max > 1400.0 && max < 1420.0);
    }

    #[test]
    fn test_air_mass_typical_values() {
        assert!((air_mass(0.0, 0.0) - 1.0).abs() < 0.01);

        let am_60 = air_mass(60.0, 0.0);
        assert!(am_60 > 1.9 && am_60 < 2.1);

        assert!(air_mass(85.0, 0.0) > 10.0);
        assert!(air_mass(95.0, 0.0).is_infinite());
    }

    #[test]
    fn test_air_mass_altitude_correction() {
        let am_sea = air_mass(45.0, 0.0);
        let am_mountain = air_mass(45.0, 3000.0);

        assert!(am_mountain < am_sea);
        assert!(am_mountain > am_sea * 0.5);
    }

    #[test]
    fn test_angle_of_incidence() {
        // Sun overhead, flat surface
        assert!(angle_of_incidence(0.0, 180.0, 0.0, 180.0).abs() < 0.1);

        // Sun 45° from zenith in the south, surface tilted 45° to the south
        assert!(angle_of_incidence(45.0, 180.0, 45.0, 180.0).abs() < 0.1);

        // cos(AOI) = 0.5 + 0.5*cos(90°) = 0.5 → 60°
        let aoi = angle_of_incidence(45.0, 90.0, 45.0, 180.0);
        assert!((aoi - 60.0).abs() < 1.0, "AOI was {}, expected ~60°", aoi);

        // Sun behind the surface
        assert!(angle_of_incidence(45.0, 0.0, 45.0, 180.0) >= 90.0 - 0.01);
    }

    #[test]
    fn test_ineichen_perez_basic() {
        let (dni, dhi, ghi) = ineichen_perez_clearsky(30.0, 0.0, 172, 3.0);

        assert!(dni > 500.0 && dni < 1100.0, "DNI was {}", dni);
        assert!(dhi > 0.0, "DHI was {}", dhi);
        assert!(ghi > 500.0 && ghi < 1200.0, "GHI was {}", ghi);

        let cos_zen = 30.0_f64.to_radians().cos();
        assert!((ghi - (dni * cos_zen + dhi)).abs() < 1.0);

        assert_eq!(ineichen_perez_clearsky(95.0, 0.0, 172, 3.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_ineichen_perez_turbidity_effect() {
        let (dni_clear, _, _) = ineichen_perez_clearsky(30.0, 0.0, 172, 2.0);
        let (dni_hazy, _, _) = ineichen_perez_clearsky(30.0, 0.0, 172, 5.0);
        assert!(dni_clear > dni_hazy);
    }

    #[test]
    fn test_poa_flat_surface_equals_ghi() {
        let cos_zen = 30.0_f64.to_radians().cos();
        let ghi = 800.0 * cos_zen + 100.0;
        let poa = plane_of_array_irradiance(800.0, 100.0, ghi, 30.0, 180.0, 0.0, 180.0, 0.2);
        assert!((poa.poa_global - ghi).abs() < 1e-6);
        assert_eq!(poa.poa_ground_diffuse, 0.0);
    }

    #[test]
    fn test_poa_tilted_south_gains_in_winter() {
        // Low winter sun from the south: a 20° tilt beats horizontal
        let zen: f64 = 60.0;
        let ghi = 700.0 * zen.to_radians().cos() + 80.0;
        let flat = plane_of_array_irradiance(700.0, 80.0, ghi, zen, 180.0, 0.0, 185.0, 0.2);
        let tilted = plane_of_array_irradiance(700.0, 80.0, ghi, zen, 180.0, 20.0, 185.0, 0.2);
        assert!(tilted.poa_global > flat.poa_global);
        assert!(tilted.poa_ground_diffuse > 0.0);
    }

    #[test]
    fn test_poa_night_and_bad_inputs() {
        let poa = plane_of_array_irradiance(500.0, 50.0, 100.0, 100.0, 0.0, 20.0, 180.0, 0.2);
        assert_eq!(poa.poa_direct, 0.0);

        let poa = plane_of_array_irradiance(f64::NAN, -5.0, f64::NAN, 30.0, 180.0, 20.0, 180.0, 0.2);
        assert_eq!(poa.poa_global, 0.0);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(f64::NAN), 0.0);
        assert_eq!(non_negative(-3.0), 0.0);
        assert_eq!(non_negative(12.5), 12.5);
    }
}
