/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! Beck-Trevitt diurnal curve: reconstructs 24 hourly values of temperature, wind speed
//! and relative humidity from a day's min/max extremes plus sunrise/solar-noon/sunset times.

use std::f64::consts::FRAC_PI_2;
use crate::config::DiurnalCoeffs;

/// Rising-then-peaking sine segment: used for temperature between the overnight minimum
/// and the afternoon maximum. `t`, `tn` (time of min), `tx` (time of max) in seconds-of-day.
pub fn sin_function (t: f64, tn: f64, tx: f64, min: f64, max: f64) -> f64 {
    let fraction = ((t - tn) / (tx - tn)).clamp(0.0, 1.0);
    min + (max - min) * (fraction * FRAC_PI_2).sin()
}

/// Overnight exponential decay segment from yesterday's sunset value down to today's minimum.
/// `ts` = yesterday's sunset (seconds-of-day, possibly negative), `tn` = today's time-of-min.
pub fn exp_function (t: f64, ts: f64, tn: f64, min: f64, sunset_val: f64, gamma: f64) -> f64 {
    let fraction = ((t - ts) / (tn - ts)).clamp(0.0, 1.0);
    min + (sunset_val - min) * (fraction * gamma).exp()
}

/// Afternoon wind decay segment: wind peaks near midday (`tx`) and decays toward the
/// overnight minimum by the following day's time-of-min (`tn`), via a mirrored sine blend.
pub fn exp_wind_func (t: f64, tx: f64, tn: f64, min: f64, sunset_val: f64) -> f64 {
    let fraction = ((t - tx) / (tn - tx)).clamp(0.0, 1.0);
    sunset_val - (sunset_val - min) * (fraction * FRAC_PI_2).sin()
}

/// One day's reconstructed diurnal curve inputs.
#[derive(Debug, Clone, Copy)]
pub struct DayExtremes {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_ws: f64,
    pub max_ws: f64,
    pub daily_rh: f64, // fraction 0..1, at time of max temp
}

/// Sunrise/solar-noon/sunset, in seconds-of-day (LST), for a single day.
#[derive(Debug, Clone, Copy)]
pub struct DaySolar {
    pub sunrise_sec: f64,
    pub solar_noon_sec: f64,
    pub sunset_sec: f64,
}

/// Reconstructs temperature at `t` (seconds-of-day, today), given today's extremes/solar
/// times and yesterday's sunset temperature value (synthesized from today's own curve
/// when no real yesterday exists, per the stream's "yesterday synthesis" rule).
pub fn temp_at (
    t: f64, today: &DayExtremes, solar: &DaySolar, coeffs: &DiurnalCoeffs, yesterday_sunset_temp: f64,
) -> f64 {
    let tn = solar.sunrise_sec + coeffs.alpha;
    let tx = solar.solar_noon_sec + coeffs.beta;

    if t < tn {
        // still in the overnight decay from yesterday's sunset to today's minimum
        let ts = solar.sunset_sec - 86400.0; // yesterday's sunset, expressed on today's axis
        exp_function(t, ts, tn, today.min_temp, yesterday_sunset_temp, coeffs.gamma)
    } else {
        sin_function(t, tn, tx, today.min_temp, today.max_temp)
    }
}

/// Reconstructs wind speed at `t`, mirroring [`temp_at`] but with the asymmetric
/// rise-to-midday / decay-to-next-minimum wind shape.
pub fn wind_at (
    t: f64, today: &DayExtremes, solar: &DaySolar, coeffs: &DiurnalCoeffs,
    yesterday_sunset_ws: f64, tomorrow_min_sec: f64,
) -> f64 {
    let tn = solar.sunrise_sec + coeffs.alpha;
    let tx = solar.solar_noon_sec + coeffs.beta;

    if t < tn {
        let ts = solar.sunset_sec - 86400.0;
        exp_function(t, ts, tn, today.min_ws, yesterday_sunset_ws, coeffs.gamma)
    } else if t <= tx {
        sin_function(t, tn, tx, today.min_ws, today.max_ws)
    } else {
        exp_wind_func(t, tx, tomorrow_min_sec, today.min_ws, today.max_ws)
    }
}

/// Saturation vapour pressure at temperature `t_celsius`, daily-max-temp (Tetens) form,
/// used for the RH reconstruction curve.
fn svp_tetens_daily (t_celsius: f64) -> f64 {
    6.108 * (t_celsius * 17.27 / (t_celsius + 237.3)).exp()
}

/// Saturation vapour pressure, lapse-rate / dew-point form (used in [`dew_point`]).
pub fn svp_lapse_form (t_celsius: f64) -> f64 {
    0.6112 * 10f64.powf(7.5 * t_celsius / (237.7 + t_celsius))
}

/// Reconstructs RH at `t` from the reconstructed temperature `temp_t`, conserving the
/// day's vapour pressure computed at the time of Tmax.
pub fn rh_at (temp_t: f64, today: &DayExtremes) -> f64 {
    let svpt0 = svp_tetens_daily(today.max_temp);
    let vpt0 = svpt0 * today.daily_rh;
    let qt0 = 217.0 * vpt0 / (273.17 + today.max_temp);
    let temp_const = 100.0 * qt0 / (6.108 * 217.0);

    let rh = temp_const * (273.17 + temp_t) / (17.27 * temp_t / (temp_t + 237.3)).exp() * 0.01;
    rh.clamp(0.0, 1.0)
}

/// Dew-point temperature from temperature and RH (fraction 0..1), when not specified directly.
/// Returns `-273.0` (an "undefined" sentinel, preserved from the reference behaviour) when
/// the implied vapour pressure is non-positive.
pub fn dew_point (temp_celsius: f64, rh_fraction: f64) -> f64 {
    let vps = svp_lapse_form(temp_celsius);
    let vp = rh_fraction * vps;
    if vp > 0.0 {
        let log_ratio = (vp / 0.6112).log10();
        237.7 * log_ratio / (7.5 - log_ratio)
    } else {
        -273.0
    }
}

/// Precipitation is attributed wholly to the LST 12:00 hour; every other hour is zero.
pub fn precip_at_hour (hour_of_day: u32, daily_total_mm: f64) -> f64 {
    if hour_of_day == 12 { daily_total_mm } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_day () -> (DayExtremes, DaySolar) {
        (
            DayExtremes{ min_temp: 10.0, max_temp: 28.0, min_ws: 2.0, max_ws: 20.0, daily_rh: 0.4 },
            DaySolar{ sunrise_sec: 5.0*3600.0, solar_noon_sec: 12.0*3600.0, sunset_sec: 19.0*3600.0 },
        )
    }

    #[test]
    fn temp_at_solar_noon_between_extremes () {
        let (day, solar) = sample_day();
        let coeffs = DiurnalCoeffs::default();
        let t = temp_at(solar.solar_noon_sec, &day, &solar, &coeffs, day.min_temp);
        assert!(t > day.min_temp && t < day.max_temp);
    }

    #[test]
    fn temp_at_time_of_max_approaches_max () {
        let (day, solar) = sample_day();
        let coeffs = DiurnalCoeffs::default();
        let tx = solar.solar_noon_sec + coeffs.beta;
        let t = temp_at(tx, &day, &solar, &coeffs, day.min_temp);
        assert!((t - day.max_temp).abs() < 1e-9);
    }

    #[test]
    fn precip_assigned_only_to_noon () {
        assert_eq!(precip_at_hour(11, 10.0), 0.0);
        assert_eq!(precip_at_hour(12, 10.0), 10.0);
        assert_eq!(precip_at_hour(13, 10.0), 0.0);
    }

    #[test]
    fn dew_point_below_saturation_is_lower_than_temp () {
        let d = dew_point(25.0, 0.5);
        assert!(d < 25.0);
    }

    #[test]
    fn dew_point_sentinel_for_zero_rh () {
        assert_eq!(dew_point(25.0, 0.0), -273.0);
    }

    #[test]
    fn rh_clamped_to_unit_interval () {
        let (day, _solar) = sample_day();
        let rh = rh_at(-40.0, &day); // extreme cold should not blow past 1.0
        assert!(rh >= 0.0 && rh <= 1.0);
    }
}
