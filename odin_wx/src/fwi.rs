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

//! Canadian Forest Fire Weather Index System, Van Wagner (1987).
//!
//! Pure functions only - no I/O, no state. Inputs/outputs use the units the CFFDRS
//! reference publishes them in: temperature in °C, RH as a percentage 0..100, wind speed
//! in km/h, rain in mm, durations in seconds.

fn ffmc_equilibria (temp: f64, rh: f64) -> (f64, f64) {
    let ed = 0.942 * rh.powf(0.679) + 11.0 * ((rh - 100.0) / 10.0).exp()
        + 0.18 * (21.1 - temp) * (1.0 - (-0.115 * rh).exp());
    let ew = 0.618 * rh.powf(0.753) + 10.0 * ((rh - 100.0) / 10.0).exp()
        + 0.18 * (21.1 - temp) * (1.0 - (-0.115 * rh).exp());
    (ed, ew)
}

fn ffmc_moisture_from_code (ffmc: f64) -> f64 {
    147.2 * (101.0 - ffmc) / (59.5 + ffmc)
}

fn ffmc_code_from_moisture (m: f64) -> f64 {
    (59.5 * (250.0 - m) / (147.2 + m)).clamp(0.0, 101.0)
}

fn wet_moisture_after_rain (mo: f64, rain: f64) -> f64 {
    if rain <= 0.5 { return mo; }
    let rf = rain - 0.5;
    let mr = if mo <= 150.0 {
        mo + 42.5 * rf * (-100.0 / (251.0 - mo)).exp() * (1.0 - (-6.93 / rf).exp())
    } else {
        mo + 42.5 * rf * (-100.0 / (251.0 - mo)).exp() * (1.0 - (-6.93 / rf).exp())
            + 0.0015 * (mo - 150.0).powi(2) * rf.sqrt()
    };
    mr.min(250.0)
}

/// Daily fine fuel moisture code, forward recursion from yesterday's FFMC over 24h of rain/weather.
pub fn daily_ffmc_vanwagner (ffmc_yda: f64, rain24: f64, temp: f64, rh: f64, ws: f64) -> f64 {
    let mo = wet_moisture_after_rain(ffmc_moisture_from_code(ffmc_yda), rain24);
    let (ed, ew) = ffmc_equilibria(temp, rh);

    let m = if mo > ed {
        let ko = 0.424 * (1.0 - (rh / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - (rh / 100.0).powi(8));
        let kd = ko * 0.581 * (0.0365 * temp).exp();
        ed + (mo - ed) * (10f64).powf(-kd)
    } else if mo < ew {
        let kl = 0.424 * (1.0 - ((100.0 - rh) / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - ((100.0 - rh) / 100.0).powi(8));
        let kw = kl * 0.581 * (0.0365 * temp).exp();
        ew - (ew - mo) * (10f64).powf(-kw)
    } else {
        mo
    };

    ffmc_code_from_moisture(m)
}

/// Hourly fine fuel moisture code, forward recursion across `dt_seconds` of elapsed time.
pub fn hourly_ffmc_vanwagner (ffmc_prev: f64, rain: f64, temp: f64, rh: f64, ws: f64, dt_seconds: f64) -> f64 {
    let dt_hours = dt_seconds / 3600.0;
    let mo = wet_moisture_after_rain(ffmc_moisture_from_code(ffmc_prev), rain);
    let (ed, ew) = ffmc_equilibria(temp, rh);

    let m = if mo > ed {
        let ko = 0.424 * (1.0 - (rh / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - (rh / 100.0).powi(8));
        let kd = ko * 0.581 * (0.0365 * temp).exp();
        ed + (mo - ed) * (10f64).powf(-kd * dt_hours)
    } else if mo < ew {
        let kl = 0.424 * (1.0 - ((100.0 - rh) / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - ((100.0 - rh) / 100.0).powi(8));
        let kw = kl * 0.581 * (0.0365 * temp).exp();
        ew - (ew - mo) * (10f64).powf(-kw * dt_hours)
    } else {
        mo
    };

    ffmc_code_from_moisture(m)
}

/// Backward recursion: given the FFMC at `t`, recover the FFMC `dt_seconds` earlier (same
/// weather held constant over the interval) by inverting the moisture-content recursion.
/// Used to seed the first hours of a day backward from a later initial-HFFMC reading.
pub fn hourly_ffmc_vanwagner_previous (ffmc_now: f64, rain: f64, temp: f64, rh: f64, ws: f64, dt_seconds: f64) -> f64 {
    let dt_hours = dt_seconds / 3600.0;
    let m_now = ffmc_moisture_from_code(ffmc_now);
    let (ed, ew) = ffmc_equilibria(temp, rh);

    let m_prev = if m_now > ed {
        let ko = 0.424 * (1.0 - (rh / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - (rh / 100.0).powi(8));
        let kd = ko * 0.581 * (0.0365 * temp).exp();
        ed + (m_now - ed) / (10f64).powf(-kd * dt_hours)
    } else if m_now < ew {
        let kl = 0.424 * (1.0 - ((100.0 - rh) / 100.0).powf(1.7)) + 0.0694 * ws.sqrt() * (1.0 - ((100.0 - rh) / 100.0).powi(8));
        let kw = kl * 0.581 * (0.0365 * temp).exp();
        ew - (ew - m_now) / (10f64).powf(-kw * dt_hours)
    } else {
        m_now
    };

    // undo the rain wetting applied at the start of the forward step via Newton's method,
    // since the wetting term is not analytically invertible in closed form.
    let m_prev = if rain > 0.5 {
        let rf = rain - 0.5;
        let target = m_prev;
        let mut mo = target;
        for _ in 0..8 {
            let f = mo + 42.5 * rf * (-100.0 / (251.0 - mo)).exp() * (1.0 - (-6.93 / rf).exp()) - target;
            let h = 1e-3;
            let f_h = (mo + h) + 42.5 * rf * (-100.0 / (251.0 - (mo + h))).exp() * (1.0 - (-6.93 / rf).exp()) - target;
            let df = (f_h - f) / h;
            if df.abs() < 1e-12 { break; }
            mo -= f / df;
        }
        mo
    } else {
        m_prev
    };

    ffmc_code_from_moisture(m_prev)
}

/// Lawson contiguous hourly FFMC: interpolates between the previous and current day's daily
/// FFMC by time-of-day, then advances it one hour under the actual hourly weather.
/// `rh_prev`/`rh_now`/`rh_next` are the RH of the bracketing and current hours;
/// `sec_since_midnight` is LST seconds since local midnight of the current day.
pub fn hourly_ffmc_lawson_contiguous (
    ffmc_yda_daily: f64, ffmc_today_daily: f64, rain: f64, temp: f64,
    rh_prev: f64, rh_now: f64, rh_next: f64, ws: f64, sec_since_midnight: f64,
) -> f64 {
    let frac = (sec_since_midnight / 86400.0).clamp(0.0, 1.0);
    let ffmc_base = ffmc_yda_daily + (ffmc_today_daily - ffmc_yda_daily) * frac;
    let rh_avg = (rh_prev + rh_now + rh_next) / 3.0;
    hourly_ffmc_vanwagner(ffmc_base, rain, temp, rh_avg, ws, 3600.0)
}

fn dmc_day_length_factor (lat: f64, month: u32) -> f64 {
    const EL_N: [f64; 12] = [6.5, 7.5, 9.0, 12.8, 13.9, 13.9, 12.4, 10.9, 9.4, 8.0, 7.0, 6.0];
    const EL_S: [f64; 12] = [7.9, 8.4, 8.9, 9.5, 9.9, 10.2, 10.1, 9.7, 9.1, 8.6, 8.1, 7.8];
    let idx = month.saturating_sub(1).min(11) as usize;
    if lat >= 0.0 { EL_N[idx] } else { EL_S[idx] }
}

/// Duff Moisture Code. `lat` in degrees, `month` 1..=12, used for the day-length factor.
pub fn dmc (dmc_yda: f64, temp: f64, rh: f64, rain24: f64, lat: f64, month: u32) -> f64 {
    let el = dmc_day_length_factor(lat, month);

    let p0 = if rain24 > 1.5 {
        let re = 0.92 * rain24 - 1.27;
        let mo = 20.0 + 280.0 / (-0.023 * dmc_yda).exp();
        let b = if dmc_yda <= 33.0 {
            100.0 / (0.5 + 0.3 * dmc_yda)
        } else if dmc_yda <= 65.0 {
            14.0 - 1.3 * dmc_yda.ln()
        } else {
            6.2 * dmc_yda.ln() - 17.2
        };
        let mr = mo + 1000.0 * re / (48.77 + b * re);
        (244.72 - 43.43 * (mr - 20.0).ln()).max(0.0)
    } else {
        dmc_yda
    };

    let k = if temp < -1.1 { 0.0 } else { 1.894 * (temp + 1.1) * (100.0 - rh) * el * 0.0001 };
    (p0 + k).max(0.0)
}

fn dc_day_length_factor (lat: f64, month: u32) -> f64 {
    const FL_N: [f64; 12] = [-1.6, -1.6, -1.6, 0.9, 3.8, 5.8, 6.4, 5.0, 2.4, 0.4, -1.6, -1.6];
    const FL_S: [f64; 12] = [6.4, 5.0, 2.4, 0.4, -1.6, -1.6, -1.6, -1.6, -1.6, 0.9, 3.8, 5.8];
    let idx = month.saturating_sub(1).min(11) as usize;
    if lat >= 0.0 { FL_N[idx] } else { FL_S[idx] }
}

/// Drought Code.
pub fn dc (dc_yda: f64, temp: f64, rain24: f64, lat: f64, month: u32) -> f64 {
    let lf = dc_day_length_factor(lat, month);
    let pe = (0.36 * (temp + 2.8) + lf).max(0.0);

    let dr = if rain24 > 2.8 {
        let rd = 0.83 * rain24 - 1.27;
        let qo = 800.0 * (-dc_yda / 400.0).exp();
        (dc_yda - 400.0 * (1.0 + 3.937 * rd / qo).ln()).max(0.0)
    } else {
        dc_yda
    };

    dr + 0.5 * pe
}

/// Build-Up Index, from DC and DMC.
pub fn bui (dc: f64, dmc: f64) -> f64 {
    let u = if dmc <= 0.4 * dc {
        0.8 * dc * dmc / (dmc + 0.4 * dc)
    } else {
        dmc - (1.0 - 0.8 * dc / (dmc + 0.4 * dc)) * (0.92 + (0.0114 * dmc).powf(1.7))
    };
    u.max(0.0)
}

/// Initial Spread Index, from FFMC and wind speed. `_dt_seconds` is accepted for call-site
/// symmetry with the daily/hourly recursion functions (the caller passes 3600 or 86400
/// depending on whether this is an hourly or daily ISI) but the published formula itself
/// is duration-independent given a representative wind speed.
pub fn isi_fbp (ffmc: f64, ws: f64, _dt_seconds: f64) -> f64 {
    let m = ffmc_moisture_from_code(ffmc);
    let fw = (0.05039 * ws).exp();
    let ff = 91.9 * (-0.1386 * m).exp() * (1.0 + m.powf(5.31) / 4.93e7);
    0.208 * fw * ff
}

/// Fire Weather Index, from ISI and BUI.
pub fn fwi (isi: f64, bui: f64) -> f64 {
    let bb = if bui > 80.0 {
        0.1 * isi * (1000.0 / (25.0 + 108.64 * (-0.023 * bui).exp()))
    } else {
        0.1 * isi * (0.626 * bui.powf(0.809) + 2.0)
    };

    if bb <= 1.0 {
        bb
    } else {
        (2.72 * (0.434 * bb.ln()).powf(0.647)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_ffmc_dry_day_rises_towards_equilibrium () {
        let f = daily_ffmc_vanwagner(85.0, 0.0, 25.0, 30.0, 10.0);
        assert!(f > 85.0 && f <= 101.0, "expected drying FFMC above 85, got {f}");
    }

    #[test]
    fn daily_ffmc_heavy_rain_drops_code () {
        let f = daily_ffmc_vanwagner(85.0, 20.0, 20.0, 80.0, 10.0);
        assert!(f < 85.0, "expected rain to drop FFMC, got {f}");
    }

    #[test]
    fn hourly_ffmc_previous_is_approximate_inverse_of_forward () {
        let ffmc0 = 88.0;
        let ffmc1 = hourly_ffmc_vanwagner(ffmc0, 0.0, 22.0, 45.0, 8.0, 3600.0);
        let back = hourly_ffmc_vanwagner_previous(ffmc1, 0.0, 22.0, 45.0, 8.0, 3600.0);
        assert!((back - ffmc0).abs() < 1e-6, "round trip mismatch: {back} vs {ffmc0}");
    }

    #[test]
    fn bui_zero_when_codes_are_zero () {
        assert_eq!(bui(0.0, 0.0), 0.0);
    }

    #[test]
    fn fwi_monotone_in_isi () {
        let low = fwi(5.0, 50.0);
        let high = fwi(20.0, 50.0);
        assert!(high > low);
    }

    #[test]
    fn isi_increases_with_wind () {
        let calm = isi_fbp(90.0, 0.0, 3600.0);
        let windy = isi_fbp(90.0, 30.0, 3600.0);
        assert!(windy > calm);
    }
}
