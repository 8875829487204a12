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

//! Sunrise / sunset / solar-noon times for the diurnal model, via the standard NOAA solar
//! position approximation. Good to within a minute or two, which is all the diurnal curve
//! reconstruction needs.

use chrono::{DateTime, Utc, Datelike};

/// Seconds since LST midnight for sunrise, solar noon and sunset of the given date at
/// the given latitude/longitude (degrees). `utc_offset_hours` is the fixed LST offset from UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise_sec: f64,
    pub solar_noon_sec: f64,
    pub sunset_sec: f64,
}

pub fn sun_times (date: DateTime<Utc>, lat_deg: f64, lon_deg: f64, utc_offset_hours: f64) -> SunTimes {
    let n = date.ordinal() as f64;
    let lat = lat_deg.to_radians();

    // fractional year, radians
    let gamma = 2.0 * std::f64::consts::PI / 365.0 * (n - 1.0);

    // equation of time, minutes
    let eqtime = 229.18 * (0.000075
        + 0.001868 * gamma.cos() - 0.032077 * gamma.sin()
        - 0.014615 * (2.0 * gamma).cos() - 0.040849 * (2.0 * gamma).sin());

    // solar declination, radians
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos() + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos() + 0.00148 * (3.0 * gamma).sin();

    // hour angle of sunrise/sunset, degrees
    let cos_ha = (90.833f64.to_radians().cos() / (lat.cos() * decl.cos())) - lat.tan() * decl.tan();
    let cos_ha = cos_ha.clamp(-1.0, 1.0);
    let ha = cos_ha.acos().to_degrees();

    // solar noon, minutes from UTC midnight, then converted to LST seconds-of-day
    let solar_noon_min_utc = 720.0 - 4.0 * lon_deg - eqtime;
    let solar_noon_min_lst = solar_noon_min_utc + utc_offset_hours * 60.0;

    let sunrise_min_lst = solar_noon_min_lst - 4.0 * ha;
    let sunset_min_lst = solar_noon_min_lst + 4.0 * ha;

    SunTimes {
        sunrise_sec: sunrise_min_lst * 60.0,
        solar_noon_sec: solar_noon_min_lst * 60.0,
        sunset_sec: sunset_min_lst * 60.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equator_equinox_has_twelve_hour_day () {
        let date = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        let t = sun_times(date, 0.0, 0.0, 0.0);
        let day_len = (t.sunset_sec - t.sunrise_sec) / 3600.0;
        assert!((day_len - 12.0).abs() < 0.3, "expected ~12h day, got {day_len}");
    }

    #[test]
    fn solar_noon_between_sunrise_and_sunset () {
        let date = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let t = sun_times(date, 45.0, -110.0, -7.0);
        assert!(t.sunrise_sec < t.solar_noon_sec);
        assert!(t.solar_noon_sec < t.sunset_sec);
    }
}
