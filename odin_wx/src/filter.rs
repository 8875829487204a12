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

//! Time-windowed polygon override: applies up to five arithmetic operations to weather
//! inside a set of grid-coordinate polygons, during a time window, with a trailing
//! "history shadow" so downstream FWI re-equilibration knows a past override still matters.

use chrono::{DateTime, Duration, Utc};
use geo::{Contains, Point, Polygon};
use serde::{Serialize, Deserialize};

use crate::diurnal::dew_point;
use crate::errors::{Result, op_failed};
use crate::types::{HourlyWx, SpecifiedBits};

/// Arithmetic applied by a polygon filter to one variable. `SET` replaces the value and
/// marks it specified; `ADD`/`SUB`/`MUL`/`DIV` modify it and only mark it overridden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterOp { Set, Add, Sub, Mul, Div }

fn apply_op (op: Option<(FilterOp, f64)>, value: f64, specified: SpecifiedBits, overrode: SpecifiedBits, bits: &mut SpecifiedBits) -> f64 {
    let Some((op, v)) = op else { return value; };
    match op {
        FilterOp::Set => { bits.set(specified); bits.set(overrode); v }
        FilterOp::Add => { bits.clear(specified); bits.set(overrode); value + v }
        FilterOp::Sub => { bits.clear(specified); bits.set(overrode); value - v }
        FilterOp::Mul => { bits.clear(specified); bits.set(overrode); value * v.abs() }
        FilterOp::Div => {
            let v = v.abs();
            if v == 0.0 {
                bits.set(specified); bits.set(overrode);
                0.0
            } else {
                bits.clear(specified); bits.set(overrode);
                value / v
            }
        }
    }
}

const HISTORY_SHADOW_DAYS: i64 = 53;

/// A time-windowed, polygon-scoped override of temperature/RH/precipitation/wind. `SET`,
/// `ADD`, `SUB` are valid for every variable; `MUL`/`DIV` are rejected for wind direction
/// by [`PolygonFilter::validate`].
#[derive(Debug, Clone)]
pub struct PolygonFilter {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub polygons: Vec<Polygon<f64>>,
    pub landscape: bool,

    pub temp_op: Option<(FilterOp, f64)>,
    pub rh_op: Option<(FilterOp, f64)>,
    pub precip_op: Option<(FilterOp, f64)>,
    pub ws_op: Option<(FilterOp, f64)>,
    pub wd_op: Option<(FilterOp, f64)>,
}

impl PolygonFilter {
    pub fn new (start_time: DateTime<Utc>, end_time: DateTime<Utc>, polygons: Vec<Polygon<f64>>) -> Self {
        PolygonFilter {
            start_time, end_time, polygons, landscape: false,
            temp_op: None, rh_op: None, precip_op: None, ws_op: None, wd_op: None,
        }
    }

    pub fn validate (&self) -> Result<()> {
        if matches!(self.wd_op, Some((FilterOp::Mul, _))) || matches!(self.wd_op, Some((FilterOp::Div, _))) {
            return Err(op_failed!("wind direction filter op is limited to SET/ADD/SUB"));
        }
        Ok(())
    }

    fn contains (&self, x: f64, y: f64) -> bool {
        self.landscape || self.polygons.iter().any(|p| p.contains(&Point::new(x, y)))
    }

    /// `true` if `t` falls in `[start_time, end_time]` (property 11: inclusive of the end
    /// instant, exclusive the microsecond after).
    pub fn in_window (&self, t: DateTime<Utc>) -> bool { t >= self.start_time && t <= self.end_time }

    fn in_history_shadow (&self, t: DateTime<Utc>) -> bool {
        t > self.end_time && t <= self.end_time + Duration::days(HISTORY_SHADOW_DAYS)
    }

    /// Applies this filter in place to `wx` at grid point `(x, y)` and time `t`. No-op if
    /// the point lies outside every polygon (and `landscape` is false). Within the time
    /// window, applies SET/ADD/SUB/MUL/DIV in the fixed order temperature, RH,
    /// precipitation, wind speed, wind direction, recomputing dew-point after any
    /// temperature or RH change. Outside the window but within the 53-day history shadow,
    /// only the `OVERRODE_HISTORY_*` bits are set.
    pub fn apply (&self, x: f64, y: f64, t: DateTime<Utc>, wx: &mut HourlyWx) {
        if !self.contains(x, y) { return; }

        if self.in_window(t) {
            let temp_changed = self.temp_op.is_some();
            let rh_changed = self.rh_op.is_some();

            wx.temp = apply_op(self.temp_op, wx.temp, SpecifiedBits::SPECIFIED_TEMPERATURE, SpecifiedBits::OVERRODE_TEMPERATURE, &mut wx.bits);
            wx.rh = apply_op(self.rh_op, wx.rh, SpecifiedBits::SPECIFIED_RH, SpecifiedBits::OVERRODE_RH, &mut wx.bits).clamp(0.0, 1.0);
            wx.precip = apply_op(self.precip_op, wx.precip, SpecifiedBits::SPECIFIED_PRECIPITATION, SpecifiedBits::OVERRODE_PRECIPITATION, &mut wx.bits).max(0.0);
            wx.ws = apply_op(self.ws_op, wx.ws, SpecifiedBits::SPECIFIED_WINDSPEED, SpecifiedBits::OVERRODE_WINDSPEED, &mut wx.bits).max(0.0);
            wx.wd = apply_op(self.wd_op, wx.wd, SpecifiedBits::SPECIFIED_WINDDIRECTION, SpecifiedBits::OVERRODE_WINDDIRECTION, &mut wx.bits).rem_euclid(std::f64::consts::TAU);

            if temp_changed || rh_changed {
                wx.dew_point = dew_point(wx.temp, wx.rh);
                wx.bits.set(SpecifiedBits::OVERRODE_DEWPOINTTEMPERATURE);
            }
        } else if self.in_history_shadow(t) {
            if self.temp_op.is_some() { wx.bits.set(SpecifiedBits::OVERRODE_HISTORY_TEMPERATURE); }
            if self.rh_op.is_some() { wx.bits.set(SpecifiedBits::OVERRODE_HISTORY_RH); }
            if self.precip_op.is_some() { wx.bits.set(SpecifiedBits::OVERRODE_HISTORY_PRECIPITATION); }
            if self.ws_op.is_some() { wx.bits.set(SpecifiedBits::OVERRODE_HISTORY_WINDSPEED); }
            if self.wd_op.is_some() { wx.bits.set(SpecifiedBits::OVERRODE_HISTORY_WINDDIRECTION); }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use geo::polygon;

    fn square_polygon () -> Polygon<f64> {
        polygon![(x: 10.0, y: 10.0), (x: 20.0, y: 10.0), (x: 20.0, y: 20.0), (x: 10.0, y: 20.0)]
    }

    #[test]
    fn set_temperature_inside_polygon_and_window () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![square_polygon()]);
        f.temp_op = Some((FilterOp::Set, 40.0));

        let mut wx = HourlyWx{ temp: 20.0, rh: 0.5, ..Default::default() };
        f.apply(15.0, 15.0, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(), &mut wx);
        assert_eq!(wx.temp, 40.0);
        assert!(wx.bits.contains(SpecifiedBits::SPECIFIED_TEMPERATURE | SpecifiedBits::OVERRODE_TEMPERATURE));
        assert!(wx.bits.contains(SpecifiedBits::OVERRODE_DEWPOINTTEMPERATURE));
    }

    #[test]
    fn outside_polygon_is_a_no_op () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![square_polygon()]);
        f.temp_op = Some((FilterOp::Set, 40.0));

        let mut wx = HourlyWx{ temp: 20.0, ..Default::default() };
        f.apply(500.0, 500.0, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(), &mut wx);
        assert_eq!(wx.temp, 20.0);
    }

    #[test]
    fn history_shadow_marks_bits_without_changing_value () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![square_polygon()]);
        f.landscape = true;
        f.precip_op = Some((FilterOp::Add, 5.0));

        let mut wx = HourlyWx{ precip: 1.0, ..Default::default() };
        f.apply(15.0, 15.0, end + Duration::days(10), &mut wx);
        assert_eq!(wx.precip, 1.0);
        assert!(wx.bits.contains(SpecifiedBits::OVERRODE_HISTORY_PRECIPITATION));
    }

    #[test]
    fn beyond_history_shadow_is_untouched () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![square_polygon()]);
        f.landscape = true;
        f.precip_op = Some((FilterOp::Add, 5.0));

        let mut wx = HourlyWx{ precip: 1.0, ..Default::default() };
        f.apply(15.0, 15.0, end + Duration::days(60), &mut wx);
        assert_eq!(wx.bits, SpecifiedBits::NONE);
    }

    #[test]
    fn division_by_zero_zeroes_the_variable () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![]);
        f.landscape = true;
        f.ws_op = Some((FilterOp::Div, 0.0));

        let mut wx = HourlyWx{ ws: 12.0, ..Default::default() };
        f.apply(0.0, 0.0, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(), &mut wx);
        assert_eq!(wx.ws, 0.0);
        assert!(wx.bits.contains(SpecifiedBits::SPECIFIED_WINDSPEED | SpecifiedBits::OVERRODE_WINDSPEED));
    }

    #[test]
    fn wind_direction_rejects_mul_and_div () {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap();
        let mut f = PolygonFilter::new(start, end, vec![]);
        f.wd_op = Some((FilterOp::Mul, 2.0));
        assert!(f.validate().is_err());
    }
}
