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

//! The spatial combinator: inverse-distance-weighted aggregation of a set of weather
//! streams over a host grid, with adiabatic lapse-rate correction and primary-stream
//! passthrough.

use std::sync::{Arc, RwLock};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::diurnal::svp_lapse_form;
use crate::day::EventDirection;
use crate::errors::{Result, OdinWxError};
use crate::op_failed;
use crate::grid_engine::GridEngine;
use crate::station::WeatherStation;
use crate::stream::{GridAttachment, WeatherStream};
use crate::types::{DailyFwi, HourlyWx, InterpolationFlags, SpecifiedBits, WxQueryResult};

const MIN_STATION_SEPARATION_M: f64 = 100.0;

/// Gas/lapse-rate constants used for adiabatic temperature/dew-point correction.
const L_V: f64 = 2.501e6;
const R_GAS: f64 = 287.0;
const G_GRAV: f64 = -9.80665;
const C_PD: f64 = 1005.7;
const EPSILON: f64 = 0.621885;

struct GridEntry {
    stream: Arc<WeatherStream>,
    station: Arc<WeatherStation>,
    attachment: Option<GridAttachment>,
}

/// A validated spatial combinator over one or more weather streams.
pub struct WeatherGrid {
    engine: Arc<dyn GridEngine>,
    entries: RwLock<Vec<GridEntry>>,
    primary: RwLock<Option<usize>>,

    pub idw_exponent_temp: f64,
    pub idw_exponent_ws: f64,
    pub idw_exponent_precip: f64,
    pub idw_exponent_fwi: f64,
}

impl WeatherGrid {
    pub fn new (engine: Arc<dyn GridEngine>, cfg: &crate::config::WxConfig) -> Self {
        WeatherGrid {
            engine,
            entries: RwLock::new(Vec::new()),
            primary: RwLock::new(None),
            idw_exponent_temp: cfg.idw_exponent_temp,
            idw_exponent_ws: cfg.idw_exponent_ws,
            idw_exponent_precip: cfg.idw_exponent_precip,
            idw_exponent_fwi: cfg.idw_exponent_fwi,
        }
    }

    pub fn station_count (&self) -> usize { self.entries.read().unwrap().len() }

    /// Adds a stream/station pair. Rejects a station already present, or one within
    /// `MIN_STATION_SEPARATION_M` of an existing station.
    pub fn add_stream (&self, stream: Arc<WeatherStream>, station: Arc<WeatherStation>) -> Result<()> {
        let mut entries = self.entries.try_write().map_err(|_| OdinWxError::SimulationRunning)?;
        let loc = station.location();

        for e in entries.iter() {
            if Arc::ptr_eq(&e.stream, &stream) {
                return Err(OdinWxError::WeatherStreamAlreadyAdded);
            }
            if Arc::ptr_eq(&e.station, &station) {
                return Err(OdinWxError::WeatherStationAlreadyPresent);
            }
            let other = e.station.location();
            let d = ((loc.grid_x - other.grid_x).powi(2) + (loc.grid_y - other.grid_y).powi(2)).sqrt();
            if d < MIN_STATION_SEPARATION_M {
                return Err(OdinWxError::WeatherStationsTooClose(d));
            }
        }

        let attachment = stream.attach_to_grid();
        entries.push(GridEntry{ stream, station, attachment: Some(attachment) });
        if entries.len() == 1 { *self.primary.write().unwrap() = Some(0); }
        Ok(())
    }

    pub fn remove_stream (&self, stream: &Arc<WeatherStream>) -> Result<()> {
        let mut entries = self.entries.try_write().map_err(|_| OdinWxError::SimulationRunning)?;
        if let Some(idx) = entries.iter().position(|e| Arc::ptr_eq(&e.stream, stream)) {
            let mut entry = entries.remove(idx);
            if let Some(a) = entry.attachment.take() { entry.stream.detach_from_grid(a); }
        }
        let mut primary = self.primary.try_write().map_err(|_| OdinWxError::SimulationRunning)?;
        *primary = if entries.len() == 1 { Some(0) } else { None };
        Ok(())
    }

    pub fn set_primary (&self, idx: usize) -> Result<()> {
        let entries = self.entries.read().unwrap();
        if idx >= entries.len() { return Err(op_failed!("primary index {idx} out of range")); }
        *self.primary.try_write().map_err(|_| OdinWxError::SimulationRunning)? = Some(idx);
        Ok(())
    }

    /// Checks that every attached stream's observed date range covers `[start, end]`; called
    /// before a scenario run begins so gaps surface as `WEATHER_INVALID_DATES` rather than as
    /// silently synthesized "yesterday" values once the simulation is already underway.
    pub fn validate_window (&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        let entries = self.entries.read().unwrap();
        for e in entries.iter() {
            match e.stream.valid_range() {
                Some((first, last)) if first <= start && end <= last => {}
                _ => return Err(OdinWxError::WeatherInvalidDates),
            }
        }
        Ok(())
    }

    /// Checks the invariants named for grid validity: at least one stream, a resolved
    /// primary, unique stations, and pairwise separation (already enforced on insert, so
    /// re-checked here defensively in case of external mutation of station locations).
    pub fn validate (&self) -> Result<()> {
        let entries = self.entries.read().unwrap();
        if entries.is_empty() { return Err(op_failed!("grid has no streams")); }
        if self.primary.read().unwrap().is_none() { return Err(op_failed!("grid has no resolved primary stream")); }
        for i in 0..entries.len() {
            for j in (i+1)..entries.len() {
                let a = entries[i].station.location();
                let b = entries[j].station.location();
                let d = ((a.grid_x - b.grid_x).powi(2) + (a.grid_y - b.grid_y).powi(2)).sqrt();
                if d < MIN_STATION_SEPARATION_M { return Err(OdinWxError::WeatherStationsTooClose(d)); }
            }
        }
        Ok(())
    }

    fn idw_weight (d2: f64, exponent: f64) -> f64 {
        let w = if d2 > 1.0 { 1.0 / d2 } else { 5.0 };
        w.powf(exponent / 2.0)
    }

    /// Inverse-distance-weighted query at grid-projected point `(x, y)` and time `t`.
    #[instrument(skip(self, flags))]
    pub fn query_at (&self, x: f64, y: f64, t: DateTime<Utc>, flags: InterpolationFlags) -> Result<WxQueryResult> {
        let entries = self.entries.read().unwrap();
        if entries.is_empty() { return Err(OdinWxError::GridUninitialized); }

        if flags.contains(InterpolationFlags::QUERY_PRIMARY_WX_STREAM) {
            let idx = self.primary.read().unwrap().ok_or(OdinWxError::GridUninitialized)?;
            return entries[idx].stream.get_instantaneous(t, flags);
        }

        if !flags.contains(InterpolationFlags::INTERPOLATE_SPATIAL) || entries.len() == 1 {
            let nearest = self.nearest_entry(&entries, x, y)?;
            return nearest.stream.get_instantaneous(t, flags);
        }

        let vector_wind = flags.contains(InterpolationFlags::INTERPOLATE_WIND_VECTOR);
        let idw_precip = self.idw_exponent_precip > 0.0;

        let mut sum_w_temp = 0.0; let mut sum_w_td = 0.0;
        let mut sum_w_ualr = 0.0; let mut sum_w_salr = 0.0;
        let mut sum_w_temp_total = 0.0;
        let mut sum_w_ws = 0.0; let mut sum_w_ws_total = 0.0;
        let mut sum_wx = 0.0; let mut sum_wy = 0.0;
        let mut sum_w_precip = 0.0; let mut sum_w_precip_total = 0.0;

        let mut nearest_d2 = f64::INFINITY;
        let mut nearest_wx: Option<HourlyWx> = None;
        let mut raw_ref: Option<HourlyWx> = None;
        let mut dfwi_ref = None;
        let mut ifwi_ref = None;

        for e in entries.iter() {
            let loc = e.station.location();
            let d2 = ((loc.grid_x - x).powi(2) + (loc.grid_y - y).powi(2)).max(1e-9);
            let wx = e.stream.get_instantaneous(t, flags)?.wx;

            if d2 < nearest_d2 {
                nearest_d2 = d2;
                nearest_wx = Some(wx);
            }
            if raw_ref.is_none() {
                raw_ref = Some(wx);
                let r = e.stream.get_instantaneous(t, flags)?;
                dfwi_ref = Some(r.dfwi);
                ifwi_ref = Some(r.ifwi);
            }

            let h_s = e.station.elevation_m();
            let pe = e.station.pressure_kpa();
            let (ualr, salr) = adiabatic_lapse_rates(wx.temp, wx.rh, pe);
            let t_sea = wx.temp - ualr * h_s;
            let td_sea = wx.dew_point - salr * h_s;

            let w_t = Self::idw_weight(d2, self.idw_exponent_temp);
            sum_w_temp += w_t * t_sea;
            sum_w_td += w_t * td_sea;
            sum_w_ualr += w_t * ualr;
            sum_w_salr += w_t * salr;
            sum_w_temp_total += w_t;

            let w_ws = Self::idw_weight(d2, self.idw_exponent_ws);
            if vector_wind {
                sum_wx += w_ws * wx.ws * wx.wd.cos();
                sum_wy += w_ws * wx.ws * wx.wd.sin();
                sum_w_ws_total += w_ws;
            } else {
                sum_w_ws += w_ws * wx.ws;
                sum_w_ws_total += w_ws;
            }

            if idw_precip {
                let w_p = Self::idw_weight(d2, self.idw_exponent_precip);
                sum_w_precip += w_p * wx.precip;
                sum_w_precip_total += w_p;
            }
        }

        let elev_cell = self.engine.elevation_at(x, y).ok_or(OdinWxError::GridLocationOutOfRange)?;

        let ualr_avg = sum_w_ualr / sum_w_temp_total;
        let salr_avg = sum_w_salr / sum_w_temp_total;
        let temp_cell = sum_w_temp / sum_w_temp_total + ualr_avg * elev_cell;
        let td_cell = sum_w_td / sum_w_temp_total + salr_avg * elev_cell;

        let vps_cell = svp_lapse_form(temp_cell);
        let vp_cell = svp_lapse_form(td_cell);
        let rh_cell = (vp_cell / vps_cell).clamp(0.0, 1.0);

        let (ws_cell, wd_cell) = if vector_wind {
            let ws = (sum_wx.powi(2) + sum_wy.powi(2)).sqrt() / sum_w_ws_total;
            let wd = sum_wy.atan2(sum_wx);
            (ws, wd)
        } else {
            let nearest = nearest_wx.unwrap();
            (sum_w_ws / sum_w_ws_total, nearest.wd)
        };

        let precip_cell = if idw_precip {
            sum_w_precip / sum_w_precip_total
        } else {
            nearest_wx.unwrap().precip
        };

        let raw = raw_ref.unwrap();
        let mut bits = SpecifiedBits::NONE;
        const TOL: f64 = 1e-7;
        if (temp_cell - raw.temp).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_TEMPERATURE); }
        if (td_cell - raw.dew_point).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_DEWPOINTTEMPERATURE); }
        if (rh_cell - raw.rh).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_RH); }
        if (ws_cell - raw.ws).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_WINDSPEED); }
        if (wd_cell - raw.wd).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_WINDDIRECTION); }
        if (precip_cell - raw.precip).abs() > TOL { bits.set(SpecifiedBits::OVERRODE_PRECIPITATION); }

        Ok(WxQueryResult {
            wx: HourlyWx{ temp: temp_cell, dew_point: td_cell, rh: rh_cell, precip: precip_cell, ws: ws_cell, gust: raw.gust, wd: wd_cell, bits },
            ifwi: ifwi_ref.unwrap(),
            dfwi: dfwi_ref.unwrap(),
        })
    }

    fn nearest_entry<'a> (&self, entries: &'a [GridEntry], x: f64, y: f64) -> Result<&'a GridEntry> {
        entries.iter().min_by(|a, b| {
            let da = Self::dist2(a, x, y);
            let db = Self::dist2(b, x, y);
            da.partial_cmp(&db).unwrap()
        }).ok_or(OdinWxError::GridUninitialized)
    }

    fn dist2 (e: &GridEntry, x: f64, y: f64) -> f64 {
        let loc = e.station.location();
        (loc.grid_x - x).powi(2) + (loc.grid_y - y).powi(2)
    }

    pub fn primary_stream (&self) -> Option<Arc<WeatherStream>> {
        let idx = (*self.primary.read().unwrap())?;
        self.entries.read().unwrap().get(idx).map(|e| e.stream.clone())
    }

    /// Daily FWI at `(x, y)`, IDW-aggregated across streams' daily codes with `idw_exponent_fwi`.
    pub fn daily_fwi_at (&self, x: f64, y: f64, t: DateTime<Utc>) -> Option<f64> {
        self.daily_fwi_codes_at(x, y, t).map(|dfwi| dfwi.fwi.calculated)
    }

    /// Full daily FWI code set at `(x, y)`, each code IDW-aggregated independently with
    /// `idw_exponent_fwi`. Used by the pipeline's equilibrium recompute, which needs
    /// yesterday's DC/DMC/FFMC/BUI, not just the scalar FWI.
    pub fn daily_fwi_codes_at (&self, x: f64, y: f64, t: DateTime<Utc>) -> Option<DailyFwi> {
        let entries = self.entries.read().unwrap();
        if entries.is_empty() { return None; }

        let mut sum_w = 0.0;
        let mut sums = [0.0f64; 6];
        for e in entries.iter() {
            let loc = e.station.location();
            let d2 = ((loc.grid_x - x).powi(2) + (loc.grid_y - y).powi(2)).max(1e-9);
            let w = Self::idw_weight(d2, self.idw_exponent_fwi);
            let dfwi = e.stream.daily_fwi_at(t)?;
            sum_w += w;
            sums[0] += w * dfwi.ffmc.calculated;
            sums[1] += w * dfwi.dmc.calculated;
            sums[2] += w * dfwi.dc.calculated;
            sums[3] += w * dfwi.bui.calculated;
            sums[4] += w * dfwi.isi.calculated;
            sums[5] += w * dfwi.fwi.calculated;
        }
        if sum_w <= 0.0 { return None; }
        Some(DailyFwi {
            ffmc: crate::types::CodeValue::new(sums[0] / sum_w),
            dmc: crate::types::CodeValue::new(sums[1] / sum_w),
            dc: crate::types::CodeValue::new(sums[2] / sum_w),
            bui: crate::types::CodeValue::new(sums[3] / sum_w),
            isi: crate::types::CodeValue::new(sums[4] / sum_w),
            fwi: crate::types::CodeValue::new(sums[5] / sum_w),
        })
    }

    /// Next hour/day boundary from the primary stream, in grid-projected terms. The grid
    /// has no temporal state of its own; this just exposes the primary stream's event
    /// timeline so callers that only hold a grid can still walk it.
    pub fn get_event_time (&self, from_time: DateTime<Utc>, direction: EventDirection) -> Option<DateTime<Utc>> {
        self.primary_stream()?.get_event_time(from_time, direction)
    }

    /// Raster cell containing grid-projected point `(x, y)`, delegating to the grid engine.
    pub fn cell_index (&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.engine.cell_index(x, y)
    }

    pub fn engine (&self) -> &Arc<dyn GridEngine> { &self.engine }
}

/// Unsaturated/saturated adiabatic lapse rate at the station's current temperature/RH/pressure.
fn adiabatic_lapse_rates (temp_c: f64, rh: f64, pe_kpa: f64) -> (f64, f64) {
    let t_k = temp_c + 273.15;
    let vps = svp_lapse_form(temp_c);
    let vp = rh * vps;

    let r_v = 0.622 * vp / (pe_kpa - vp);
    let r_vs = 0.622 * vps / (pe_kpa - vps);

    let ualr = (G_GRAV * (1.0 + L_V * r_v / (R_GAS * t_k)))
        / (C_PD + L_V.powi(2) * r_v * EPSILON / (R_GAS * t_k.powi(2)));
    let salr = (G_GRAV * (1.0 + L_V * r_vs / (R_GAS * t_k)))
        / (C_PD + L_V.powi(2) * r_vs * EPSILON / (R_GAS * t_k.powi(2)));

    (ualr, salr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WxConfig;
    use crate::grid_engine::ConstantElevationGrid;
    use crate::station::StationLocation;
    use odin_common::angle::{Latitude, Longitude};
    use chrono::TimeZone;

    fn make_station (name: &str, x: f64, y: f64) -> Arc<WeatherStation> {
        WeatherStation::new(name, StationLocation{ lat: Latitude::from_degrees(45.0), lon: Longitude::from_degrees(-110.0), grid_x: x, grid_y: y })
    }

    fn make_stream () -> Arc<WeatherStream> {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(
            "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n2024-07-01,10,28,30,0,0,0,0\n",
            crate::import::ImportOptions::default(),
        ).unwrap();
        stream
    }

    #[test]
    fn rejects_stations_too_close () {
        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(100, 100, 30.0, (0.0, 0.0), 500.0));
        let grid = WeatherGrid::new(engine, &WxConfig::default());
        let s1 = make_station("A", 0.0, 0.0);
        let s2 = make_station("B", 10.0, 0.0);
        grid.add_stream(make_stream(), s1).unwrap();
        let err = grid.add_stream(make_stream(), s2).unwrap_err();
        assert!(matches!(err, OdinWxError::WeatherStationsTooClose(_)));
    }

    #[test]
    fn single_stream_grid_elects_primary () {
        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(100, 100, 30.0, (0.0, 0.0), 500.0));
        let grid = WeatherGrid::new(engine, &WxConfig::default());
        grid.add_stream(make_stream(), make_station("A", 0.0, 0.0)).unwrap();
        assert!(grid.primary_stream().is_some());
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_stream_addition () {
        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(100, 100, 30.0, (0.0, 0.0), 500.0));
        let grid = WeatherGrid::new(engine, &WxConfig::default());
        let stream = make_stream();
        grid.add_stream(stream.clone(), make_station("A", 0.0, 0.0)).unwrap();
        let err = grid.add_stream(stream, make_station("B", 5000.0, 0.0)).unwrap_err();
        assert!(matches!(err, OdinWxError::WeatherStreamAlreadyAdded));
    }

    #[test]
    fn validate_window_rejects_dates_outside_stream_coverage () {
        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(100, 100, 30.0, (0.0, 0.0), 500.0));
        let grid = WeatherGrid::new(engine, &WxConfig::default());
        grid.add_stream(make_stream(), make_station("A", 0.0, 0.0)).unwrap();
        let (start, end) = grid.entries.read().unwrap()[0].stream.valid_range().unwrap();
        assert!(grid.validate_window(start, end).is_ok());
        let err = grid.validate_window(start, end + chrono::Duration::days(5)).unwrap_err();
        assert!(matches!(err, OdinWxError::WeatherInvalidDates));
    }

    #[test]
    fn idw_with_two_identical_equidistant_streams_matches_common_value () {
        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(100, 100, 30.0, (0.0, 0.0), 500.0));
        let grid = WeatherGrid::new(engine, &WxConfig::default());
        grid.add_stream(make_stream(), make_station("A", 0.0, 0.0)).unwrap();
        grid.add_stream(make_stream(), make_station("B", 200.0, 0.0)).unwrap();

        let t = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let direct = grid.entries.read().unwrap()[0].stream.get_instantaneous(t, InterpolationFlags::NONE).unwrap();
        let result = grid.query_at(100.0, 0.0, t, InterpolationFlags::INTERPOLATE_SPATIAL).unwrap();
        assert!((result.wx.temp - direct.wx.temp).abs() < 1e-6);
    }
}
