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

//! The temporal container: a station's ordered days, starting FWI codes, and the
//! daily/hourly import-export and instantaneous-query surface.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use chrono::{DateTime, Duration, Datelike, TimeZone, Utc};
use tracing::instrument;

use crate::config::{WxConfig, InitialCodes, FfmcMethod, DiurnalCoeffs};
use crate::day::{Day, EventDirection, HourlySpecified};
use crate::errors::{Result, OdinWxError};
use crate::op_failed;
use crate::fwi;
use crate::import::{self, ImportOptions, ImportReport};
use crate::export;
use crate::station::WeatherStation;
use crate::types::{DailyWx, HourlyWx, DailyFwi, HourlyFwi, CodeValue, InterpolationFlags, SpecifiedBits, WxQueryResult};

/// Opaque proof that a stream is currently attached to a grid. Holding one does not grant
/// mutable access to the stream, only the right to call [`WeatherStream::detach_from_grid`].
#[derive(Debug)]
pub struct GridAttachment { _private: () }

#[derive(Debug)]
pub struct WeatherStream {
    pub start_time: DateTime<Utc>,
    pub utc_offset_hours: f64,
    lat_deg: RwLock<f64>,
    lon_deg: RwLock<f64>,

    ffmc_method: FfmcMethod,
    temp_coeffs: DiurnalCoeffs,
    wind_coeffs: DiurnalCoeffs,
    initial: RwLock<InitialCodes>,
    fwi_use_specified: AtomicBool,
    user_specified: AtomicBool,

    days: RwLock<Vec<Day>>,
    station: RwLock<Weak<WeatherStation>>,
    grid_count: AtomicUsize,
    stale: AtomicBool,

    hourly_cache: RwLock<HashMap<(i64, u32), WxQueryResult>>,
}

impl WeatherStream {
    pub fn new (start_time: DateTime<Utc>, cfg: WxConfig) -> Arc<Self> {
        Arc::new(WeatherStream {
            start_time,
            utc_offset_hours: 0.0,
            lat_deg: RwLock::new(45.0),
            lon_deg: RwLock::new(0.0),
            ffmc_method: cfg.ffmc_method,
            temp_coeffs: cfg.temp_coeffs,
            wind_coeffs: cfg.wind_coeffs,
            initial: RwLock::new(cfg.initial),
            fwi_use_specified: AtomicBool::new(cfg.fwi_use_specified),
            user_specified: AtomicBool::new(false),
            days: RwLock::new(Vec::new()),
            station: RwLock::new(Weak::new()),
            grid_count: AtomicUsize::new(0),
            stale: AtomicBool::new(false),
            hourly_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Binds this stream to exactly one station, inheriting its location.
    pub fn bind_station (&self, station: Weak<WeatherStation>) {
        if let Some(s) = station.upgrade() {
            let loc = s.location();
            *self.lat_deg.write().unwrap() = loc.lat.degrees();
            *self.lon_deg.write().unwrap() = loc.lon.degrees();
        }
        *self.station.write().unwrap() = station;
        self.invalidate();
    }

    pub fn station (&self) -> Option<Arc<WeatherStation>> { self.station.read().unwrap().upgrade() }

    pub fn attach_to_grid (&self) -> GridAttachment {
        self.grid_count.fetch_add(1, Ordering::SeqCst);
        GridAttachment{ _private: () }
    }

    pub fn detach_from_grid (&self, attachment: GridAttachment) {
        drop(attachment);
        self.grid_count.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn grid_count (&self) -> usize { self.grid_count.load(Ordering::SeqCst) }

    /// Invalidates the per-stream query cache and marks derived FWI state stale; the next
    /// query recomputes it.
    pub fn invalidate (&self) {
        self.hourly_cache.write().unwrap().clear();
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn is_stale (&self) -> bool { self.stale.load(Ordering::SeqCst) }

    pub fn fwi_use_specified (&self) -> bool { self.fwi_use_specified.load(Ordering::SeqCst) }
    pub fn is_user_specified (&self) -> bool { self.user_specified.load(Ordering::SeqCst) }
    pub fn ffmc_method (&self) -> FfmcMethod { self.ffmc_method }
    pub fn initial_codes (&self) -> InitialCodes { *self.initial.read().unwrap() }

    pub fn first_day_start (&self) -> Option<DateTime<Utc>> { self.days.read().unwrap().first().map(|d| d.start) }
    pub fn last_day_start (&self) -> Option<DateTime<Utc>> { self.days.read().unwrap().last().map(|d| d.start) }
    pub fn day_count (&self) -> usize { self.days.read().unwrap().len() }

    /// `[start, end)` of the stream's valid data range, accounting for `first_hour`/`last_hour`.
    pub fn valid_range (&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let days = self.days.read().unwrap();
        let first = days.first()?;
        let last = days.last()?;
        let start = first.start + Duration::hours(first.first_hour as i64);
        let end = last.start + Duration::hours(last.last_hour as i64 + 1);
        Some((start, end))
    }

    fn cfg_snapshot (&self) -> WxConfig {
        let mut cfg = WxConfig::default();
        cfg.ffmc_method = self.ffmc_method;
        cfg.temp_coeffs = self.temp_coeffs;
        cfg.wind_coeffs = self.wind_coeffs;
        cfg.initial = *self.initial.read().unwrap();
        cfg.fwi_use_specified = self.fwi_use_specified();
        cfg
    }

    /// Recomputes reconstructed hourly values (for daily-specified days) and all derived
    /// FWI codes, forward from the starting codes. Called lazily whenever the stream is
    /// queried after a mutation.
    #[instrument(skip(self), fields(days = self.days.read().unwrap().len()))]
    fn recompute_all (&self) {
        let cfg = self.cfg_snapshot();
        let lat = *self.lat_deg.read().unwrap();
        let lon = *self.lon_deg.read().unwrap();
        let mut days = self.days.write().unwrap();
        let n = days.len();

        for i in 0..n {
            if days[i].is_hourly_specified_day() { continue; }
            let (yda_sunset_temp, yda_sunset_ws) = if i > 0 {
                (days[i-1].hourly[23].temp, days[i-1].hourly[23].ws)
            } else {
                (days[i].daily.min_temp, days[i].daily.min_ws)
            };
            let tomorrow_sunrise_sec = 6.0 * 3600.0; // synthesized default; refined once tomorrow is reconstructed below
            days[i].reconstruct_hourly(lat, lon, self.utc_offset_hours, &cfg, yda_sunset_temp, yda_sunset_ws, tomorrow_sunrise_sec);
        }

        let initial = *self.initial.read().unwrap();
        let seed_bui = if initial.bui >= 0.0 {
            initial.bui
        } else {
            fwi::bui(initial.dc.max(0.0), initial.dmc.max(0.0))
        };
        let mut prev_dfwi = DailyFwi {
            ffmc: CodeValue::new(initial.ffmc), dmc: CodeValue::new(initial.dmc), dc: CodeValue::new(initial.dc),
            bui: CodeValue::new(seed_bui), isi: CodeValue::new(0.0), fwi: CodeValue::new(0.0),
        };

        for i in 0..n {
            let month = days[i].start.month();
            days[i].calculate_fwi(Some(&prev_dfwi), lat, month, &cfg);
            if i == 0 {
                if let Some(hffmc) = initial.hffmc {
                    days[i].apply_initial_hffmc(&cfg, hffmc, initial.hffmc_hour);
                }
            }
            prev_dfwi = days[i].dfwi;
        }

        drop(days);
        self.stale.store(false, Ordering::SeqCst);
    }

    fn ensure_fresh (&self) {
        if self.is_stale() { self.recompute_all(); }
    }

    /// Returns the index of the day containing `t`, if any.
    fn day_index_at (&self, t: DateTime<Utc>) -> Option<usize> {
        let days = self.days.read().unwrap();
        if days.is_empty() { return None; }
        let start = days[0].start;
        if t < start { return None; }
        let idx = ((t - start).num_seconds() / 86400) as usize;
        if idx < days.len() { Some(idx) } else { None }
    }

    /// `is_hourly_specified` projected across the whole stream, accounting for
    /// `first_hour`/`last_hour` at the stream's ends.
    pub fn is_hourly_specified (&self, t: DateTime<Utc>) -> HourlySpecified {
        let Some(idx) = self.day_index_at(t) else { return HourlySpecified::OutOfRange; };
        let days = self.days.read().unwrap();
        let hour = ((t - days[idx].start).num_seconds() / 3600) as u32;
        days[idx].is_hourly_specified(hour, idx == 0, idx == days.len() - 1)
    }

    /// Next strictly-monotone hour/day boundary in the requested direction, delegating to
    /// adjacent days at day edges.
    pub fn get_event_time (&self, from_time: DateTime<Utc>, direction: EventDirection) -> Option<DateTime<Utc>> {
        self.ensure_fresh();
        let idx = self.day_index_at(from_time)?;
        let days = self.days.read().unwrap();
        let hour = ((from_time - days[idx].start).num_seconds() / 3600) as u32;
        match days[idx].next_hour_boundary(hour, direction) {
            Some(h) => Some(days[idx].start + Duration::hours(h as i64)),
            None => match direction {
                EventDirection::Forward =>
                    if idx + 1 < days.len() { Some(days[idx + 1].start) } else { Some(days[idx].start + Duration::hours(24)) },
                EventDirection::Backward =>
                    if idx > 0 { Some(days[idx - 1].start + Duration::hours(23)) } else { Some(days[idx].start) },
            }
        }
    }

    /// Instantaneous weather/FWI at `t`. A query past the stream's very last hour returns
    /// that hour's values with precipitation zeroed, since precipitation is otherwise
    /// always attributed to the *later* of two bracketing hours and there is no later hour
    /// to attribute it to.
    #[instrument(skip(self, flags))]
    pub fn get_instantaneous (&self, t: DateTime<Utc>, flags: InterpolationFlags) -> Result<WxQueryResult> {
        self.ensure_fresh();

        let cache_key = (t.timestamp_micros(), flags.0);
        if !flags.contains(InterpolationFlags::IGNORE_CACHE) {
            if let Some(v) = self.hourly_cache.read().unwrap().get(&cache_key) {
                return Ok(*v);
            }
        }

        let days = self.days.read().unwrap();
        if days.is_empty() { return Err(op_failed!("stream has no data")); }

        let idx = self.day_index_at(t).ok_or_else(|| op_failed!("query time outside stream's valid range"))?;
        let day = &days[idx];
        let sec_into_day = (t - day.start).num_seconds();
        let hour = (sec_into_day / 3600) as usize;
        let on_boundary = sec_into_day % 3600 == 0;
        let temporal_interp = flags.contains(InterpolationFlags::INTERPOLATE_TEMPORAL);

        let result = if on_boundary || !temporal_interp {
            let h = hour.min(23);
            WxQueryResult{ wx: day.hourly[h], ifwi: day.hfwi[h], dfwi: day.dfwi }
        } else {
            let h0 = hour.min(23);
            let (wx1, has_next) = if h0 + 1 < 24 {
                (days[idx].hourly[h0 + 1], true)
            } else if idx + 1 < days.len() {
                (days[idx + 1].hourly[0], true)
            } else {
                (days[idx].hourly[h0], false)
            };
            let wx0 = days[idx].hourly[h0];
            let frac = ((sec_into_day % 3600) as f64) / 3600.0;

            let temp = wx0.temp + (wx1.temp - wx0.temp) * frac;
            let dew_point = wx0.dew_point + (wx1.dew_point - wx0.dew_point) * frac;
            let rh = wx0.rh + (wx1.rh - wx0.rh) * frac;
            let precip = if has_next { wx1.precip } else { 0.0 };

            let (ws, wd) = interpolate_wind(wx0.ws, wx0.wd, wx1.ws, wx1.wd, frac);

            let h1 = if h0 + 1 < 24 { h0 + 1 } else { 0 };
            let ifwi0 = days[idx].hfwi[h0];
            let ifwi1 = if has_next && h0 + 1 < 24 { days[idx].hfwi[h1] } else if has_next { days[idx + 1].hfwi[0] } else { ifwi0 };
            let lerp_code = |a: CodeValue, b: CodeValue| CodeValue{ specified: a.specified, calculated: a.calculated + (b.calculated - a.calculated) * frac };
            let ifwi = HourlyFwi{ ffmc: lerp_code(ifwi0.ffmc, ifwi1.ffmc), isi: lerp_code(ifwi0.isi, ifwi1.isi), fwi: lerp_code(ifwi0.fwi, ifwi1.fwi) };

            WxQueryResult {
                wx: HourlyWx{ temp, dew_point, rh, precip, ws, gust: wx0.gust, wd, bits: wx0.bits },
                ifwi,
                dfwi: day.dfwi,
            }
        };

        drop(days);
        if !flags.contains(InterpolationFlags::IGNORE_CACHE) {
            self.hourly_cache.write().unwrap().insert(cache_key, result);
        }
        Ok(result)
    }

    /// Trims days off both ends to `[start, start+duration)`. When `correct_initial_precip`,
    /// precipitation in days trimmed off the *front* is folded into `initial_rain` so
    /// cumulative-rain queries across the trim point remain exact.
    pub fn set_valid_time_range (&self, start: DateTime<Utc>, duration: Duration, correct_initial_precip: bool) {
        let end = start + duration;
        let mut days = self.days.write().unwrap();

        let mut trimmed_precip = 0.0;
        days.retain(|d| {
            let keep = d.start + Duration::hours(24) > start && d.start < end;
            if !keep && d.start < start { trimmed_precip += d.daily.precip; }
            keep
        });

        if correct_initial_precip && trimmed_precip > 0.0 {
            self.initial.write().unwrap().rain += trimmed_precip;
        }
        drop(days);
        self.invalidate();
    }

    /// Imports daily-format rows. See [`ImportOptions`] for the PURGE/APPEND/OVERWRITE
    /// semantics; prepending (a row earlier than the stream's current start) always fails.
    pub fn import_daily (&self, data: &str, opts: ImportOptions) -> Result<ImportReport> {
        opts.validate()?;
        let (rows, report) = import::parse_daily_csv(data)?;
        let new_days: Vec<Day> = rows.into_iter().map(|r| {
            let start = chrono::Utc.from_utc_datetime(&r.date.and_hms_opt(0, 0, 0).unwrap());
            Day::new_daily(start, DailyWx{
                min_temp: r.min_temp, max_temp: r.max_temp, min_ws: r.min_ws, max_ws: r.max_ws,
                min_gust: r.min_gust, max_gust: r.max_gust, rh: r.rh, precip: r.precip, wd: r.wd,
            })
        }).collect();
        self.merge_days(new_days, opts)?;
        Ok(report)
    }

    /// Imports hourly-format rows, grouping consecutive rows by date into [`Day`]s. FWI
    /// overrides present in the header (ffmc/dmc/dc/bui/isi/fwi) populate the specified
    /// companions and implicitly set the stream's `user_specified` flag.
    pub fn import_hourly (&self, data: &str, opts: ImportOptions) -> Result<ImportReport> {
        opts.validate()?;
        let (rows, report) = import::parse_hourly_csv(data)?;
        let mut any_override = false;
        let mut new_days: Vec<Day> = Vec::new();
        let mut cur_date = None;
        let mut cur_hours: [HourlyWx; 24] = [HourlyWx::default(); 24];
        let mut cur_hfwi: [HourlyFwi; 24] = [HourlyFwi::default(); 24];
        let mut cur_dfwi = DailyFwi::default();
        let mut min_hour = 0u32;
        let mut max_hour = 23u32;

        let flush = |new_days: &mut Vec<Day>, date: Option<chrono::NaiveDate>, hours: [HourlyWx; 24], hfwi: [HourlyFwi; 24], dfwi: DailyFwi, min_h: u32, max_h: u32| {
            if let Some(date) = date {
                let start = chrono::Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
                let mut day = Day::new_hourly(start, hours);
                day.hfwi = hfwi;
                day.dfwi = dfwi;
                day.first_hour = min_h;
                day.last_hour = max_h;
                new_days.push(day);
            }
        };

        for r in &rows {
            if cur_date != Some(r.date) {
                flush(&mut new_days, cur_date, cur_hours, cur_hfwi, cur_dfwi, min_hour, max_hour);
                cur_date = Some(r.date);
                cur_hours = [HourlyWx::default(); 24];
                cur_hfwi = [HourlyFwi::default(); 24];
                cur_dfwi = DailyFwi::default();
                min_hour = r.hour;
                max_hour = r.hour;
            }
            min_hour = min_hour.min(r.hour);
            max_hour = max_hour.max(r.hour);

            let mut bits = SpecifiedBits::SPECIFIED_TEMPERATURE | SpecifiedBits::SPECIFIED_RH
                | SpecifiedBits::SPECIFIED_PRECIPITATION | SpecifiedBits::SPECIFIED_WINDSPEED | SpecifiedBits::SPECIFIED_WINDDIRECTION;
            if r.gust.is_some() { bits.set(SpecifiedBits::SPECIFIED_WINDGUST); }
            if r.dew_point.is_some() { bits.set(SpecifiedBits::SPECIFIED_DEWPOINTTEMPERATURE); }

            let dew_point = r.dew_point.unwrap_or_else(|| crate::diurnal::dew_point(r.temp, r.rh));
            cur_hours[r.hour as usize] = HourlyWx{ temp: r.temp, dew_point, rh: r.rh, precip: r.precip, ws: r.ws, gust: r.gust, wd: r.wd, bits };

            if let Some(v) = r.ffmc { cur_hfwi[r.hour as usize].ffmc.specified = v; any_override = true; }
            if let Some(v) = r.isi { cur_hfwi[r.hour as usize].isi.specified = v; any_override = true; }
            if let Some(v) = r.fwi { cur_hfwi[r.hour as usize].fwi.specified = v; any_override = true; }
            if let Some(v) = r.dmc { cur_dfwi.dmc.specified = v; any_override = true; }
            if let Some(v) = r.dc { cur_dfwi.dc.specified = v; any_override = true; }
            if let Some(v) = r.bui { cur_dfwi.bui.specified = v; any_override = true; }
        }
        flush(&mut new_days, cur_date, cur_hours, cur_hfwi, cur_dfwi, min_hour, max_hour);

        self.merge_days(new_days, opts)?;
        if any_override { self.user_specified.store(true, Ordering::SeqCst); }
        Ok(report)
    }

    fn merge_days (&self, mut new_days: Vec<Day>, opts: ImportOptions) -> Result<()> {
        if new_days.is_empty() { return Ok(()); }
        let mut days = self.days.write().unwrap();

        if opts.purge {
            *days = new_days;
        } else if days.is_empty() {
            *days = new_days;
        } else {
            let existing_start = days[0].start;
            let existing_end = days.last().unwrap().start;
            let new_start = new_days[0].start;

            if new_start < existing_start {
                return Err(OdinWxError::AttemptPrepend);
            } else if new_start <= existing_end {
                if !opts.overwrite { return Err(OdinWxError::AttemptOverwrite); }
                days.retain(|d| d.start < new_start);
                days.append(&mut new_days);
            } else {
                if opts.append && new_start != existing_end + Duration::hours(24) {
                    return Err(op_failed!("import would leave a gap; APPEND requires contiguous extension"));
                }
                days.append(&mut new_days);
            }
        }
        drop(days);
        self.invalidate();
        Ok(())
    }

    pub fn export_daily (&self) -> String {
        self.ensure_fresh();
        export::export_daily_csv(&self.days.read().unwrap())
    }

    pub fn export_hourly (&self) -> String {
        self.ensure_fresh();
        export::export_hourly_csv(&self.days.read().unwrap())
    }

    /// Daily FWI codes for the day containing `t`, spatially-neutral (used by the grid's
    /// IDW aggregation of daily codes).
    pub fn daily_fwi_at (&self, t: DateTime<Utc>) -> Option<DailyFwi> {
        self.ensure_fresh();
        let idx = self.day_index_at(t)?;
        Some(self.days.read().unwrap()[idx].dfwi)
    }

    pub fn location_deg (&self) -> (f64, f64) { (*self.lat_deg.read().unwrap(), *self.lon_deg.read().unwrap()) }
}

/// Wind interpolation: shorter signed arc, antipodal snap, dead-calm fallback.
pub fn interpolate_wind (ws0: f64, wd0: f64, ws1: f64, wd1: f64, frac: f64) -> (f64, f64) {
    let calm0 = ws0 <= 0.0001 || wd0.abs() <= 0.0001;
    let calm1 = ws1 <= 0.0001 || wd1.abs() <= 0.0001;

    let ws = ws0 + (ws1 - ws0) * frac;

    if calm0 && calm1 {
        return (ws, 0.0);
    } else if calm0 {
        return (ws, wd1);
    } else if calm1 {
        return (ws, wd0);
    }

    let two_pi = std::f64::consts::TAU;
    let mut delta = (wd1 - wd0) % two_pi;
    if delta > std::f64::consts::PI { delta -= two_pi; }
    if delta < -std::f64::consts::PI { delta += two_pi; }

    if (delta.abs() - std::f64::consts::PI).abs() < 1f64.to_radians() {
        // near-antipodal: snap to the closer hour rather than averaging through an
        // arbitrary midpoint.
        let wd = if frac < 0.5 { wd0 } else { wd1 };
        return (ws, wd);
    }

    let wd = (wd0 + delta * frac).rem_euclid(two_pi);
    (ws, wd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WxConfig;

    fn sample_daily_csv () -> &'static str {
        "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n\
         2024-07-01,10,28,30,0,0,0,0\n\
         2024-07-02,11,27,35,0,0,0,0\n"
    }

    #[test]
    fn import_daily_then_query_produces_finite_results () {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(sample_daily_csv(), ImportOptions::default()).unwrap();
        let t = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let r = stream.get_instantaneous(t, InterpolationFlags::INTERPOLATE_TEMPORAL).unwrap();
        assert!(r.wx.temp.is_finite());
        assert!(r.dfwi.fwi.calculated.is_finite());
    }

    #[test]
    fn prepend_import_is_rejected () {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(sample_daily_csv(), ImportOptions::default()).unwrap();
        let earlier = "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n2024-06-01,10,28,30,0,0,0,0\n";
        let err = stream.import_daily(earlier, ImportOptions::default()).unwrap_err();
        assert!(matches!(err, OdinWxError::AttemptPrepend));
    }

    #[test]
    fn overlapping_import_without_overwrite_is_rejected () {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(sample_daily_csv(), ImportOptions::default()).unwrap();
        let overlap = "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n2024-07-02,11,27,35,0,0,0,0\n";
        let err = stream.import_daily(overlap, ImportOptions::default()).unwrap_err();
        assert!(matches!(err, OdinWxError::AttemptOverwrite));
    }

    #[test]
    fn wind_antipodal_pair_snaps_to_nearer_hour () {
        let (_, wd) = interpolate_wind(10.0, 0.0, 10.0, std::f64::consts::PI, 0.2);
        assert_eq!(wd, 0.0);
        let (_, wd) = interpolate_wind(10.0, 0.0, 10.0, std::f64::consts::PI, 0.8);
        assert_eq!(wd, std::f64::consts::PI);
    }

    #[test]
    fn dead_calm_hour_falls_back_to_the_other () {
        let (_, wd) = interpolate_wind(0.0, 0.0, 10.0, 1.5, 0.5);
        assert_eq!(wd, 1.5);
    }

    #[test]
    fn get_event_time_steps_one_hour_forward () {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(sample_daily_csv(), ImportOptions::default()).unwrap();
        let t = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 5, 0, 0).unwrap();
        let next = stream.get_event_time(t, EventDirection::Forward).unwrap();
        assert_eq!(next, chrono::Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn set_valid_time_range_is_idempotent () {
        let stream = WeatherStream::new(chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), WxConfig::default());
        stream.import_daily(sample_daily_csv(), ImportOptions::default()).unwrap();
        let start = chrono::Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        stream.set_valid_time_range(start, Duration::hours(24), true);
        let after1 = stream.day_count();
        stream.set_valid_time_range(start, Duration::hours(24), true);
        let after2 = stream.day_count();
        assert_eq!(after1, after2);
    }
}
