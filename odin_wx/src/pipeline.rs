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

//! The query driver that ties grid, cache, polygon filters and sectored wind overrides
//! into one resolved reading: raw weather where nothing overrides it, a full FFMC/DMC/
//! DC/BUI/ISI/FWI re-equilibration where something does, and a constant-time shortcut once
//! the query falls far enough behind the simulation's current time that the answer is just
//! the stream's starting codes.

use std::sync::{Arc, RwLock};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use tracing::instrument;

use crate::cache::{CachedValue, WeatherCache};
use crate::config::{FfmcMethod, WxConfig};
use crate::day::EventDirection;
use crate::errors::{OdinWxError, Result};
use crate::op_failed;
use crate::filter::PolygonFilter;
use crate::fwi;
use crate::grid::WeatherGrid;
use crate::sector::SectoredOverrideGrid;
use crate::types::{CodeValue, DailyFwi, HourlyFwi, HourlyWx, InterpolationFlags, SpecifiedBits, WxQueryResult};

const OVERRODE_MASK: u32 = SpecifiedBits::OVERRODE_TEMPERATURE.0
    | SpecifiedBits::OVERRODE_DEWPOINTTEMPERATURE.0
    | SpecifiedBits::OVERRODE_RH.0
    | SpecifiedBits::OVERRODE_PRECIPITATION.0
    | SpecifiedBits::OVERRODE_WINDSPEED.0
    | SpecifiedBits::OVERRODE_WINDDIRECTION.0;

fn any_override (bits: SpecifiedBits) -> bool { bits.0 & OVERRODE_MASK != 0 }

fn snap_to_hour (t: DateTime<Utc>) -> DateTime<Utc> {
    let snapped = (t.timestamp() / 3600) * 3600;
    Utc.timestamp_opt(snapped, 0).single().unwrap()
}

/// LST midnight of the day containing `t`, converted back to a UTC instant.
fn day_start_lst (t: DateTime<Utc>, utc_offset_hours: f64) -> DateTime<Utc> {
    let offset = Duration::seconds((utc_offset_hours * 3600.0) as i64);
    let local = t + offset;
    let midnight_local = Utc.from_utc_datetime(&local.date_naive().and_hms_opt(0, 0, 0).unwrap());
    midnight_local - offset
}

/// Orchestrates a single resolved weather+FWI query: the component that a host simulator
/// actually calls once per grid cell per time step. Owns no weather data itself - it
/// borrows a [`WeatherGrid`] and a [`WeatherCache`], and holds the polygon/sector overrides
/// that sit between the two.
pub struct WeatherPipeline {
    pub grid: Arc<WeatherGrid>,
    pub cache: Arc<WeatherCache>,
    cfg: WxConfig,
    equilibrium_time: RwLock<DateTime<Utc>>,
    filters: RwLock<Vec<PolygonFilter>>,
    wd_sectors: RwLock<Vec<SectoredOverrideGrid>>,
    ws_sectors: RwLock<Vec<SectoredOverrideGrid>>,
}

impl WeatherPipeline {
    pub fn new (grid: Arc<WeatherGrid>, cache: Arc<WeatherCache>, cfg: WxConfig) -> Self {
        WeatherPipeline {
            grid, cache, cfg,
            equilibrium_time: RwLock::new(Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()),
            filters: RwLock::new(Vec::new()),
            wd_sectors: RwLock::new(Vec::new()),
            ws_sectors: RwLock::new(Vec::new()),
        }
    }

    /// The simulation's current time. Queries at or before `equilibrium_time - equilibrium_days`
    /// take the constant-time starting-codes shortcut instead of recomputing FWI history.
    pub fn set_equilibrium_time (&self, t: DateTime<Utc>) { *self.equilibrium_time.write().unwrap() = t; }
    pub fn equilibrium_time (&self) -> DateTime<Utc> { *self.equilibrium_time.read().unwrap() }

    pub fn add_filter (&self, filter: PolygonFilter) -> Result<()> {
        filter.validate()?;
        self.filters.write().unwrap().push(filter);
        Ok(())
    }

    pub fn add_wind_direction_sector (&self, sector: SectoredOverrideGrid) { self.wd_sectors.write().unwrap().push(sector); }
    pub fn add_wind_speed_sector (&self, sector: SectoredOverrideGrid) { self.ws_sectors.write().unwrap().push(sector); }

    /// Grid weather at `(x, y, t)` with every polygon filter and sectored wind override
    /// applied, outward to inward: filters in registration order, then wind-direction
    /// sectors (selected by the reading's *current* direction), then wind-speed sectors
    /// (selected by the, possibly just-overridden, direction).
    fn raw_weather_at (&self, x: f64, y: f64, t: DateTime<Utc>, flags: InterpolationFlags) -> Result<WxQueryResult> {
        let mut result = self.grid.query_at(x, y, t, flags)?;

        for f in self.filters.read().unwrap().iter() {
            f.apply(x, y, t, &mut result.wx);
        }

        if let Some((ix, iy)) = self.grid.cell_index(x, y) {
            let wd_deg = result.wx.wd.to_degrees().rem_euclid(360.0);
            for s in self.wd_sectors.read().unwrap().iter() {
                let (v, bits) = s.resolve(ix, iy, t, wd_deg, result.wx.ws);
                result.wx.bits.set(bits);
                if let Some(v) = v { result.wx.wd = v.to_radians(); }
            }

            let wd_deg = result.wx.wd.to_degrees().rem_euclid(360.0);
            for s in self.ws_sectors.read().unwrap().iter() {
                let (v, bits) = s.resolve(ix, iy, t, wd_deg, result.wx.ws);
                result.wx.bits.set(bits);
                if let Some(v) = v { result.wx.ws = v; }
            }
        }

        Ok(result)
    }

    /// The fully resolved reading at `(x, y, t)`: cache lookup, raw+override fetch, and - if
    /// anything overrode the raw reading or spatial/history interpolation was asked for - a
    /// full FWI re-equilibration from yesterday's codes, or the equilibrium-horizon shortcut
    /// if `t` is old enough that the re-equilibration would just reproduce the starting codes.
    #[instrument(skip(self, flags), fields(layer, alternate))]
    pub fn get_calculated_values (&self, layer: &str, alternate: bool, x: f64, y: f64, t: DateTime<Utc>, flags: InterpolationFlags) -> Result<WxQueryResult> {
        let t = if flags.contains(InterpolationFlags::INTERPOLATE_TEMPORAL) { t } else { snap_to_hour(t) };
        let utc_offset = self.grid.primary_stream().map(|s| s.utc_offset_hours).unwrap_or(0.0);
        let cell = self.grid.cell_index(x, y);

        if !flags.contains(InterpolationFlags::IGNORE_CACHE) {
            if let Some((ix, iy)) = cell {
                if let Some(cached) = self.cache.get(layer, alternate, ix, iy, t, utc_offset, flags.0) {
                    tracing::debug!(%t, "weather cache hit");
                    return Ok(cached.result);
                }
            }
        }

        let raw = self.raw_weather_at(x, y, t, flags)?;
        let needs_recompute = any_override(raw.wx.bits)
            || flags.contains(InterpolationFlags::INTERPOLATE_SPATIAL)
            || flags.contains(InterpolationFlags::INTERPOLATE_HISTORY);

        let result = if !needs_recompute {
            raw
        } else if t <= self.equilibrium_time() - Duration::days(self.cfg.equilibrium_days) {
            tracing::debug!(%t, equilibrium_time = %self.equilibrium_time(), "equilibrium horizon shortcut");
            self.synthesize_from_initial(raw.wx)?
        } else {
            let today_dfwi = self.get_calculated_dfwi_values(x, y, t, flags)?;
            let ifwi = self.get_calculated_ifwi_values(layer, alternate, x, y, t, flags, &today_dfwi, raw.wx)?;
            WxQueryResult{ wx: raw.wx, ifwi, dfwi: today_dfwi }
        };

        if let Some((ix, iy)) = cell {
            self.cache.store(layer, alternate, ix, iy, t, utc_offset, flags.0, CachedValue{ time: t, result });
        }
        Ok(result)
    }

    /// Beyond the equilibrium horizon, weather is still reported but FWI collapses to the
    /// stream's starting codes with the instantaneous codes zeroed: there is no history left
    /// to walk back through.
    fn synthesize_from_initial (&self, wx: HourlyWx) -> Result<WxQueryResult> {
        let stream = self.grid.primary_stream().ok_or(OdinWxError::GridUninitialized)?;
        let initial = stream.initial_codes();
        let bui = if initial.bui >= 0.0 { initial.bui } else { fwi::bui(initial.dc.max(0.0), initial.dmc.max(0.0)) };
        let dfwi = DailyFwi {
            ffmc: CodeValue::new(initial.ffmc), dmc: CodeValue::new(initial.dmc), dc: CodeValue::new(initial.dc),
            bui: CodeValue::new(bui), isi: CodeValue::new(0.0), fwi: CodeValue::new(0.0),
        };
        Ok(WxQueryResult{ wx, ifwi: HourlyFwi::default(), dfwi })
    }

    /// Today's daily FWI codes: yesterday's spatially-interpolated codes carried forward one
    /// day under today's noon-LST weather and the 24h rain total preceding day-start.
    fn get_calculated_dfwi_values (&self, x: f64, y: f64, t: DateTime<Utc>, flags: InterpolationFlags) -> Result<DailyFwi> {
        let utc_offset = self.grid.primary_stream().map(|s| s.utc_offset_hours).unwrap_or(0.0);
        let today_start = day_start_lst(t, utc_offset);
        let yesterday_start = today_start - Duration::days(1);

        let yesterday_dfwi = self.grid.daily_fwi_codes_at(x, y, yesterday_start)
            .ok_or_else(|| op_failed!("no daily FWI codes available for the preceding day"))?;

        let noon = today_start + Duration::hours(12);
        let wx_noon = self.raw_weather_at(x, y, noon, flags)?.wx;

        let mut rain24 = 0.0;
        for h in 1..=24i64 {
            let hour_t = today_start - Duration::hours(h);
            rain24 += self.raw_weather_at(x, y, hour_t, flags)?.wx.precip;
        }

        let lat = self.grid.primary_stream().map(|s| s.location_deg().0).unwrap_or(45.0);
        let month = today_start.month();
        let (tmax, rh_pct, ws) = (wx_noon.temp, wx_noon.rh * 100.0, wx_noon.ws);

        let dc_calc = fwi::dc(yesterday_dfwi.dc.calculated, tmax, rain24, lat, month);
        let dmc_calc = fwi::dmc(yesterday_dfwi.dmc.calculated, tmax, rh_pct, rain24, lat, month);
        let bui_calc = fwi::bui(dc_calc, dmc_calc);
        let ffmc_calc = fwi::daily_ffmc_vanwagner(yesterday_dfwi.ffmc.calculated, rain24, tmax, rh_pct, ws);
        let isi_calc = fwi::isi_fbp(ffmc_calc, ws, 86400.0);
        let fwi_calc = fwi::fwi(isi_calc, bui_calc);

        Ok(DailyFwi {
            ffmc: CodeValue::new(ffmc_calc), dmc: CodeValue::new(dmc_calc), dc: CodeValue::new(dc_calc),
            bui: CodeValue::new(bui_calc), isi: CodeValue::new(isi_calc), fwi: CodeValue::new(fwi_calc),
        })
    }

    /// Today's instantaneous FWI codes, one stream-configured method or the other.
    /// `LawsonContiguous` interpolates between yesterday's and today's daily FFMC by time of
    /// day and nudges it forward under the current hour's weather. `VanWagner` walks
    /// backward to the previous event time - recursively re-resolving through this same
    /// driver, so a cache hit along the way stops the walk - and propagates forward across
    /// the elapsed interval.
    fn get_calculated_ifwi_values (
        &self, layer: &str, alternate: bool, x: f64, y: f64, t: DateTime<Utc>, flags: InterpolationFlags,
        today_dfwi: &DailyFwi, wx_now: HourlyWx,
    ) -> Result<HourlyFwi> {
        let stream = self.grid.primary_stream().ok_or(OdinWxError::GridUninitialized)?;

        let ffmc_new = match stream.ffmc_method() {
            FfmcMethod::LawsonContiguous => {
                let utc_offset = stream.utc_offset_hours;
                let today_start = day_start_lst(t, utc_offset);
                let yesterday_start = today_start - Duration::days(1);
                let yesterday_dfwi = self.grid.daily_fwi_codes_at(x, y, yesterday_start)
                    .ok_or_else(|| op_failed!("no daily FWI codes available for the preceding day"))?;

                let wx_prev = self.raw_weather_at(x, y, t - Duration::hours(1), flags)?.wx;
                let wx_next = self.raw_weather_at(x, y, t + Duration::hours(1), flags)?.wx;
                let sec_since_midnight = (t - today_start).num_seconds() as f64;

                fwi::hourly_ffmc_lawson_contiguous(
                    yesterday_dfwi.ffmc.calculated, today_dfwi.ffmc.calculated, wx_now.precip, wx_now.temp,
                    wx_prev.rh * 100.0, wx_now.rh * 100.0, wx_next.rh * 100.0, wx_now.ws, sec_since_midnight,
                )
            }
            FfmcMethod::VanWagner => {
                let prev_event = self.grid.get_event_time(t, EventDirection::Backward)
                    .ok_or_else(|| op_failed!("no prior event time to walk back to"))?;

                let prev_ffmc = if prev_event < t {
                    self.get_calculated_values(layer, alternate, x, y, prev_event, flags)?.ifwi.ffmc.calculated
                } else {
                    // already at the stream's earliest representable hour: today's own
                    // daily FFMC seeds the walk instead of recursing forever.
                    today_dfwi.ffmc.calculated
                };

                let dt_seconds = (t - prev_event).num_seconds().max(1) as f64;
                fwi::hourly_ffmc_vanwagner(prev_ffmc, wx_now.precip, wx_now.temp, wx_now.rh * 100.0, wx_now.ws, dt_seconds)
            }
        };

        let isi_new = fwi::isi_fbp(ffmc_new, wx_now.ws, 3600.0);
        let fwi_new = fwi::fwi(isi_new, today_dfwi.bui.calculated);
        Ok(HourlyFwi{ ffmc: CodeValue::new(ffmc_new), isi: CodeValue::new(isi_new), fwi: CodeValue::new(fwi_new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::WeatherCache;
    use crate::filter::FilterOp;
    use crate::grid_engine::{ConstantElevationGrid, GridEngine};
    use crate::import::ImportOptions;
    use crate::station::{StationLocation, WeatherStation};
    use crate::stream::WeatherStream;
    use odin_common::angle::{Latitude, Longitude};

    fn flat_daily_csv (start: DateTime<Utc>, days: i64) -> String {
        let mut csv = String::from("date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n");
        for d in 0..days {
            let date = (start + Duration::days(d)).format("%Y-%m-%d");
            csv.push_str(&format!("{date},10,20,40,0,5,10,0\n"));
        }
        csv
    }

    fn make_pipeline (start: DateTime<Utc>, days: i64) -> (Arc<WeatherGrid>, WeatherPipeline) {
        let stream = WeatherStream::new(start, WxConfig::default());
        stream.import_daily(&flat_daily_csv(start, days), ImportOptions::default()).unwrap();
        let station = WeatherStation::new("A", StationLocation{
            lat: Latitude::from_degrees(45.0), lon: Longitude::from_degrees(-110.0), grid_x: 0.0, grid_y: 0.0,
        });
        station.add_stream(stream.clone());

        let engine: Arc<dyn GridEngine> = Arc::new(ConstantElevationGrid::new(10, 10, 30.0, (0.0, 0.0), 500.0));
        let cfg = WxConfig::default();
        let grid = Arc::new(WeatherGrid::new(engine, &cfg));
        grid.add_stream(stream, station).unwrap();

        let cache = Arc::new(WeatherCache::new(10, 10, 100, 10));
        let pipeline = WeatherPipeline::new(grid.clone(), cache, cfg);
        (grid, pipeline)
    }

    #[test]
    fn no_override_passes_raw_query_through_unchanged () {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (grid, pipeline) = make_pipeline(start, 5);
        let t = start + Duration::hours(12);

        let direct = grid.query_at(0.0, 0.0, t, InterpolationFlags::NONE).unwrap();
        let piped = pipeline.get_calculated_values("layer", false, 0.0, 0.0, t, InterpolationFlags::NONE).unwrap();
        assert_eq!(direct, piped);
    }

    #[test]
    fn repeated_query_hits_cache_and_is_deterministic () {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (_grid, pipeline) = make_pipeline(start, 5);
        let t = start + Duration::hours(12);
        let flags = InterpolationFlags::INTERPOLATE_HISTORY;

        let r1 = pipeline.get_calculated_values("layer", false, 0.0, 0.0, t, flags).unwrap();
        let r2 = pipeline.get_calculated_values("layer", false, 0.0, 0.0, t, flags).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn equilibrium_horizon_shortcut_returns_starting_codes () {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (_grid, pipeline) = make_pipeline(start, 60);
        pipeline.set_equilibrium_time(start + Duration::days(100));

        let t = start + Duration::hours(5);
        let result = pipeline.get_calculated_values("layer", false, 0.0, 0.0, t, InterpolationFlags::INTERPOLATE_HISTORY).unwrap();

        let initial = WxConfig::default().initial;
        assert_eq!(result.dfwi.ffmc.calculated, initial.ffmc);
        assert_eq!(result.dfwi.dc.calculated, initial.dc);
        assert_eq!(result.ifwi.fwi.calculated, 0.0);
    }

    #[test]
    fn landscape_filter_triggers_fwi_recompute () {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (grid, pipeline) = make_pipeline(start, 5);

        let mut f = PolygonFilter::new(start, start + Duration::days(5), vec![]);
        f.landscape = true;
        f.temp_op = Some((FilterOp::Add, 15.0));
        pipeline.add_filter(f).unwrap();

        let t = start + Duration::days(1) + Duration::hours(3);
        let result = pipeline.get_calculated_values("layer", false, 0.0, 0.0, t, InterpolationFlags::NONE).unwrap();
        let raw_direct = grid.query_at(0.0, 0.0, t, InterpolationFlags::NONE).unwrap();

        assert!((result.wx.temp - (raw_direct.wx.temp + 15.0)).abs() < 1e-9);
        assert!(result.dfwi.fwi.calculated.is_finite());
        assert!(result.ifwi.fwi.calculated.is_finite());
    }
}
