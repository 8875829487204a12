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

//! One day's weather record (daily or hourly specified) plus its derived FWI codes.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::config::{WxConfig, FfmcMethod};
use crate::diurnal::{self, DayExtremes, DaySolar};
use crate::fwi;
use crate::solar;
use crate::types::{DailyWx, HourlyWx, DailyFwi, HourlyFwi, CodeValue};
use crate::errors::{Result, OdinWxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaySpecification { Daily, Hourly }

/// Whether a given hour of a day is backed by real data, lies within an hourly-specified
/// day, or lies outside the stream's valid first/last hour at the stream's ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourlySpecified { Yes, No, OutOfRange }

/// Direction of a boundary search, as used by [`Day::next_hour_boundary`] and the
/// stream-level `get_event_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDirection { Forward, Backward }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub start: DateTime<Utc>, // LST midnight of this day
    pub spec: DaySpecification,
    pub daily: DailyWx,
    pub hourly: [HourlyWx; 24],
    pub dfwi: DailyFwi,
    pub hfwi: [HourlyFwi; 24],
    /// only meaningful for the stream's first day
    pub first_hour: u32,
    /// only meaningful for the stream's last day
    pub last_hour: u32,
}

impl Day {
    pub fn new_daily (start: DateTime<Utc>, daily: DailyWx) -> Self {
        Day {
            start, spec: DaySpecification::Daily, daily,
            hourly: [HourlyWx::default(); 24],
            dfwi: DailyFwi::default(), hfwi: [HourlyFwi::default(); 24],
            first_hour: 0, last_hour: 23,
        }
    }

    pub fn new_hourly (start: DateTime<Utc>, hourly: [HourlyWx; 24]) -> Self {
        let daily = aggregate_to_daily(&hourly);
        Day {
            start, spec: DaySpecification::Hourly, daily, hourly,
            dfwi: DailyFwi::default(), hfwi: [HourlyFwi::default(); 24],
            first_hour: 0, last_hour: 23,
        }
    }

    pub fn is_hourly_specified_day (&self) -> bool { self.spec == DaySpecification::Hourly }

    pub fn set_daily (&mut self, daily: DailyWx) -> Result<()> {
        if self.spec == DaySpecification::Hourly {
            return Err(OdinWxError::OpFailedError("day is hourly-specified".into()));
        }
        self.daily = daily;
        Ok(())
    }

    pub fn set_hourly (&mut self, hour: usize, wx: HourlyWx) -> Result<()> {
        if self.spec == DaySpecification::Daily {
            return Err(OdinWxError::OpFailedError("day is daily-specified".into()));
        }
        if hour >= 24 { return Err(OdinWxError::OpFailedError(format!("hour {hour} out of range"))); }
        self.hourly[hour] = wx;
        self.daily = aggregate_to_daily(&self.hourly);
        Ok(())
    }

    /// Next hour boundary strictly within this day, in the requested direction from
    /// `hour`. `None` means the search fell off the day's edge and the caller should
    /// delegate to the adjacent day (or, if none exists, to this day's own start/end).
    pub fn next_hour_boundary (&self, hour: u32, direction: EventDirection) -> Option<u32> {
        match direction {
            EventDirection::Forward => if hour < 23 { Some(hour + 1) } else { None },
            EventDirection::Backward => if hour > 0 { Some(hour - 1) } else { None },
        }
    }

    pub fn is_hourly_specified (&self, hour: u32, is_first_day: bool, is_last_day: bool) -> HourlySpecified {
        if is_first_day && hour < self.first_hour { return HourlySpecified::OutOfRange; }
        if is_last_day && hour > self.last_hour { return HourlySpecified::OutOfRange; }
        if self.spec == DaySpecification::Hourly { HourlySpecified::Yes } else { HourlySpecified::No }
    }

    /// Reconstructs the full hourly curve for a daily-specified day from its extremes.
    pub fn reconstruct_hourly (
        &mut self, lat_deg: f64, lon_deg: f64, utc_offset_hours: f64, cfg: &WxConfig,
        yesterday_sunset_temp: f64, yesterday_sunset_ws: f64, tomorrow_sunrise_sec: f64,
    ) {
        if self.spec == DaySpecification::Hourly { return; }

        let suns = solar::sun_times(self.start, lat_deg, lon_deg, utc_offset_hours);
        let solar_day = DaySolar{ sunrise_sec: suns.sunrise_sec, solar_noon_sec: suns.solar_noon_sec, sunset_sec: suns.sunset_sec };
        let extremes = DayExtremes {
            min_temp: self.daily.min_temp, max_temp: self.daily.max_temp,
            min_ws: self.daily.min_ws, max_ws: self.daily.max_ws, daily_rh: self.daily.rh,
        };

        for h in 0..24u32 {
            let t_sec = h as f64 * 3600.0 + 1800.0; // hour midpoint
            let temp = diurnal::temp_at(t_sec, &extremes, &solar_day, &cfg.temp_coeffs, yesterday_sunset_temp);
            let ws = diurnal::wind_at(t_sec, &extremes, &solar_day, &cfg.wind_coeffs, yesterday_sunset_ws, tomorrow_sunrise_sec + 86400.0);
            let rh = diurnal::rh_at(temp, &extremes);
            let dew = diurnal::dew_point(temp, rh);
            let precip = diurnal::precip_at_hour(h, self.daily.precip);

            self.hourly[h as usize] = HourlyWx {
                temp, dew_point: dew, rh, precip, ws, gust: None, wd: self.daily.wd,
                bits: Default::default(),
            };
        }
    }

    /// Daily DC -> DMC -> BUI -> daily FFMC -> hourly FFMC -> ISI -> FWI, honouring any
    /// user-specified overrides when `cfg.fwi_use_specified` is set.
    pub fn calculate_fwi (&mut self, yesterday: Option<&DailyFwi>, lat_deg: f64, month: u32, cfg: &WxConfig) {
        let honour = cfg.fwi_use_specified;
        let yda = yesterday.copied().unwrap_or_default();

        let rain24 = self.daily.precip;
        let tmax = self.daily.max_temp;
        let rh_mean_pct = self.daily.rh * 100.0;
        let ws_mean = (self.daily.min_ws + self.daily.max_ws) / 2.0;

        let dc_calc = fwi::dc(yda.dc.value(honour), tmax, rain24, lat_deg, month);
        self.dfwi.dc = CodeValue{ specified: self.dfwi.dc.specified, calculated: dc_calc };

        let dmc_calc = fwi::dmc(yda.dmc.value(honour), tmax, rh_mean_pct, rain24, lat_deg, month);
        self.dfwi.dmc = CodeValue{ specified: self.dfwi.dmc.specified, calculated: dmc_calc };

        let bui_calc = fwi::bui(self.dfwi.dc.value(honour), self.dfwi.dmc.value(honour));
        self.dfwi.bui = CodeValue{ specified: self.dfwi.bui.specified, calculated: bui_calc };

        let ffmc_calc = fwi::daily_ffmc_vanwagner(yda.ffmc.value(honour), rain24, tmax, rh_mean_pct, ws_mean);
        self.dfwi.ffmc = CodeValue{ specified: self.dfwi.ffmc.specified, calculated: ffmc_calc };

        let isi_calc = fwi::isi_fbp(self.dfwi.ffmc.value(honour), ws_mean, 86400.0);
        self.dfwi.isi = CodeValue{ specified: self.dfwi.isi.specified, calculated: isi_calc };

        let fwi_calc = fwi::fwi(self.dfwi.isi.value(honour), self.dfwi.bui.value(honour));
        self.dfwi.fwi = CodeValue{ specified: self.dfwi.fwi.specified, calculated: fwi_calc };

        self.calculate_hourly_ffmc(yda.ffmc.value(honour), cfg);
    }

    fn calculate_hourly_ffmc (&mut self, yesterday_daily_ffmc: f64, cfg: &WxConfig) {
        let honour = cfg.fwi_use_specified;
        let today_daily_ffmc = self.dfwi.ffmc.value(honour);

        match cfg.ffmc_method {
            FfmcMethod::VanWagner => {
                let mut prev = yesterday_daily_ffmc;
                for h in 0..24usize {
                    let wx = self.hourly[h];
                    let calc = fwi::hourly_ffmc_vanwagner(prev, wx.precip, wx.temp, wx.rh * 100.0, wx.ws, 3600.0);
                    self.hfwi[h].ffmc = CodeValue{ specified: self.hfwi[h].ffmc.specified, calculated: calc };
                    prev = self.hfwi[h].ffmc.value(honour);
                }
            }
            FfmcMethod::LawsonContiguous => {
                for h in 0..24usize {
                    let wx = self.hourly[h];
                    let rh_prev = self.hourly[h.saturating_sub(1)].rh * 100.0;
                    let rh_next = self.hourly[(h + 1).min(23)].rh * 100.0;
                    let calc = fwi::hourly_ffmc_lawson_contiguous(
                        yesterday_daily_ffmc, today_daily_ffmc, wx.precip, wx.temp,
                        rh_prev, wx.rh * 100.0, rh_next, wx.ws, h as f64 * 3600.0,
                    );
                    self.hfwi[h].ffmc = CodeValue{ specified: self.hfwi[h].ffmc.specified, calculated: calc };
                }
            }
        }

        for h in 0..24usize {
            let wx = self.hourly[h];
            let isi = fwi::isi_fbp(self.hfwi[h].ffmc.value(honour), wx.ws, 3600.0);
            self.hfwi[h].isi = CodeValue{ specified: self.hfwi[h].isi.specified, calculated: isi };
            let fwi_val = fwi::fwi(self.hfwi[h].isi.value(honour), self.dfwi.bui.value(honour));
            self.hfwi[h].fwi = CodeValue{ specified: self.hfwi[h].fwi.specified, calculated: fwi_val };
        }
    }

    /// Re-seeds the Van Wagner hourly FFMC curve of the stream's *first* day from an
    /// explicit initial-HFFMC reading taken at `hffmc_hour_sec` (LST seconds since
    /// midnight). Hours before the reading are recovered by backward recursion
    /// ([`fwi::hourly_ffmc_vanwagner_previous`]); hours after, by ordinary forward
    /// recursion. No-op under the Lawson method, which doesn't seed from an hourly value.
    pub fn apply_initial_hffmc (&mut self, cfg: &WxConfig, hffmc: f64, hffmc_hour_sec: f64) {
        if cfg.ffmc_method != FfmcMethod::VanWagner { return; }
        let honour = cfg.fwi_use_specified;
        let seed_hour = ((hffmc_hour_sec / 3600.0).floor() as usize).min(23);

        self.hfwi[seed_hour].ffmc = CodeValue{ specified: self.hfwi[seed_hour].ffmc.specified, calculated: hffmc };

        // backward from the seed hour down to hour 0
        let mut cur = hffmc;
        for h in (0..seed_hour).rev() {
            let wx_next = self.hourly[h + 1];
            cur = fwi::hourly_ffmc_vanwagner_previous(cur, wx_next.precip, wx_next.temp, wx_next.rh * 100.0, wx_next.ws, 3600.0);
            self.hfwi[h].ffmc = CodeValue{ specified: self.hfwi[h].ffmc.specified, calculated: cur };
        }

        // forward from the seed hour to the end of the day
        let mut cur = hffmc;
        for h in (seed_hour + 1)..24 {
            let wx = self.hourly[h];
            cur = fwi::hourly_ffmc_vanwagner(cur, wx.precip, wx.temp, wx.rh * 100.0, wx.ws, 3600.0);
            self.hfwi[h].ffmc = CodeValue{ specified: self.hfwi[h].ffmc.specified, calculated: cur };
        }

        for h in 0..24usize {
            let wx = self.hourly[h];
            let isi = fwi::isi_fbp(self.hfwi[h].ffmc.value(honour), wx.ws, 3600.0);
            self.hfwi[h].isi = CodeValue{ specified: self.hfwi[h].isi.specified, calculated: isi };
            let fwi_val = fwi::fwi(self.hfwi[h].isi.value(honour), self.dfwi.bui.value(honour));
            self.hfwi[h].fwi = CodeValue{ specified: self.hfwi[h].fwi.specified, calculated: fwi_val };
        }
    }
}

fn aggregate_to_daily (hourly: &[HourlyWx; 24]) -> DailyWx {
    let temps: Vec<f64> = hourly.iter().map(|h| h.temp).collect();
    let wss: Vec<f64> = hourly.iter().map(|h| h.ws).collect();
    let gusts: Vec<f64> = hourly.iter().filter_map(|h| h.gust).collect();

    let min_temp = temps.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_temp = temps.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_ws = wss.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_ws = wss.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let (min_gust, max_gust) = if gusts.is_empty() {
        (None, None)
    } else {
        (Some(gusts.iter().cloned().fold(f64::INFINITY, f64::min)),
         Some(gusts.iter().cloned().fold(f64::NEG_INFINITY, f64::max)))
    };

    let rh = hourly.iter().map(|h| h.rh).sum::<f64>() / 24.0;
    let precip = hourly.iter().map(|h| h.precip).sum();
    let (sin_sum, cos_sum) = hourly.iter().fold((0.0, 0.0), |(s, c), h| (s + h.wd.sin(), c + h.wd.cos()));
    let wd = sin_sum.atan2(cos_sum);

    DailyWx{ min_temp, max_temp, min_ws, max_ws, min_gust, max_gust, rh, precip, wd }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start () -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap() }

    #[test]
    fn set_daily_fails_on_hourly_day () {
        let mut day = Day::new_hourly(start(), [HourlyWx::default(); 24]);
        assert!(day.set_daily(DailyWx::default()).is_err());
    }

    #[test]
    fn set_hourly_fails_on_daily_day () {
        let mut day = Day::new_daily(start(), DailyWx::default());
        assert!(day.set_hourly(3, HourlyWx::default()).is_err());
    }

    #[test]
    fn reconstruct_hourly_preserves_daily_total_precip () {
        let mut day = Day::new_daily(start(), DailyWx{ precip: 5.0, ..Default::default() });
        day.reconstruct_hourly(45.0, -110.0, -7.0, &WxConfig::default(), 10.0, 2.0, 5.0*3600.0);
        let total: f64 = day.hourly.iter().map(|h| h.precip).sum();
        assert!((total - 5.0).abs() < 1e-9);
    }

    #[test]
    fn calculate_fwi_produces_finite_codes () {
        let mut day = Day::new_daily(start(), DailyWx{ min_temp: 10.0, max_temp: 25.0, rh: 0.4, precip: 0.0, min_ws: 2.0, max_ws: 15.0, ..Default::default() });
        let cfg = WxConfig::default();
        day.reconstruct_hourly(45.0, -110.0, -7.0, &cfg, 10.0, 2.0, 5.0*3600.0);
        day.calculate_fwi(None, 45.0, 7, &cfg);
        assert!(day.dfwi.fwi.calculated.is_finite());
        assert!(day.hfwi.iter().all(|h| h.fwi.calculated.is_finite()));
    }

    #[test]
    fn is_hourly_specified_out_of_range_before_first_hour () {
        let mut day = Day::new_hourly(start(), [HourlyWx::default(); 24]);
        day.first_hour = 5;
        assert_eq!(day.is_hourly_specified(3, true, false), HourlySpecified::OutOfRange);
        assert_eq!(day.is_hourly_specified(5, true, false), HourlySpecified::Yes);
    }
}
