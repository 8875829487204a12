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

//! Inverse of [`crate::import`]: serializes a stream's owned days back to CSV at the
//! precision named in the round-trip property (0.1 km/h wind, 0.01 degC temperature,
//! 0.01mm precip), preserving whichever specification (daily/hourly) the days are in.

use std::fmt::Write as _;
use crate::day::{Day, DaySpecification};

fn r2 (v: f64) -> f64 { (v * 100.0).round() / 100.0 }
fn r1 (v: f64) -> f64 { (v * 10.0).round() / 10.0 }

pub fn export_daily_csv (days: &[Day]) -> String {
    let mut out = String::new();
    writeln!(out, "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip").unwrap();
    for d in days {
        writeln!(out, "{},{:.2},{:.2},{:.1},{:.1},{:.1},{:.1},{:.2}",
            d.start.format("%Y-%m-%d"),
            r2(d.daily.min_temp), r2(d.daily.max_temp),
            r1(d.daily.rh * 100.0), r1(d.daily.wd.to_degrees().rem_euclid(360.0)),
            r1(d.daily.min_ws), r1(d.daily.max_ws), r2(d.daily.precip),
        ).unwrap();
    }
    out
}

pub fn export_hourly_csv (days: &[Day]) -> String {
    let mut out = String::new();
    writeln!(out, "date,hour,temp,rh,precip,ws,wd,gust,dew_point").unwrap();
    for d in days {
        for (h, wx) in d.hourly.iter().enumerate() {
            writeln!(out, "{},{},{:.2},{:.1},{:.2},{:.1},{:.1},{},{:.2}",
                d.start.format("%Y-%m-%d"), h,
                r2(wx.temp), r1(wx.rh * 100.0), r2(wx.precip), r1(wx.ws),
                r1(wx.wd.to_degrees().rem_euclid(360.0)),
                wx.gust.map(|g| format!("{:.1}", r1(g))).unwrap_or_default(),
                r2(wx.dew_point),
            ).unwrap();
        }
    }
    out
}

/// `true` if every day in the list is hourly-specified (used to pick which exporter to call).
pub fn is_hourly_stream (days: &[Day]) -> bool {
    days.iter().all(|d| d.spec == DaySpecification::Hourly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyWx;
    use chrono::{TimeZone, Utc};

    #[test]
    fn export_daily_round_trips_through_precision () {
        let d = Day::new_daily(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), DailyWx{ min_temp: 10.123, max_temp: 28.456, ..Default::default() });
        let csv = export_daily_csv(&[d]);
        assert!(csv.contains("10.12"));
        assert!(csv.contains("28.46"));
    }
}
