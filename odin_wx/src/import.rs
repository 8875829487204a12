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

//! Tabular stream import/export: synonym-tolerant, case-insensitive CSV headers for the
//! daily and hourly row shapes. Range validation and warnings are collected into a report
//! rather than failing the whole import.

use std::collections::HashMap;
use chrono::{DateTime, Utc, NaiveDate, NaiveDateTime, TimeZone};
use csv::ReaderBuilder;
use tracing::warn;

use crate::errors::{Result, OdinWxError, invalid_data};

/// Accumulates non-fatal warnings produced while importing, so the caller can inspect them
/// without the reader having to abort the whole import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub warnings: Vec<String>,
}

impl ImportReport {
    fn warn_at (&mut self, line: usize, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(line, "{msg}");
        self.warnings.push(format!("line {line}: {msg}"));
    }
}

/// Mutually-constrained import mode. `purge` is exclusive with `append`/`overwrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOptions {
    pub purge: bool,
    pub append: bool,
    pub overwrite: bool,
}

impl ImportOptions {
    pub fn validate (&self) -> Result<()> {
        if self.purge && (self.append || self.overwrite) {
            return Err(OdinWxError::OpFailedError("PURGE is exclusive with APPEND/OVERWRITE".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub rh: f64,       // fraction 0..1
    pub wd: f64,       // radians
    pub min_ws: f64,
    pub max_ws: f64,
    pub min_gust: Option<f64>,
    pub max_gust: Option<f64>,
    pub precip: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HourlyRow {
    pub date: NaiveDate,
    pub hour: u32,
    pub temp: f64,
    pub rh: f64,
    pub precip: f64,
    pub ws: f64,
    pub wd: f64,
    pub gust: Option<f64>,
    pub dew_point: Option<f64>,
    pub ffmc: Option<f64>,
    pub hffmc: Option<f64>,
    pub dmc: Option<f64>,
    pub dc: Option<f64>,
    pub bui: Option<f64>,
    pub isi: Option<f64>,
    pub fwi: Option<f64>,
}

fn header_index (headers: &csv::StringRecord, synonyms: &[&str]) -> Option<usize> {
    headers.iter().position(|h| synonyms.iter().any(|s| h.eq_ignore_ascii_case(s)))
}

fn parse_f64 (rec: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| rec.get(i)).and_then(|s| s.trim().parse::<f64>().ok())
}

fn parse_date (s: &str) -> Option<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s.trim(), fmt) { return Some(d); }
    }
    None
}

/// `true` if the header row looks like an hourly table (has a recognizable hour column).
pub fn is_hourly_header (headers: &csv::StringRecord) -> bool {
    header_index(headers, &["hour", "time(cst)", "time"]).is_some()
}

fn clamp_range (report: &mut ImportReport, line: usize, name: &str, v: f64, lo: f64, hi: f64) -> f64 {
    if v > hi {
        if name == "wind speed" || name == "gust" {
            // >200 km/h is logged as information only, not clamped - real extreme winds happen.
            report.warn_at(line, format!("{name} {v} exceeds {hi} (kept, informational)"));
            v
        } else {
            report.warn_at(line, format!("{name} {v} exceeds {hi}, clamped"));
            hi
        }
    } else if v < lo {
        report.warn_at(line, format!("{name} {v} below {lo}, clamped"));
        lo
    } else {
        v
    }
}

/// Parses a daily-format CSV buffer. The delimiter is auto-detected from the header line
/// among comma, tab, and semicolon.
pub fn parse_daily_csv (data: &str) -> Result<(Vec<DailyRow>, ImportReport)> {
    let delim = detect_delimiter(data);
    let mut rdr = ReaderBuilder::new().delimiter(delim).flexible(true).from_reader(data.as_bytes());
    let headers = rdr.headers()?.clone();

    let date_i = header_index(&headers, &["date", "name", "stationid"]);
    let mintemp_i = header_index(&headers, &["min_temp", "mintemp"]);
    let maxtemp_i = header_index(&headers, &["max_temp", "maxtemp"]);
    let rh_i = header_index(&headers, &["rh", "min_rh", "relative_humidity"]);
    let wd_i = header_index(&headers, &["wd", "dir", "wind_direction"]);
    let minws_i = header_index(&headers, &["min_ws", "minws"]);
    let maxws_i = header_index(&headers, &["max_ws", "maxws"]);
    let mingust_i = header_index(&headers, &["min_gust"]);
    let maxgust_i = header_index(&headers, &["max_gust"]);
    let precip_i = header_index(&headers, &["precip", "rain", "precipitation", "raintot"]);

    let recognized = [date_i, mintemp_i, maxtemp_i, rh_i, wd_i, minws_i, maxws_i, precip_i]
        .iter().filter(|i| i.is_some()).count();
    if recognized == 0 {
        return Err(OdinWxError::BadFileType(format!(
            "header row {:?} has no recognizable daily weather columns", headers.iter().collect::<Vec<_>>()
        )));
    }
    let date_i = date_i.ok_or_else(|| invalid_data(1, "no date/Name/StationID column found"))?;

    let mut rows = Vec::new();
    let mut report = ImportReport::default();
    let mut prev_date: Option<NaiveDate> = None;

    for (i, rec) in rdr.records().enumerate() {
        let line = i + 2;
        let rec = rec?;
        let date_s = rec.get(date_i).unwrap_or("");
        let Some(date) = parse_date(date_s) else {
            return Err(invalid_data(line, format!("unparseable date '{date_s}'")));
        };
        if let Some(pd) = prev_date {
            if date != pd.succ_opt().unwrap_or(pd) {
                return Err(invalid_data(line, "daily rows must be strictly sequential by 1 day"));
            }
        }
        prev_date = Some(date);

        let mut min_temp = parse_f64(&rec, mintemp_i).unwrap_or(0.0);
        let mut max_temp = parse_f64(&rec, maxtemp_i).unwrap_or(0.0);
        if min_temp > max_temp { report.warn_at(line, "min_temp > max_temp, swapped"); std::mem::swap(&mut min_temp, &mut max_temp); }
        min_temp = clamp_range(&mut report, line, "temperature", min_temp, -50.0, 60.0);
        max_temp = clamp_range(&mut report, line, "temperature", max_temp, -50.0, 60.0);

        let rh_pct = parse_f64(&rec, rh_i).unwrap_or(0.0);
        let rh_pct = clamp_range(&mut report, line, "RH", rh_pct, 0.0, 100.0);

        let wd_deg = parse_f64(&rec, wd_i).unwrap_or(0.0).rem_euclid(360.0);

        let mut min_ws = parse_f64(&rec, minws_i).unwrap_or(0.0);
        let mut max_ws = parse_f64(&rec, maxws_i).unwrap_or(0.0);
        if min_ws > max_ws { report.warn_at(line, "min_ws > max_ws, swapped"); std::mem::swap(&mut min_ws, &mut max_ws); }
        min_ws = clamp_range(&mut report, line, "wind speed", min_ws, 0.0, 200.0);
        max_ws = clamp_range(&mut report, line, "wind speed", max_ws, 0.0, 200.0);

        let min_gust = parse_f64(&rec, mingust_i);
        let max_gust = parse_f64(&rec, maxgust_i);

        let precip = clamp_range(&mut report, line, "precip", parse_f64(&rec, precip_i).unwrap_or(0.0), 0.0, 300.0);

        rows.push(DailyRow {
            date, min_temp, max_temp, rh: rh_pct / 100.0, wd: wd_deg.to_radians(),
            min_ws, max_ws, min_gust, max_gust, precip,
        });
    }

    Ok((rows, report))
}

/// Parses an hourly-format CSV buffer. See [`parse_daily_csv`] for delimiter/report behaviour.
pub fn parse_hourly_csv (data: &str) -> Result<(Vec<HourlyRow>, ImportReport)> {
    let delim = detect_delimiter(data);
    let mut rdr = ReaderBuilder::new().delimiter(delim).flexible(true).from_reader(data.as_bytes());
    let headers = rdr.headers()?.clone();

    let date_opt = header_index(&headers, &["date", "name", "stationid"]);
    let hour_opt = header_index(&headers, &["hour", "time(cst)", "time"]);
    let temp_i = header_index(&headers, &["temp", "temperature"]);
    let rh_i = header_index(&headers, &["rh", "relative_humidity"]);
    let precip_i = header_index(&headers, &["precip", "rain", "precipitation"]);
    let ws_i = header_index(&headers, &["ws", "wind_speed"]);
    let wd_i = header_index(&headers, &["wd", "dir", "wind_direction"]);
    let gust_i = header_index(&headers, &["gust"]);
    let recognized = [date_opt, hour_opt, temp_i, rh_i, precip_i, ws_i, wd_i].iter().filter(|i| i.is_some()).count();
    if recognized == 0 {
        return Err(OdinWxError::BadFileType(format!(
            "header row {:?} has no recognizable hourly weather columns", headers.iter().collect::<Vec<_>>()
        )));
    }
    let date_i = date_opt.ok_or_else(|| invalid_data(1, "no date column"))?;
    let hour_i = hour_opt.ok_or_else(|| invalid_data(1, "no hour column"))?;
    let dew_i = header_index(&headers, &["dew_point", "dewpoint"]);
    let ffmc_i = header_index(&headers, &["ffmc", "hffmc"]);
    let dmc_i = header_index(&headers, &["dmc"]);
    let dc_i = header_index(&headers, &["dc"]);
    let bui_i = header_index(&headers, &["bui"]);
    let isi_i = header_index(&headers, &["isi"]);
    let fwi_i = header_index(&headers, &["fwi"]);

    let mut rows = Vec::new();
    let mut report = ImportReport::default();
    let mut prev: Option<NaiveDateTime> = None;

    for (i, rec) in rdr.records().enumerate() {
        let line = i + 2;
        let rec = rec?;
        let date_s = rec.get(date_i).unwrap_or("");
        let Some(date) = parse_date(date_s) else {
            return Err(invalid_data(line, format!("unparseable date '{date_s}'")));
        };
        let hour: u32 = rec.get(hour_i).unwrap_or("0").trim().parse().map_err(|_| invalid_data(line, "unparseable hour"))?;
        if hour >= 24 { return Err(invalid_data(line, format!("hour {hour} out of range"))); }
        let dt = date.and_hms_opt(hour, 0, 0).ok_or_else(|| invalid_data(line, "invalid hour"))?;
        if let Some(p) = prev {
            if dt != p + chrono::Duration::hours(1) {
                return Err(invalid_data(line, "hourly rows must be strictly sequential by 1 hour"));
            }
        }
        prev = Some(dt);

        let temp = clamp_range(&mut report, line, "temperature", parse_f64(&rec, temp_i).unwrap_or(0.0), -50.0, 60.0);
        let rh_pct = clamp_range(&mut report, line, "RH", parse_f64(&rec, rh_i).unwrap_or(0.0), 0.0, 100.0);
        let precip = clamp_range(&mut report, line, "precip", parse_f64(&rec, precip_i).unwrap_or(0.0), 0.0, 300.0);
        let ws = clamp_range(&mut report, line, "wind speed", parse_f64(&rec, ws_i).unwrap_or(0.0), 0.0, 200.0);
        let wd_deg = parse_f64(&rec, wd_i).unwrap_or(0.0).rem_euclid(360.0);
        let gust = parse_f64(&rec, gust_i).map(|g| clamp_range(&mut report, line, "gust", g, 0.0, 200.0));

        rows.push(HourlyRow {
            date, hour, temp, rh: rh_pct / 100.0, precip, ws, wd: wd_deg.to_radians(), gust,
            dew_point: parse_f64(&rec, dew_i),
            ffmc: parse_f64(&rec, ffmc_i), hffmc: None,
            dmc: parse_f64(&rec, dmc_i), dc: parse_f64(&rec, dc_i),
            bui: parse_f64(&rec, bui_i), isi: parse_f64(&rec, isi_i), fwi: parse_f64(&rec, fwi_i),
        });
    }

    Ok((rows, report))
}

fn detect_delimiter (data: &str) -> u8 {
    let first_line = data.lines().next().unwrap_or("");
    if first_line.contains('\t') { b'\t' }
    else if !first_line.contains(',') && first_line.contains(';') { b';' }
    else { b',' }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_csv_with_synonym_headers () {
        let data = "date,min_temp,max_temp,relative_humidity,wind_direction,min_ws,max_ws,precip\n\
                    2024-07-01,10,28,30,180,2,15,0\n\
                    2024-07-02,11,27,35,190,3,16,1.5\n";
        let (rows, report) = parse_daily_csv(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].rh - 0.30).abs() < 1e-9);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn swaps_inverted_min_max_with_warning () {
        let data = "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n2024-07-01,28,10,30,0,2,15,0\n";
        let (rows, report) = parse_daily_csv(data).unwrap();
        assert_eq!(rows[0].min_temp, 10.0);
        assert_eq!(rows[0].max_temp, 28.0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn rejects_non_sequential_daily_rows () {
        let data = "date,min_temp,max_temp,rh,wd,min_ws,max_ws,precip\n2024-07-01,10,28,30,0,2,15,0\n2024-07-05,10,28,30,0,2,15,0\n";
        assert!(parse_daily_csv(data).is_err());
    }

    #[test]
    fn parses_hourly_csv_with_fwi_overrides () {
        let data = "date,hour,temp,rh,precip,ws,wd,ffmc\n2024-07-01,0,20,40,0,5,90,85.5\n";
        let (rows, _) = parse_hourly_csv(data).unwrap();
        assert_eq!(rows[0].ffmc, Some(85.5));
    }

    #[test]
    fn unrecognized_header_is_bad_file_type () {
        let data = "foo,bar,baz\n1,2,3\n";
        let err = parse_daily_csv(data).unwrap_err();
        assert!(matches!(err, OdinWxError::BadFileType(_)));
        let err = parse_hourly_csv(data).unwrap_err();
        assert!(matches!(err, OdinWxError::BadFileType(_)));
    }

    #[test]
    fn import_options_reject_purge_with_append () {
        let opts = ImportOptions{ purge: true, append: true, overwrite: false };
        assert!(opts.validate().is_err());
    }
}
