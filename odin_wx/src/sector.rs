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

//! Sectored wind override: replaces wind speed or wind direction within an angular sector
//! of the *current* wind direction, keyed by the current wind speed, with an optional
//! default grid for angles no sector covers.

use chrono::{DateTime, Duration, Utc};

use crate::errors::{Result, op_failed};
use crate::types::SpecifiedBits;

const HISTORY_SHADOW_DAYS: i64 = 53;

/// Which variable a [`SectoredOverrideGrid`] overrides. Drives how bracketed entries are
/// blended along the wind-speed axis: wind direction uses the shorter-arc rule, wind speed
/// scales the cell value by the ratio of queried to keyed wind speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorKind { WindSpeed, WindDirection }

/// One wind-speed-keyed cell grid within a sector.
#[derive(Debug, Clone)]
pub struct SectorEntry {
    pub wind_speed: f64,
    pub xsize: usize,
    pub ysize: usize,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl SectorEntry {
    pub fn new (wind_speed: f64, xsize: usize, ysize: usize) -> Self {
        SectorEntry{ wind_speed, xsize, ysize, values: vec![0.0; xsize*ysize], valid: vec![false; xsize*ysize] }
    }

    pub fn set (&mut self, x: usize, y: usize, value: f64) {
        let i = y * self.xsize + x;
        self.values[i] = value;
        self.valid[i] = true;
    }

    pub fn get (&self, x: usize, y: usize) -> Option<f64> {
        let i = y * self.xsize + x;
        if self.valid[i] { Some(self.values[i]) } else { None }
    }
}

/// One angular sector, `[min_deg, max_deg)`, wrapping through 0 if `max_deg < min_deg`.
/// Holds a sorted-by-wind-speed list of [`SectorEntry`] cell grids.
#[derive(Debug, Clone)]
pub struct Sector {
    pub min_deg: f64,
    pub max_deg: f64,
    entries: Vec<SectorEntry>,
}

impl Sector {
    pub fn new (min_deg: f64, max_deg: f64) -> Self { Sector{ min_deg, max_deg, entries: Vec::new() } }

    pub fn width_deg (&self) -> f64 {
        if self.max_deg > self.min_deg { self.max_deg - self.min_deg } else { 360.0 - self.min_deg + self.max_deg }
    }

    pub fn contains_angle (&self, angle_deg: f64) -> bool {
        let a = angle_deg.rem_euclid(360.0);
        if self.max_deg < self.min_deg { a >= self.min_deg || a < self.max_deg } else { a >= self.min_deg && a < self.max_deg }
    }

    pub fn add_entry (&mut self, entry: SectorEntry) -> Result<()> {
        if self.entries.iter().any(|e| e.wind_speed == entry.wind_speed) {
            return Err(op_failed!("duplicate wind-speed key {} in sector", entry.wind_speed));
        }
        let pos = self.entries.partition_point(|e| e.wind_speed < entry.wind_speed);
        self.entries.insert(pos, entry);
        Ok(())
    }

    /// Value at `(x, y)` for a queried wind speed `ws`: exact match if one entry is keyed
    /// at `ws`, else linear interpolation between the bracketing pair. `kind` selects
    /// shorter-arc blending for direction or ratio scaling for speed. `None` if the sector
    /// has no entries, or fewer than two when `ws` falls outside the keyed range.
    pub fn query (&self, x: usize, y: usize, ws: f64, kind: SectorKind) -> Option<f64> {
        if self.entries.is_empty() { return None; }

        if let Some(e) = self.entries.iter().find(|e| (e.wind_speed - ws).abs() < 1e-9) {
            return e.get(x, y);
        }

        let upper_idx = self.entries.partition_point(|e| e.wind_speed < ws);
        let (lo, hi) = if upper_idx == 0 {
            (&self.entries[0], self.entries.get(1).unwrap_or(&self.entries[0]))
        } else if upper_idx >= self.entries.len() {
            let last = self.entries.len() - 1;
            (&self.entries[last.saturating_sub(1)], &self.entries[last])
        } else {
            (&self.entries[upper_idx-1], &self.entries[upper_idx])
        };

        let v0 = lo.get(x, y)?;
        let v1 = hi.get(x, y)?;
        if (hi.wind_speed - lo.wind_speed).abs() < 1e-9 { return Some(v0); }

        let fraction = ((ws - lo.wind_speed) / (hi.wind_speed - lo.wind_speed)).clamp(0.0, 1.0);
        match kind {
            SectorKind::WindDirection => {
                let mut delta = (v1 - v0).rem_euclid(360.0);
                if delta > 180.0 { delta -= 360.0; }
                Some((v0 + delta * fraction).rem_euclid(360.0))
            }
            SectorKind::WindSpeed => {
                if lo.wind_speed.abs() < 1e-9 { Some(v1 * (ws / hi.wind_speed.max(1e-9))) }
                else { Some(v0 * (ws / lo.wind_speed)) }
            }
        }
    }
}

/// A time-windowed wind override covering the whole grid: a set of non-overlapping
/// [`Sector`]s keyed by current wind direction, plus an optional direction-independent
/// default grid. Two independent flags select whether sector entries and/or the default
/// apply; when both apply, the sector result (if any) wins.
#[derive(Debug, Clone)]
pub struct SectoredOverrideGrid {
    pub kind: SectorKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub apply_sectors: bool,
    pub apply_default: bool,
    sectors: Vec<Sector>,
    default: Option<SectorEntry>,
}

impl SectoredOverrideGrid {
    pub fn new (kind: SectorKind, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        SectoredOverrideGrid{ kind, start_time, end_time, apply_sectors: true, apply_default: true, sectors: Vec::new(), default: None }
    }

    pub fn set_default (&mut self, entry: SectorEntry) { self.default = Some(entry); }

    /// Rejects overlapping sectors or a sector narrower than 1 degree.
    pub fn add_sector (&mut self, sector: Sector) -> Result<()> {
        if sector.width_deg() < 1.0 {
            return Err(op_failed!("sector width {:.3} deg is below the 1 degree minimum", sector.width_deg()));
        }
        for existing in &self.sectors {
            if sectors_overlap(existing, &sector) {
                return Err(op_failed!("sector [{}, {}) overlaps existing sector [{}, {})", sector.min_deg, sector.max_deg, existing.min_deg, existing.max_deg));
            }
        }
        self.sectors.push(sector);
        Ok(())
    }

    fn in_window (&self, t: DateTime<Utc>) -> bool { t >= self.start_time && t <= self.end_time }
    fn in_history_shadow (&self, t: DateTime<Utc>) -> bool {
        t > self.end_time && t <= self.end_time + Duration::days(HISTORY_SHADOW_DAYS)
    }

    /// Resolves the override value at cell `(x, y)` for the current wind direction/speed
    /// reading, returning the value and the `SpecifiedBits` to OR into the cell's bits.
    /// `None` if no sector or default grid produced a value (i.e. the reading passes
    /// through unchanged).
    pub fn resolve (&self, x: usize, y: usize, t: DateTime<Utc>, wd_deg: f64, ws: f64) -> (Option<f64>, SpecifiedBits) {
        if !self.in_window(t) {
            if self.in_history_shadow(t) {
                let bit = match self.kind {
                    SectorKind::WindSpeed => SpecifiedBits::OVERRODE_HISTORY_WINDSPEED,
                    SectorKind::WindDirection => SpecifiedBits::OVERRODE_HISTORY_WINDDIRECTION,
                };
                return (None, bit);
            }
            return (None, SpecifiedBits::NONE);
        }

        let override_bit = match self.kind {
            SectorKind::WindSpeed => SpecifiedBits::OVERRODE_WINDSPEED,
            SectorKind::WindDirection => SpecifiedBits::OVERRODE_WINDDIRECTION,
        };

        if self.apply_sectors {
            if let Some(sector) = self.sectors.iter().find(|s| s.contains_angle(wd_deg)) {
                if let Some(v) = sector.query(x, y, ws, self.kind) {
                    return (Some(v), override_bit);
                }
            }
        }

        if self.apply_default {
            if let Some(d) = &self.default {
                if let Some(v) = d.get(x, y) {
                    return (Some(v), override_bit);
                }
            }
        }

        (None, SpecifiedBits::NONE)
    }
}

fn sectors_overlap (a: &Sector, b: &Sector) -> bool {
    a.contains_angle(b.min_deg) || b.contains_angle(a.min_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window () -> (DateTime<Utc>, DateTime<Utc>) {
        (Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), Utc.with_ymd_and_hms(2024, 7, 1, 23, 59, 59).unwrap())
    }

    #[test]
    fn sector_half_open_interval_boundaries () {
        let s = Sector::new(270.0, 360.0);
        assert!(s.contains_angle(270.0));
        assert!(!s.contains_angle(360.0));
        assert!(!s.contains_angle(0.0));
    }

    #[test]
    fn wrap_through_zero_sector_contains_both_sides () {
        let s = Sector::new(350.0, 10.0);
        assert!(s.contains_angle(355.0));
        assert!(s.contains_angle(5.0));
        assert!(!s.contains_angle(180.0));
    }

    #[test]
    fn direction_interpolation_matches_shorter_arc_example () {
        let mut sector = Sector::new(270.0, 360.0);
        let mut e10 = SectorEntry::new(10.0, 1, 1);
        e10.set(0, 0, 270.0);
        let mut e30 = SectorEntry::new(30.0, 1, 1);
        e30.set(0, 0, 290.0);
        sector.add_entry(e10).unwrap();
        sector.add_entry(e30).unwrap();

        let v = sector.query(0, 0, 20.0, SectorKind::WindDirection).unwrap();
        assert!((v - 280.0).abs() < 1e-9);
    }

    #[test]
    fn exact_wind_speed_key_returns_its_own_value () {
        let mut sector = Sector::new(0.0, 90.0);
        let mut e = SectorEntry::new(15.0, 1, 1);
        e.set(0, 0, 42.0);
        sector.add_entry(e).unwrap();
        assert_eq!(sector.query(0, 0, 15.0, SectorKind::WindSpeed), Some(42.0));
    }

    #[test]
    fn rejects_overlapping_sectors () {
        let (start, end) = window();
        let mut grid = SectoredOverrideGrid::new(SectorKind::WindDirection, start, end);
        grid.add_sector(Sector::new(0.0, 90.0)).unwrap();
        assert!(grid.add_sector(Sector::new(45.0, 120.0)).is_err());
    }

    #[test]
    fn rejects_sub_degree_sector () {
        let (start, end) = window();
        let mut grid = SectoredOverrideGrid::new(SectorKind::WindDirection, start, end);
        assert!(grid.add_sector(Sector::new(0.0, 0.5)).is_err());
    }

    #[test]
    fn resolve_falls_back_to_default_outside_sectors () {
        let (start, end) = window();
        let mut grid = SectoredOverrideGrid::new(SectorKind::WindSpeed, start, end);
        let mut default = SectorEntry::new(0.0, 1, 1);
        default.set(0, 0, 7.0);
        grid.set_default(default);

        let (v, bits) = grid.resolve(0, 0, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(), 180.0, 7.0);
        assert_eq!(v, Some(7.0));
        assert!(bits.contains(SpecifiedBits::OVERRODE_WINDSPEED));
    }

    #[test]
    fn history_shadow_reports_bit_without_value () {
        let (start, end) = window();
        let grid = SectoredOverrideGrid::new(SectorKind::WindDirection, start, end);
        let (v, bits) = grid.resolve(0, 0, end + Duration::days(5), 10.0, 5.0);
        assert_eq!(v, None);
        assert!(bits.contains(SpecifiedBits::OVERRODE_HISTORY_WINDDIRECTION));
    }
}
