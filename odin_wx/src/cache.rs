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

//! Three-level query cache: a lock-free map of named layers, each holding two independent
//! (regular/alternate) 2-D grids of bounded-LRU cell caches, each cell split into four
//! time-alignment buckets so a repeated "what's the weather at noon" query never evicts a
//! sub-hourly one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Duration, Timelike, Utc};
use dashmap::DashMap;

use crate::types::WxQueryResult;

const DAY_BUCKET_SLOTS: usize = 4;
const NOON_BUCKET_SLOTS: usize = 4;
const HOUR_BUCKET_SLOTS: usize = 28;
const SUBHOUR_BUCKET_SLOTS: usize = 8;
const PURGE_LOOKBEHIND: Duration = Duration::hours(2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue {
    pub time: DateTime<Utc>,
    pub result: WxQueryResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketKind { Day, Noon, Hour, SubHour }

fn lst_seconds_of_day (t: DateTime<Utc>, utc_offset_hours: f64) -> f64 {
    let local = t + Duration::seconds((utc_offset_hours * 3600.0) as i64);
    local.hour() as f64 * 3600.0 + local.minute() as f64 * 60.0 + local.second() as f64
}

fn classify (t: DateTime<Utc>, utc_offset_hours: f64) -> BucketKind {
    let sec = lst_seconds_of_day(t, utc_offset_hours);
    if sec.abs() < 1.0 { BucketKind::Day }
    else if (sec - 12.0 * 3600.0).abs() < 1.0 { BucketKind::Noon }
    else if t.minute() == 0 && t.second() == 0 { BucketKind::Hour }
    else { BucketKind::SubHour }
}

/// A fixed-capacity, move-to-front LRU of `(flag_key, value)` pairs.
#[derive(Debug)]
struct ValueBucket {
    capacity: usize,
    entries: Vec<(u32, CachedValue)>,
}

impl ValueBucket {
    fn new (capacity: usize) -> Self { ValueBucket{ capacity, entries: Vec::with_capacity(capacity) } }

    fn get (&mut self, flags_key: u32) -> Option<CachedValue> {
        let pos = self.entries.iter().position(|(k, _)| *k == flags_key)?;
        let entry = self.entries.remove(pos);
        let value = entry.1;
        self.entries.insert(0, entry);
        Some(value)
    }

    fn store (&mut self, flags_key: u32, value: CachedValue) {
        self.entries.retain(|(k, _)| *k != flags_key);
        self.entries.insert(0, (flags_key, value));
        if self.entries.len() > self.capacity { self.entries.pop(); }
    }

    fn max_time (&self) -> Option<DateTime<Utc>> { self.entries.iter().map(|(_, v)| v.time).max() }

    fn is_empty (&self) -> bool { self.entries.is_empty() }
}

/// The leaf of the cache: one cell's four time-alignment buckets.
#[derive(Debug)]
struct CellCache {
    day: ValueBucket,
    noon: ValueBucket,
    hour: ValueBucket,
    subhour: ValueBucket,
}

impl CellCache {
    fn new () -> Self {
        CellCache {
            day: ValueBucket::new(DAY_BUCKET_SLOTS),
            noon: ValueBucket::new(NOON_BUCKET_SLOTS),
            hour: ValueBucket::new(HOUR_BUCKET_SLOTS),
            subhour: ValueBucket::new(SUBHOUR_BUCKET_SLOTS),
        }
    }

    fn bucket_mut (&mut self, kind: BucketKind) -> &mut ValueBucket {
        match kind {
            BucketKind::Day => &mut self.day,
            BucketKind::Noon => &mut self.noon,
            BucketKind::Hour => &mut self.hour,
            BucketKind::SubHour => &mut self.subhour,
        }
    }

    fn get (&mut self, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32) -> Option<CachedValue> {
        let kind = classify(t, utc_offset_hours);
        self.bucket_mut(kind).get(flags_key)
    }

    fn store (&mut self, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32, value: CachedValue) {
        let kind = classify(t, utc_offset_hours);
        self.bucket_mut(kind).store(flags_key, value);
    }

    fn newest_entry (&self) -> Option<DateTime<Utc>> {
        [self.day.max_time(), self.noon.max_time(), self.hour.max_time(), self.subhour.max_time()]
            .into_iter().flatten().max()
    }

    fn is_empty (&self) -> bool {
        self.day.is_empty() && self.noon.is_empty() && self.hour.is_empty() && self.subhour.is_empty()
    }
}

/// One 2-D grid of cell caches with bounded-LRU eviction by creation order.
pub struct WeatherLayerCache {
    xsize: usize,
    ysize: usize,
    cells: Vec<Option<CellCache>>,
    creation_order: VecDeque<usize>,
    max_entries: usize,
}

impl WeatherLayerCache {
    pub fn new (xsize: usize, ysize: usize, max_entries: usize) -> Self {
        WeatherLayerCache {
            xsize, ysize,
            cells: (0..xsize*ysize).map(|_| None).collect(),
            creation_order: VecDeque::new(),
            max_entries,
        }
    }

    fn idx (&self, x: usize, y: usize) -> usize { y * self.xsize + x }

    fn cell_mut (&mut self, x: usize, y: usize) -> &mut CellCache {
        let idx = self.idx(x, y);
        if self.cells[idx].is_none() {
            if self.creation_order.len() >= self.max_entries {
                if let Some(evicted) = self.creation_order.pop_front() {
                    self.cells[evicted] = None;
                }
            }
            self.cells[idx] = Some(CellCache::new());
            self.creation_order.push_back(idx);
        }
        self.cells[idx].as_mut().unwrap()
    }

    pub fn get (&mut self, x: usize, y: usize, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32) -> Option<CachedValue> {
        let idx = self.idx(x, y);
        self.cells[idx].as_mut()?.get(t, utc_offset_hours, flags_key)
    }

    pub fn store (&mut self, x: usize, y: usize, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32, value: CachedValue) {
        self.cell_mut(x, y).store(t, utc_offset_hours, flags_key, value);
    }

    /// Drops any cell whose newest entry across all buckets predates `t - 2h`.
    pub fn purge (&mut self, t: DateTime<Utc>) {
        let cutoff = t - PURGE_LOOKBEHIND;
        for idx in 0..self.cells.len() {
            let drop = match &self.cells[idx] {
                Some(cell) => cell.is_empty() || cell.newest_entry().map_or(true, |newest| newest < cutoff),
                None => false,
            };
            if drop { self.cells[idx] = None; }
        }
        self.creation_order.retain(|idx| self.cells[*idx].is_some());
    }

    pub fn clear (&mut self) {
        for c in self.cells.iter_mut() { *c = None; }
        self.creation_order.clear();
    }
}

struct LayerEntry {
    refcount: AtomicUsize,
    regular: Mutex<WeatherLayerCache>,
    alternate: Mutex<WeatherLayerCache>,
}

impl LayerEntry {
    fn new (xsize: usize, ysize: usize, max_entries: usize, max_entries_alternate: usize) -> Self {
        LayerEntry {
            refcount: AtomicUsize::new(0),
            regular: Mutex::new(WeatherLayerCache::new(xsize, ysize, max_entries)),
            alternate: Mutex::new(WeatherLayerCache::new(xsize, ysize, max_entries_alternate)),
        }
    }

    fn cache (&self, alternate: bool) -> &Mutex<WeatherLayerCache> {
        if alternate { &self.alternate } else { &self.regular }
    }
}

/// Top-level cache: a lock-free `layer name -> LayerEntry` map. Each layer holds a regular
/// and an alternate sub-cache, selected per query by the `ALTERNATE_CACHE` flag, so a
/// simulator running an alternative-history branch never invalidates the main timeline.
pub struct WeatherCache {
    layers: DashMap<String, Arc<LayerEntry>>,
    xsize: usize,
    ysize: usize,
    max_entries: usize,
    max_entries_alternate: usize,
}

impl WeatherCache {
    pub fn new (xsize: usize, ysize: usize, max_entries: usize, max_entries_alternate: usize) -> Self {
        WeatherCache{ layers: DashMap::new(), xsize, ysize, max_entries, max_entries_alternate }
    }

    fn layer (&self, name: &str) -> Arc<LayerEntry> {
        self.layers.entry(name.to_string())
            .or_insert_with(|| Arc::new(LayerEntry::new(self.xsize, self.ysize, self.max_entries, self.max_entries_alternate)))
            .clone()
    }

    /// Registers interest in a layer, creating it on first use. Must be paired with
    /// [`Self::release_layer`] once the caller is done, so an unreferenced layer's memory
    /// is reclaimed.
    pub fn acquire_layer (&self, name: &str) -> Arc<LayerEntry> {
        let entry = self.layer(name);
        entry.refcount.fetch_add(1, Ordering::SeqCst);
        entry
    }

    pub fn release_layer (&self, name: &str) {
        if let Some(entry) = self.layers.get(name) {
            if entry.refcount.fetch_sub(1, Ordering::SeqCst) == 1 {
                drop(entry);
                self.layers.remove(name);
            }
        }
    }

    pub fn get (&self, name: &str, alternate: bool, x: usize, y: usize, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32) -> Option<CachedValue> {
        let entry = self.layers.get(name)?;
        entry.cache(alternate).lock().unwrap().get(x, y, t, utc_offset_hours, flags_key)
    }

    pub fn store (&self, name: &str, alternate: bool, x: usize, y: usize, t: DateTime<Utc>, utc_offset_hours: f64, flags_key: u32, value: CachedValue) {
        let entry = self.layer(name);
        entry.cache(alternate).lock().unwrap().store(x, y, t, utc_offset_hours, flags_key, value);
    }

    pub fn purge (&self, name: &str, alternate: bool, t: DateTime<Utc>) {
        if let Some(entry) = self.layers.get(name) {
            entry.cache(alternate).lock().unwrap().purge(t);
        }
    }

    pub fn clear (&self, name: &str, alternate: bool) {
        if let Some(entry) = self.layers.get(name) {
            entry.cache(alternate).lock().unwrap().clear();
        }
    }

    pub fn layer_count (&self) -> usize { self.layers.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::types::{DailyFwi, HourlyFwi, HourlyWx};

    fn sample_value (t: DateTime<Utc>) -> CachedValue {
        CachedValue{ time: t, result: WxQueryResult{ wx: HourlyWx::default(), ifwi: HourlyFwi::default(), dfwi: DailyFwi::default() } }
    }

    #[test]
    fn classifies_midnight_noon_hour_and_subhour () {
        let midnight = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let hour = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        let subhour = Utc.with_ymd_and_hms(2024, 7, 1, 14, 30, 0).unwrap();
        assert_eq!(classify(midnight, 0.0), BucketKind::Day);
        assert_eq!(classify(noon, 0.0), BucketKind::Noon);
        assert_eq!(classify(hour, 0.0), BucketKind::Hour);
        assert_eq!(classify(subhour, 0.0), BucketKind::SubHour);
    }

    #[test]
    fn store_then_get_round_trips () {
        let mut layer = WeatherLayerCache::new(10, 10, 100);
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        layer.store(3, 4, t, 0.0, 0, sample_value(t));
        assert!(layer.get(3, 4, t, 0.0, 0).is_some());
        assert!(layer.get(3, 4, t, 0.0, 1).is_none());
    }

    #[test]
    fn lru_eviction_caps_cell_count () {
        let mut layer = WeatherLayerCache::new(10, 10, 2);
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        layer.store(0, 0, t, 0.0, 0, sample_value(t));
        layer.store(1, 0, t, 0.0, 0, sample_value(t));
        layer.store(2, 0, t, 0.0, 0, sample_value(t));
        assert!(layer.get(0, 0, t, 0.0, 0).is_none());
        assert!(layer.get(2, 0, t, 0.0, 0).is_some());
    }

    #[test]
    fn hour_bucket_lru_evicts_oldest_flag_variant () {
        let mut layer = WeatherLayerCache::new(10, 10, 100);
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        for k in 0..(HOUR_BUCKET_SLOTS as u32 + 1) {
            layer.store(0, 0, t, 0.0, k, sample_value(t));
        }
        assert!(layer.get(0, 0, t, 0.0, 0).is_none());
        assert!(layer.get(0, 0, t, 0.0, HOUR_BUCKET_SLOTS as u32).is_some());
    }

    #[test]
    fn purge_drops_stale_cells_only () {
        let mut layer = WeatherLayerCache::new(10, 10, 100);
        let old = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let fresh = Utc.with_ymd_and_hms(2024, 7, 10, 0, 0, 0).unwrap();
        layer.store(0, 0, old, 0.0, 0, sample_value(old));
        layer.store(1, 0, fresh, 0.0, 0, sample_value(fresh));
        layer.purge(fresh);
        assert!(layer.get(0, 0, old, 0.0, 0).is_none());
        assert!(layer.get(1, 0, fresh, 0.0, 0).is_some());
    }

    #[test]
    fn acquire_and_release_reclaims_unreferenced_layer () {
        let cache = WeatherCache::new(10, 10, 100, 10);
        cache.acquire_layer("fire-a");
        assert_eq!(cache.layer_count(), 1);
        cache.release_layer("fire-a");
        assert_eq!(cache.layer_count(), 0);
    }

    #[test]
    fn regular_and_alternate_caches_are_independent () {
        let cache = WeatherCache::new(10, 10, 100, 10);
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        cache.store("fire-a", false, 0, 0, t, 0.0, 0, sample_value(t));
        assert!(cache.get("fire-a", false, 0, 0, t, 0.0, 0).is_some());
        assert!(cache.get("fire-a", true, 0, 0, t, 0.0, 0).is_none());
    }
}
