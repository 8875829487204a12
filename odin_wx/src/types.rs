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

//! Core data model: hourly/daily weather records, FWI code pairs, and the bit-flag words
//! that track which fields were specified, overridden, or affected by a past override.

use std::ops::{BitOr, BitOrAssign, BitAnd};
use serde::{Serialize, Deserialize};

macro_rules! define_flags {
    ($name:ident, $( $flag:ident = $bit:expr ),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: $name = $name(0);
            $( pub const $flag: $name = $name($bit); )+

            #[inline] pub fn contains (self, other: $name) -> bool { (self.0 & other.0) == other.0 }
            #[inline] pub fn any (self) -> bool { self.0 != 0 }
            #[inline] pub fn set (&mut self, other: $name) { self.0 |= other.0; }
            #[inline] pub fn clear (&mut self, other: $name) { self.0 &= !other.0; }
        }

        impl BitOr for $name {
            type Output = $name;
            fn bitor (self, rhs: $name) -> $name { $name(self.0 | rhs.0) }
        }
        impl BitOrAssign for $name {
            fn bitor_assign (&mut self, rhs: $name) { self.0 |= rhs.0; }
        }
        impl BitAnd for $name {
            type Output = $name;
            fn bitand (self, rhs: $name) -> $name { $name(self.0 & rhs.0) }
        }
    };
}

define_flags!( SpecifiedBits,
    SPECIFIED_TEMPERATURE = 1<<0,
    SPECIFIED_DEWPOINTTEMPERATURE = 1<<1,
    SPECIFIED_RH = 1<<2,
    SPECIFIED_PRECIPITATION = 1<<3,
    SPECIFIED_WINDSPEED = 1<<4,
    SPECIFIED_WINDDIRECTION = 1<<5,
    SPECIFIED_WINDGUST = 1<<6,

    OVERRODE_TEMPERATURE = 1<<8,
    OVERRODE_DEWPOINTTEMPERATURE = 1<<9,
    OVERRODE_RH = 1<<10,
    OVERRODE_PRECIPITATION = 1<<11,
    OVERRODE_WINDSPEED = 1<<12,
    OVERRODE_WINDDIRECTION = 1<<13,

    OVERRODE_HISTORY_TEMPERATURE = 1<<16,
    OVERRODE_HISTORY_RH = 1<<17,
    OVERRODE_HISTORY_PRECIPITATION = 1<<18,
    OVERRODE_HISTORY_WINDSPEED = 1<<19,
    OVERRODE_HISTORY_WINDDIRECTION = 1<<20,
);

define_flags!( InterpolationFlags,
    INTERPOLATE_SPATIAL = 1<<0,
    INTERPOLATE_PRECIP = 1<<1,
    INTERPOLATE_WIND = 1<<2,
    INTERPOLATE_WIND_VECTOR = 1<<3,
    INTERPOLATE_TEMP_RH = 1<<4,
    INTERPOLATE_CALCFWI = 1<<5,
    INTERPOLATE_HISTORY = 1<<6,
    INTERPOLATE_TEMPORAL = 1<<7,
    QUERY_PRIMARY_WX_STREAM = 1<<8,
    QUERY_ANY_WX_STREAM = 1<<9,
    ALTERNATE_CACHE = 1<<10,
    IGNORE_CACHE = 1<<11,
);

/// One hour's weather observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyWx {
    pub temp: f64,          // °C
    pub dew_point: f64,     // °C
    pub rh: f64,            // fraction 0..1
    pub precip: f64,        // mm
    pub ws: f64,            // km/h
    pub gust: Option<f64>,  // km/h
    pub wd: f64,            // radians, cartesian convention
    pub bits: SpecifiedBits,
}

impl Default for HourlyWx {
    fn default () -> Self {
        HourlyWx{ temp: 20.0, dew_point: 10.0, rh: 0.5, precip: 0.0, ws: 0.0, gust: None, wd: 0.0, bits: SpecifiedBits::NONE }
    }
}

/// One day's summary (min/max extremes, totals, means).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWx {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_ws: f64,
    pub max_ws: f64,
    pub min_gust: Option<f64>,
    pub max_gust: Option<f64>,
    pub rh: f64,     // mean, fraction 0..1
    pub precip: f64, // total mm
    pub wd: f64,     // mean direction, radians
}

impl Default for DailyWx {
    fn default () -> Self {
        DailyWx{ min_temp: 10.0, max_temp: 20.0, min_ws: 0.0, max_ws: 10.0, min_gust: None, max_gust: None, rh: 0.5, precip: 0.0, wd: 0.0 }
    }
}

/// A specified/calculated pair for one FWI-related scalar. `-1.0` means "unset" for most
/// codes; BUI additionally recognizes `-99.0` to mean "explicitly cleared".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodeValue {
    pub specified: f64,
    pub calculated: f64,
}

impl Default for CodeValue {
    fn default () -> Self { CodeValue{ specified: Self::UNSET, calculated: 0.0 } }
}

impl CodeValue {
    pub const UNSET: f64 = -1.0;
    pub const CLEARED: f64 = -99.0;

    pub fn new (calculated: f64) -> Self { CodeValue{ specified: Self::UNSET, calculated } }
    pub fn is_specified (&self) -> bool { self.specified >= 0.0 }
    pub fn value (&self, honour_specified: bool) -> f64 {
        if honour_specified && self.is_specified() { self.specified } else { self.calculated }
    }
}

/// Daily FWI code set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyFwi {
    pub ffmc: CodeValue,
    pub dmc: CodeValue,
    pub dc: CodeValue,
    pub bui: CodeValue,
    pub isi: CodeValue,
    pub fwi: CodeValue,
}

impl Default for DailyFwi {
    fn default () -> Self {
        DailyFwi {
            ffmc: CodeValue::new(85.0), dmc: CodeValue::new(6.0), dc: CodeValue::new(15.0),
            bui: CodeValue::new(0.0), isi: CodeValue::new(0.0), fwi: CodeValue::new(0.0),
        }
    }
}

/// Hourly FWI code set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct HourlyFwi {
    pub ffmc: CodeValue,
    pub isi: CodeValue,
    pub fwi: CodeValue,
}

impl HourlyFwi {
    pub fn new (ffmc: f64) -> Self {
        HourlyFwi{ ffmc: CodeValue::new(ffmc), isi: CodeValue::new(0.0), fwi: CodeValue::new(0.0) }
    }
}

/// Result bundle returned by a resolved weather query: instantaneous weather, instantaneous
/// FWI, and the day's FWI the instant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WxQueryResult {
    pub wx: HourlyWx,
    pub ifwi: HourlyFwi,
    pub dfwi: DailyFwi,
}
