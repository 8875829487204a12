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

//! A weather station: a spatial anchor that owns a set of weather streams.

use std::sync::{Arc, RwLock};
use odin_common::angle::{Latitude, Longitude};
use crate::stream::WeatherStream;

/// Sea-level reference pressure, kPa.
pub const P0_KPA: f64 = 101.325;
/// Sea-level reference temperature, K.
pub const T0_K: f64 = 288.15;
/// Standard temperature lapse rate, K/m.
pub const L0: f64 = 0.00649;
/// Universal gas constant, J/(mol*K).
pub const R_GAS: f64 = 8.3144598;
/// Molar mass of dry air, kg/mol.
pub const M_AIR: f64 = 0.0289644;
/// Standard gravity, m/s^2.
pub const G: f64 = 9.80665;

/// `P_e = P0 * (T0 / (T0 + L0*h))^((g*M)/(R*L0))`, h in metres.
pub fn atmospheric_pressure_kpa (elevation_m: f64) -> f64 {
    let exponent = (G * M_AIR) / (R_GAS * L0);
    P0_KPA * (T0_K / (T0_K + L0 * elevation_m)).powf(exponent)
}

/// One station's location, expressed either geographically or in grid-projected coordinates.
/// Projection between the two is lazy and delegated to a `CrsConverter` at the call site;
/// this struct only stores whichever form was last set plus the cached counterpart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationLocation {
    pub lat: Latitude,
    pub lon: Longitude,
    pub grid_x: f64,
    pub grid_y: f64,
}

#[derive(Debug)]
pub struct WeatherStation {
    pub name: String,
    pub location: RwLock<StationLocation>,
    elevation_m: RwLock<Option<f64>>,
    pressure_kpa: RwLock<f64>,
    streams: RwLock<Vec<Arc<WeatherStream>>>,
}

impl WeatherStation {
    pub fn new (name: impl Into<String>, location: StationLocation) -> Arc<Self> {
        Arc::new(WeatherStation {
            name: name.into(),
            location: RwLock::new(location),
            elevation_m: RwLock::new(None),
            pressure_kpa: RwLock::new(atmospheric_pressure_kpa(0.0)),
            streams: RwLock::new(Vec::new()),
        })
    }

    /// Elevation defaults to 0m (so lapse-rate correction never blows up) but callers can
    /// distinguish "unset" from "explicitly zero" via [`Self::elevation_is_set`].
    pub fn elevation_m (&self) -> f64 { self.elevation_m.read().unwrap().unwrap_or(0.0) }
    pub fn elevation_is_set (&self) -> bool { self.elevation_m.read().unwrap().is_some() }
    pub fn pressure_kpa (&self) -> f64 { *self.pressure_kpa.read().unwrap() }

    pub fn set_elevation (&self, elevation_m: f64) {
        *self.elevation_m.write().unwrap() = Some(elevation_m);
        *self.pressure_kpa.write().unwrap() = atmospheric_pressure_kpa(elevation_m);
    }

    pub fn location (&self) -> StationLocation { *self.location.read().unwrap() }

    /// Moving a station invalidates every owned stream's cached derived state, since the
    /// IDW geometry and (possibly) the lapse-rate correction change.
    pub fn set_location (&self, location: StationLocation) {
        *self.location.write().unwrap() = location;
        for s in self.streams.read().unwrap().iter() {
            s.invalidate();
        }
    }

    pub fn add_stream (self: &Arc<Self>, stream: Arc<WeatherStream>) {
        stream.bind_station(Arc::downgrade(self));
        self.streams.write().unwrap().push(stream);
    }

    pub fn remove_stream (&self, stream: &Arc<WeatherStream>) {
        self.streams.write().unwrap().retain(|s| !Arc::ptr_eq(s, stream));
    }

    pub fn streams (&self) -> Vec<Arc<WeatherStream>> { self.streams.read().unwrap().clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_at_sea_level_is_reference_pressure () {
        assert!((atmospheric_pressure_kpa(0.0) - P0_KPA).abs() < 1e-9);
    }

    #[test]
    fn pressure_decreases_with_elevation () {
        assert!(atmospheric_pressure_kpa(2000.0) < atmospheric_pressure_kpa(0.0));
    }

    #[test]
    fn moving_station_invalidates_owned_streams () {
        let loc = StationLocation{ lat: Latitude::from_degrees(45.0), lon: Longitude::from_degrees(-110.0), grid_x: 0.0, grid_y: 0.0 };
        let station = WeatherStation::new("A", loc);
        let stream = WeatherStream::new(chrono::Utc::now(), Default::default());
        station.add_stream(stream.clone());
        stream.get_instantaneous(chrono::Utc::now(), Default::default()).ok();
        station.set_location(StationLocation{ grid_x: 10.0, ..loc });
        assert!(stream.is_stale());
    }
}
