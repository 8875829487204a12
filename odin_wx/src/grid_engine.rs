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

//! Stand-ins for the two external collaborators a host simulator normally supplies: a
//! DEM-backed grid engine (dimensions, resolution, elevation) and a CRS converter. The
//! traits are the real extension point; the implementations here only exist so the
//! weather pipeline is exercisable standalone.

use odin_common::angle::{Latitude, Longitude};

/// Supplies grid geometry and elevation lookups. A host simulator normally backs this
/// with a raster DEM; that integration is out of scope here.
pub trait GridEngine: Send + Sync {
    fn dimensions (&self) -> (usize, usize);
    fn resolution_m (&self) -> f64;
    fn lower_left (&self) -> (f64, f64);
    fn elevation_at (&self, x: f64, y: f64) -> Option<f64>;
    fn spatial_reference (&self) -> &str;

    /// Raster cell `(col, row)` containing grid-projected point `(x, y)`, or `None` if it
    /// falls outside `dimensions()`. Used by the query cache, which is keyed by cell, not
    /// by continuous coordinate.
    fn cell_index (&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (ox, oy) = self.lower_left();
        let res = self.resolution_m();
        let (xs, ys) = self.dimensions();
        let ix = (x - ox) / res;
        let iy = (y - oy) / res;
        if ix < 0.0 || iy < 0.0 { return None; }
        let (ix, iy) = (ix.floor() as usize, iy.floor() as usize);
        if ix >= xs || iy >= ys { return None; }
        Some((ix, iy))
    }
}

/// Trivial grid engine returning a fixed elevation everywhere, for tests and standalone
/// use when no DEM is available.
#[derive(Debug, Clone, Copy)]
pub struct ConstantElevationGrid {
    pub xsize: usize,
    pub ysize: usize,
    pub resolution_m: f64,
    pub lower_left: (f64, f64),
    pub elevation_m: f64,
}

impl ConstantElevationGrid {
    pub fn new (xsize: usize, ysize: usize, resolution_m: f64, lower_left: (f64, f64), elevation_m: f64) -> Self {
        ConstantElevationGrid{ xsize, ysize, resolution_m, lower_left, elevation_m }
    }
}

impl GridEngine for ConstantElevationGrid {
    fn dimensions (&self) -> (usize, usize) { (self.xsize, self.ysize) }
    fn resolution_m (&self) -> f64 { self.resolution_m }
    fn lower_left (&self) -> (f64, f64) { self.lower_left }
    fn elevation_at (&self, x: f64, y: f64) -> Option<f64> {
        if x < 0.0 || y < 0.0 || x >= self.xsize as f64 || y >= self.ysize as f64 { return None; }
        Some(self.elevation_m)
    }
    fn spatial_reference (&self) -> &str { "local-constant-elevation" }
}

/// Converts between geographic (lat/lon) and grid-projected (x, y) coordinates. CRS math
/// beyond a flat-earth approximation is out of scope; a host wanting a real projection
/// provides its own implementation.
pub trait CrsConverter: Send + Sync {
    fn geo_to_grid (&self, lat: Latitude, lon: Longitude) -> (f64, f64);
    fn grid_to_geo (&self, x: f64, y: f64) -> (Latitude, Longitude);
}

/// Equirectangular (flat-earth) projection about a fixed origin, scaled to the grid's
/// resolution. Adequate for the small-area scenarios this crate targets; not a substitute
/// for a real CRS library over large extents.
#[derive(Debug, Clone, Copy)]
pub struct FlatEarthCrs {
    pub origin_lat_deg: f64,
    pub origin_lon_deg: f64,
    pub resolution_m: f64,
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl FlatEarthCrs {
    pub fn new (origin_lat_deg: f64, origin_lon_deg: f64, resolution_m: f64) -> Self {
        FlatEarthCrs{ origin_lat_deg, origin_lon_deg, resolution_m }
    }
}

impl CrsConverter for FlatEarthCrs {
    fn geo_to_grid (&self, lat: Latitude, lon: Longitude) -> (f64, f64) {
        let lat_rad = self.origin_lat_deg.to_radians();
        let dy_m = (lat.degrees() - self.origin_lat_deg).to_radians() * EARTH_RADIUS_M;
        let dx_m = (lon.degrees() - self.origin_lon_deg).to_radians() * EARTH_RADIUS_M * lat_rad.cos();
        (dx_m / self.resolution_m, dy_m / self.resolution_m)
    }

    fn grid_to_geo (&self, x: f64, y: f64) -> (Latitude, Longitude) {
        let lat_rad = self.origin_lat_deg.to_radians();
        let dlat_deg = (y * self.resolution_m / EARTH_RADIUS_M).to_degrees();
        let dlon_deg = (x * self.resolution_m / (EARTH_RADIUS_M * lat_rad.cos())).to_degrees();
        (Latitude::from_degrees(self.origin_lat_deg + dlat_deg), Longitude::from_degrees(self.origin_lon_deg + dlon_deg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_elevation_grid_returns_fixed_value_inside_bounds () {
        let g = ConstantElevationGrid::new(10, 10, 30.0, (0.0, 0.0), 1200.0);
        assert_eq!(g.elevation_at(5.0, 5.0), Some(1200.0));
        assert_eq!(g.elevation_at(-1.0, 0.0), None);
    }

    #[test]
    fn flat_earth_crs_round_trips_through_grid_coordinates () {
        let crs = FlatEarthCrs::new(45.0, -110.0, 30.0);
        let (x, y) = crs.geo_to_grid(Latitude::from_degrees(45.01), Longitude::from_degrees(-109.99));
        let (lat, lon) = crs.grid_to_geo(x, y);
        assert!((lat.degrees() - 45.01).abs() < 1e-6);
        assert!((lon.degrees() - (-109.99)).abs() < 1e-6);
    }

    #[test]
    fn flat_earth_crs_origin_maps_to_zero () {
        let crs = FlatEarthCrs::new(45.0, -110.0, 30.0);
        let (x, y) = crs.geo_to_grid(Latitude::from_degrees(45.0), Longitude::from_degrees(-110.0));
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
    }
}
