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
use serde::{Serialize,Deserialize};

/// FFMC hourly recursion method. Mutually exclusive per stream.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum FfmcMethod {
    VanWagner,
    LawsonContiguous,
}

impl Default for FfmcMethod {
    fn default()->Self { FfmcMethod::VanWagner }
}

/// Shape coefficients for the Beck-Trevitt diurnal curve of one variable (temperature or wind).
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct DiurnalCoeffs {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for DiurnalCoeffs {
    fn default()->Self { DiurnalCoeffs{ alpha: 0.0, beta: 0.0, gamma: 1.0 } }
}

/// Starting FWI codes a stream equilibrates from when no prior day exists.
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct InitialCodes {
    pub ffmc: f64,
    pub dmc: f64,
    pub dc: f64,
    pub bui: f64,
    pub rain: f64,
    pub hffmc: Option<f64>,
    pub hffmc_hour: f64, // seconds since LST midnight
}

impl Default for InitialCodes {
    fn default()->Self {
        InitialCodes{ ffmc: 85.0, dmc: 6.0, dc: 15.0, bui: -1.0, rain: 0.0, hffmc: None, hffmc_hour: 0.0 }
    }
}

/// RON-loadable tunables for IDW exponents, diurnal shapes, FWI starting conditions and
/// the sectored-override application flags. Mirrors the attribute table of the weather
/// subsystem's external interface.
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct WxConfig {
    pub idw_exponent_temp: f64,
    pub idw_exponent_ws: f64,
    pub idw_exponent_precip: f64,
    pub idw_exponent_fwi: f64,

    pub ffmc_method: FfmcMethod,
    pub fwi_use_specified: bool,

    pub temp_coeffs: DiurnalCoeffs,
    pub wind_coeffs: DiurnalCoeffs,

    pub initial: InitialCodes,

    pub equilibrium_days: i64,

    pub grid_apply_file_sectors: bool,
    pub grid_apply_file_default: bool,

    pub cache_max_entries: usize,
    pub cache_max_entries_alternate: usize,
}

impl WxConfig {
    /// Loads a named `WxConfig` the way every other crate in the host workspace loads its
    /// per-crate config: filesystem lookup first, falling back to the resources embedded
    /// at build time when `embedded_resources` is enabled (or always, if
    /// `ODIN_EMBEDDED_ONLY` is set).
    pub fn load (filename: &str) -> crate::errors::Result<Self> {
        Ok(crate::load_config(filename)?)
    }
}

impl Default for WxConfig {
    fn default()->Self {
        WxConfig {
            idw_exponent_temp: 2.0,
            idw_exponent_ws: 2.0,
            idw_exponent_precip: 2.0,
            idw_exponent_fwi: 2.0,
            ffmc_method: FfmcMethod::default(),
            fwi_use_specified: false,
            temp_coeffs: DiurnalCoeffs::default(),
            wind_coeffs: DiurnalCoeffs::default(),
            initial: InitialCodes::default(),
            equilibrium_days: 53,
            grid_apply_file_sectors: true,
            grid_apply_file_default: true,
            cache_max_entries: 7500,
            cache_max_entries_alternate: 50,
        }
    }
}
