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

//! `odin_wx` models a weather subsystem for a fire/hazard simulator: per-station weather
//! streams that reconstruct hourly detail from daily observations, a spatial grid that
//! combines streams by inverse-distance weighting, polygon and sectored-wind overrides, and
//! the Canadian Forest Fire Weather Index codes derived from all of it. [`pipeline`] is the
//! query driver a host simulator actually calls; everything else is the state it queries.

odin_build::define_load_config!();

pub mod cache;
pub mod config;
pub mod day;
pub mod diurnal;
pub mod errors;
pub mod export;
pub mod filter;
pub mod fwi;
pub mod grid;
pub mod grid_engine;
pub mod import;
pub mod pipeline;
pub mod sector;
pub mod solar;
pub mod station;
pub mod stream;
pub mod types;

pub use errors::{OdinWxError, Result};
