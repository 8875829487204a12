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
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinWxError>;

#[derive(Error,Debug)]
pub enum OdinWxError {

    #[error("config error {0}")]
    ConfigError( #[from] odin_build::OdinBuildError),

    #[error("wx IO error: {0}")]
    IOError( #[from] std::io::Error),

    #[error("csv error: {0}")]
    CsvError( #[from] csv::Error),

    #[error("ron error: {0}")]
    RonError( #[from] ron::error::SpannedError),

    #[error("grid not initialized")]
    GridUninitialized,

    #[error("simulation running, write denied")]
    SimulationRunning,

    #[error("weather stream already added")]
    WeatherStreamAlreadyAdded,

    #[error("weather station already present in grid")]
    WeatherStationAlreadyPresent,

    #[error("weather stations too close together: {0} m apart")]
    WeatherStationsTooClose(f64),

    #[error("weather data does not cover requested date range")]
    WeatherInvalidDates,

    #[error("import would prepend data before existing stream start")]
    AttemptPrepend,

    #[error("import overlaps existing data and OVERWRITE was not requested")]
    AttemptOverwrite,

    #[error("bad file type: {0}")]
    BadFileType(String),

    #[error("invalid data at line {line}: {msg}")]
    InvalidData{ line: usize, msg: String },

    #[error("query location out of grid range")]
    GridLocationOutOfRange,

    #[error("operation failed: {0}")]
    OpFailedError(String),
}

pub fn op_failed (msg: impl ToString)->OdinWxError { OdinWxError::OpFailedError(msg.to_string()) }

#[macro_export]
macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => { $crate::errors::op_failed( format!( $fmt $(, $arg)* )) };
}

pub fn invalid_data (line: usize, msg: impl ToString)->OdinWxError {
    OdinWxError::InvalidData{ line, msg: msg.to_string() }
}
