/*
 * Copyright (c) 2024, United States Government, as represented by the
 * Administrator of the National Aeronautics and Space Administration.
 * All rights reserved.
 *
 * The ODIN - Open Data Integration Framework is licensed under the
 * Apache License, Version 2.0 (the "License"); you may not use this file
 * except in compliance with the License. You may obtain a copy of the
 * License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! `odin_build` is a library crate for common build.rs functions used within ODIN.
//! This is factored out here to avoid redundant code in build scripts, namely for
//! generating embedded `config_data` and `asset_data` sources for crates that opt into the
//! `embedded_resources` feature, and for locating those resources on the filesystem otherwise.

// this is a hack to avoid the warning output from Cargo. Hopefully Cargo will some day support build script messages directly

#[macro_export]
macro_rules! info {
    ($($tokens: tt)*) => {
        println!("cargo:warning=\r\x1b[32;1m  \x1b[37m info: {}\x1b[0m", format!($($tokens)*))
    }
}

#[macro_export]
macro_rules! warn {
    ($($tokens: tt)*) => {
        println!("cargo:warning=\r\x1b[32;1m  \x1b[93m warn: {}\x1b[0m", format!($($tokens)*))
    }
}

#[macro_export]
macro_rules! error {
    ($($tokens: tt)*) => {
        println!("cargo:warning=\r\x1b[32;1m  \x1b[91m error: {}\x1b[0m", format!($($tokens)*))
    }
}

pub mod errors;
pub mod utils;
pub mod manifest;
pub mod bin_context;
pub mod configs;
pub mod assets;

pub use errors::{OdinBuildError, Result};
pub use utils::*;
pub use manifest::{OdinManifest, Resource, OdinMetaData, load_manifest, get_metadata};
pub use bin_context::{BinContext, BinContextCell, BIN_CONTEXT, get_env_bin_context, is_relevant_resource, find_resource_file, init_build};
pub use configs::{CONFIGS, EmbeddedConfigEntry, find_config_file, create_config_data};
pub use assets::{ASSETS, EmbeddedAssetEntry, find_asset_file, process_asset, get_content_spec, ContentSpec, create_asset_data};