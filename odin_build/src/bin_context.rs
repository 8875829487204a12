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

//! Identifies which binary (if any) is driving a resource lookup, so a multi-binary crate
//! can restrict an `odin_configs`/`odin_assets` manifest entry to a subset of its `[[bin]]`
//! targets via `Resource::bins`. `bob` (the build wrapper in `src/bin/bob.rs`) sets
//! `ODIN_BIN_CRATE`/`ODIN_BIN_NAME` before invoking `cargo build`; both build scripts and the
//! running binary recover the same context from those two env vars.

use std::{env, path::{Path, PathBuf}, sync::OnceLock};
use crate::manifest::Resource;
use crate::utils::get_or_create_root_dir;

#[derive(Debug, Clone)]
pub struct BinContext {
    pub bin_crate: String,
    pub bin_name: String,
}

pub fn get_env_bin_context () -> Option<BinContext> {
    let bin_crate = env::var("ODIN_BIN_CRATE").ok()?;
    let bin_name = env::var("ODIN_BIN_NAME").ok()?;
    Some(BinContext{ bin_crate, bin_name })
}

/// an empty `bins` list means the resource applies to every binary of its crate (or to the
/// crate itself, if it has none).
pub fn is_relevant_resource (resource: &Resource, bin_ctx: &Option<BinContext>) -> bool {
    if resource.bins.is_empty() { return true }
    match bin_ctx {
        Some(ctx) => resource.bins.iter().any( |b| b == &ctx.bin_name),
        None => false,
    }
}

/// locates a resource file of the given `kind` (`"configs"` or `"assets"`) for
/// `resource_crate`: crate-local development layout (`<crate>/<kind>/<filename>`) first,
/// then the installed `$ODIN_ROOT/<kind>/<resource_crate>/<filename>` layout.
pub fn find_resource_file (kind: &str, _ctx: &Option<&BinContext>, resource_crate: &str, filename: &str) -> Option<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        let p = Path::new(&manifest_dir).join(kind).join(filename);
        if p.is_file() { return Some(p) }
    }
    if let Ok(root) = get_or_create_root_dir() {
        let p = root.join(kind).join(resource_crate).join(filename);
        if p.is_file() { return Some(p) }
    }
    None
}

/// process-wide, lazily-resolved bin context for runtime resource lookups.
pub struct BinContextCell(OnceLock<Option<BinContext>>);

impl BinContextCell {
    pub const fn new () -> Self { BinContextCell(OnceLock::new()) }

    pub fn get (&self) -> Option<&BinContext> {
        self.0.get_or_init(get_env_bin_context).as_ref()
    }
}

pub static BIN_CONTEXT: BinContextCell = BinContextCell::new();

/// called at the top of a crate's `build.rs` before generating config/asset data, so that
/// cargo re-runs the build script when the embedding decision or the resource trees change.
pub fn init_build () {
    println!("cargo:rerun-if-env-changed=ODIN_EMBED_RESOURCES");
    println!("cargo:rerun-if-changed=configs");
    println!("cargo:rerun-if-changed=assets");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_with_no_bins_is_always_relevant () {
        let r = Resource{ file: "x.ron".into(), dir: None, encrypt: false, compress: true, bins: vec![] };
        assert!(is_relevant_resource(&r, &None));
        assert!(is_relevant_resource(&r, &Some(BinContext{ bin_crate: "c".into(), bin_name: "b".into() })));
    }

    #[test]
    fn resource_scoped_to_bin_requires_matching_context () {
        let r = Resource{ file: "x.ron".into(), dir: None, encrypt: false, compress: true, bins: vec!["server".into()] };
        assert!(!is_relevant_resource(&r, &None));
        assert!(!is_relevant_resource(&r, &Some(BinContext{ bin_crate: "c".into(), bin_name: "client".into() })));
        assert!(is_relevant_resource(&r, &Some(BinContext{ bin_crate: "c".into(), bin_name: "server".into() })));
    }
}
