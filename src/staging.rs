/*
 *  staging.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Staging policies - copy libraries to a loadable directory first
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Library staging
//!
//! Some platforms (Android) only allow `dlopen` from an executable-mapped
//! directory, so addon libraries have to be copied there before loading.
//! A [`StagingPolicy`] turns the requested path into the path actually
//! handed to the native loader:
//!
//! - [`DirectLoad`] - path unchanged
//! - [`CopyIfStale`] - copy into the addon cache directory unless an
//!   up-to-date copy is already there
//!
//! ## Cache rule
//!
//! The copy is skipped only when the cached file exists, has the same size
//! as the source, and its mtime is not earlier than the source mtime.

use std::path::{Path, PathBuf};
use chrono::DateTime;
use clap::ValueEnum;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::config::StagingConfig;
use crate::error::BinderError;
use crate::vfs::{FileStat, Filesystem, LocalFs};

/// Cache directory token used when none is configured
pub const DEFAULT_CACHE_DIR: &str = "special://altbinaddons/";

/// Strategy applied to a library path before it is opened
pub trait StagingPolicy: Send {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Return the path the native loader should open
    fn stage(&self, path: &Path) -> Result<PathBuf, BinderError>;
}

/// Staging strategy selection, from config or the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum StagingMode {
    /// Open libraries where they are
    Direct,

    /// Copy into the addon cache directory when stale
    CopyIfStale,
}

impl StagingMode {
    /// Android needs copy-if-stale, everything else loads directly
    pub fn platform_default() -> Self {
        if cfg!(target_os = "android") {
            StagingMode::CopyIfStale
        } else {
            StagingMode::Direct
        }
    }
}

/// No staging
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectLoad;

impl StagingPolicy for DirectLoad {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn stage(&self, path: &Path) -> Result<PathBuf, BinderError> {
        Ok(path.to_path_buf())
    }
}

/// Copy into a special cache directory unless the cached copy is current
#[derive(Debug, Clone)]
pub struct CopyIfStale<F: Filesystem> {
    fs: F,
    cache_dir: String,
}

impl<F: Filesystem> CopyIfStale<F> {
    /// `cache_dir` is a `special://` token resolved through `fs` on each stage
    pub fn new(fs: F, cache_dir: impl Into<String>) -> Self {
        Self { fs, cache_dir: cache_dir.into() }
    }

    pub fn cache_dir(&self) -> &str {
        &self.cache_dir
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Real directory behind the cache token, if it can be translated
    pub fn cache_root(&self) -> Option<PathBuf> {
        self.fs.translate_special_path(&self.cache_dir)
    }
}

impl<F: Filesystem> StagingPolicy for CopyIfStale<F> {
    fn name(&self) -> &'static str {
        "copy_if_stale"
    }

    fn stage(&self, path: &Path) -> Result<PathBuf, BinderError> {
        if !self.fs.exists(path) {
            error!("Library '{}' does not exist", path.display());
            return Err(BinderError::load_failed(path, "file does not exist"));
        }

        let cache_root = self.cache_root().ok_or_else(|| {
            error!("Unable to translate cache directory '{}'", self.cache_dir);
            BinderError::load_failed(path, format!("cannot translate {}", self.cache_dir))
        })?;

        // already inside the loadable directory
        if path.starts_with(&cache_root) {
            return Ok(path.to_path_buf());
        }

        let file_name = self.fs.file_name_of(path)
            .ok_or_else(|| BinderError::load_failed(path, "path has no file name"))?;
        let dst = cache_root.join(file_name);

        let src_stat = self.fs.stat(path);
        let dst_stat = self.fs.stat(&dst);

        if needs_copy(src_stat, dst_stat) {
            debug!("Caching '{}' to '{}'", path.display(), dst.display());
            if let Err(e) = self.fs.copy(path, &dst) {
                error!("Failed to cache '{}' to '{}': {}", path.display(), dst.display(), e);
                return Err(BinderError::load_failed(path, format!("failed to cache to {}: {}", dst.display(), e)));
            }
        } else if let (Some(src), Some(cached)) = (src_stat, dst_stat) {
            debug!(
                "Using cached '{}' ({} bytes, modified {} / source {})",
                dst.display(),
                cached.size,
                format_mtime(cached.modified),
                format_mtime(src.modified)
            );
        }

        Ok(dst)
    }
}

/// Decide whether the cached copy must be refreshed
///
/// A missing stat on either side forces a copy.
pub fn needs_copy(src: Option<FileStat>, dst: Option<FileStat>) -> bool {
    match (src, dst) {
        (Some(src), Some(dst)) => !(dst.size == src.size && dst.modified >= src.modified),
        _ => true,
    }
}

/// Build the policy described by `cfg`, or the platform default
pub fn policy_from_config(cfg: Option<&StagingConfig>) -> Box<dyn StagingPolicy> {
    let mode = cfg
        .and_then(|c| c.mode)
        .unwrap_or_else(StagingMode::platform_default);

    match mode {
        StagingMode::Direct => Box::new(DirectLoad),
        StagingMode::CopyIfStale => {
            let mut fs = LocalFs::new();
            let mut cache_dir = DEFAULT_CACHE_DIR.to_string();
            if let Some(cfg) = cfg {
                if let Some(paths) = cfg.special_paths.as_ref() {
                    for (name, root) in paths {
                        fs = fs.with_special_path(name, root.clone());
                    }
                }
                if let Some(dir) = cfg.cache_dir.as_ref() {
                    cache_dir = dir.clone();
                }
            }
            let policy = CopyIfStale::new(fs, cache_dir);
            if policy.cache_root().is_none() {
                warn!(
                    "Cache directory '{}' has no root, configure staging.special_paths; every load will fail",
                    policy.cache_dir()
                );
            }
            Box::new(policy)
        }
    }
}

fn format_mtime(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
