/*
 *  vfs/local.rs
 *
 *  dylib-binder - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Filesystem service over the local disk
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

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use dirs_next::data_dir;
use log::debug;

use super::{epoch_secs, split_special, FileStat, Filesystem};

/// Name of the executable-friendly addon directory token
pub const ALT_BIN_ADDONS: &str = "altbinaddons";

/// Local filesystem with a table of `special://` roots
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    special_paths: HashMap<String, PathBuf>,
}

impl LocalFs {
    /// Create with the built-in special roots
    ///
    /// `special://altbinaddons/` maps to `<data dir>/dylib-binder/addons`
    /// when the platform has a data directory. Android usually has none, so
    /// callers there map `altbinaddons` themselves with
    /// [`with_special_path`](Self::with_special_path).
    pub fn new() -> Self {
        let mut fs = Self::default();
        if let Some(data) = data_dir() {
            fs.special_paths.insert(ALT_BIN_ADDONS.to_string(), data.join("dylib-binder/addons"));
        }
        fs
    }

    /// Map `special://<name>/` onto `root`, replacing any previous mapping
    pub fn with_special_path<P: Into<PathBuf>>(mut self, name: &str, root: P) -> Self {
        self.special_paths.insert(name.to_string(), root.into());
        self
    }

    pub fn special_paths(&self) -> &HashMap<String, PathBuf> {
        &self.special_paths
    }
}

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn stat(&self, path: &Path) -> Option<FileStat> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().ok()?;
        Some(FileStat::new(meta.len(), epoch_secs(modified)))
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = fs::copy(src, dst)?;
        debug!("Copied {} bytes from {} to {}", bytes, src.display(), dst.display());
        Ok(())
    }

    fn translate_special_path(&self, token: &str) -> Option<PathBuf> {
        let (name, rest) = split_special(token)?;
        let root = self.special_paths.get(name)?;
        if rest.is_empty() {
            Some(root.clone())
        } else {
            Some(root.join(rest))
        }
    }
}
