/*
 *  main.rs
 *
 *  dylib-binder - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Load a library, bind the configured symbols, call entry points
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use anyhow::{bail, Context};
use env_logger::Env;
use log::{error, info};

use dylib_binder::config;
use dylib_binder::staging::policy_from_config;
use dylib_binder::{DynamicLibraryBinder, LibraryProbe, SystemLoader};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("Failed to load configuration")?;

    let level = cfg.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("dylib-binder v{} ({}, built {})", env!("CARGO_PKG_VERSION"), BUILD_TARGET, BUILD_DATE);

    let Some(library) = cfg.library.as_ref() else {
        bail!("No library given, use --library or set `library` in the config file");
    };

    let staging = policy_from_config(cfg.staging.as_ref());
    info!("Staging policy: {}", staging.name());

    let binder = DynamicLibraryBinder::with_loader(SystemLoader::new()).with_staging(staging);
    let mut probe = LibraryProbe::new(binder);

    let symbols = cfg.symbols.clone().unwrap_or_default();

    // call targets are validated against `symbols`, the user vouches for `int fn(void)`
    let bound = unsafe { probe.start(library, symbols.as_slice()) }
        .with_context(|| format!("Failed to start {}", library.display()))?;

    if let Some(opened) = probe.binder().library_path() {
        println!("loaded  {}", opened.display());
    }
    for name in probe.bound() {
        println!("bound   {}", name);
    }

    for name in cfg.call.as_deref().unwrap_or_default() {
        match probe.call(name) {
            Ok(rc) => println!("called  {}() = {}", name, rc),
            Err(e) => {
                error!("{}", e);
                return Err(e.into());
            }
        }
    }

    info!("{} symbol(s) bound from {}", bound, library.display());
    Ok(())
}
