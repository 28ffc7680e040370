use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::staging::StagingMode;
use crate::vfs::SPECIAL_SCHEME;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,        // e.g., "info" | "debug"
    /// shared library to load
    pub library: Option<PathBuf>,
    /// exported symbols to bind, in order
    pub symbols: Option<Vec<String>>,
    /// bound symbols to call as `extern "C" fn() -> c_int`
    pub call: Option<Vec<String>>,
    pub staging: Option<StagingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StagingConfig {
    pub mode: Option<StagingMode>,
    pub cache_dir: Option<String>,                          // e.g. "special://altbinaddons/"
    pub special_paths: Option<BTreeMap<String, PathBuf>>,   // token name -> directory
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "dylib-binder", about = "Load a shared library and bind its exported symbols", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Shared library to load
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub library: Option<PathBuf>,
    /// Symbol to bind (repeatable, replaces the config list)
    #[arg(long = "symbol", value_name = "NAME")]
    pub symbols: Vec<String>,
    /// Bound symbol to call as `int fn(void)` (repeatable)
    #[arg(long = "call", value_name = "NAME")]
    pub call: Vec<String>,
    #[arg(long, value_enum)]
    pub staging: Option<StagingMode>,
    #[arg(long)]
    pub cache_dir: Option<String>,
    /// Map a special:// token onto a directory, NAME=DIR (repeatable)
    #[arg(long = "special-path", value_name = "NAME=DIR", value_parser = parse_special_path)]
    pub special_paths: Vec<(String, PathBuf)>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli` overrides, then validate.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/dylib-binder/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/dylib-binder/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/dylib-binder.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["dylib-binder.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()  { dst.log_level = src.log_level; }
    if src.library.is_some()    { dst.library = src.library; }
    if src.symbols.is_some()    { dst.symbols = src.symbols; }
    if src.call.is_some()       { dst.call = src.call; }
    // staging
    match (&mut dst.staging, src.staging) {
        (None, Some(s)) => dst.staging = Some(s),
        (Some(d), Some(s)) => merge_staging(d, s),
        _ => {}
    }
}

fn merge_staging(dst: &mut StagingConfig, src: StagingConfig) {
    if src.mode.is_some()       { dst.mode = src.mode; }
    if src.cache_dir.is_some()  { dst.cache_dir = src.cache_dir; }
    if let Some(paths) = src.special_paths {
        dst.special_paths.get_or_insert_with(BTreeMap::new).extend(paths);
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()  { cfg.log_level = cli.log_level.clone(); }
    if cli.library.is_some()    { cfg.library = cli.library.clone(); }
    if !cli.symbols.is_empty()  { cfg.symbols = Some(cli.symbols.clone()); }
    if !cli.call.is_empty()     { cfg.call = Some(cli.call.clone()); }

    let any_staging = cli.staging.is_some()
        || cli.cache_dir.is_some()
        || !cli.special_paths.is_empty();

    if any_staging && cfg.staging.is_none() {
        cfg.staging = Some(StagingConfig::default());
    }
    if let Some(staging) = cfg.staging.as_mut() {
        if cli.staging.is_some()    { staging.mode = cli.staging; }
        if cli.cache_dir.is_some()  { staging.cache_dir = cli.cache_dir.clone(); }
        if !cli.special_paths.is_empty() {
            staging.special_paths
                .get_or_insert_with(BTreeMap::new)
                .extend(cli.special_paths.iter().cloned());
        }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let symbols = cfg.symbols.as_deref().unwrap_or_default();
    for name in symbols {
        if name.is_empty() || name.contains('\0') {
            return Err(ConfigError::Validation(format!("invalid symbol name {:?}", name)));
        }
    }
    for name in cfg.call.as_deref().unwrap_or_default() {
        if !symbols.contains(name) {
            return Err(ConfigError::Validation(format!("call target {} is not in symbols", name)));
        }
    }
    if let Some(staging) = cfg.staging.as_ref() {
        if let Some(dir) = staging.cache_dir.as_ref() {
            if !dir.starts_with(SPECIAL_SCHEME) {
                return Err(ConfigError::Validation(format!(
                    "staging cache_dir must be a {} token, got {}",
                    SPECIAL_SCHEME, dir
                )));
            }
        }
    }
    Ok(())
}

fn parse_special_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, dir)) if !name.is_empty() && !dir.is_empty() => {
            Ok((name.to_string(), PathBuf::from(dir)))
        }
        _ => Err(format!("expected NAME=DIR, got {}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dylib-binder").chain(args.iter().copied())).unwrap()
    }

    fn yaml_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_yaml_then_cli_overrides() {
        let f = yaml_file(
            "log_level: debug\n\
             library: /addons/mylib.so\n\
             symbols: [Init, Cleanup]\n\
             staging:\n  mode: copy_if_stale\n  special_paths:\n    altbinaddons: /data/altbin\n",
        );
        let path = f.path().to_str().unwrap();
        let cfg = load_from(&cli(&["--config", path, "--library", "/other/lib.so", "--cache-dir", "special://altbinaddons/"])).unwrap();

        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.library, Some(PathBuf::from("/other/lib.so")));
        assert_eq!(cfg.symbols, Some(vec!["Init".to_string(), "Cleanup".to_string()]));

        let staging = cfg.staging.unwrap();
        assert_eq!(staging.mode, Some(StagingMode::CopyIfStale));
        assert_eq!(staging.cache_dir.as_deref(), Some("special://altbinaddons/"));
        assert_eq!(
            staging.special_paths.unwrap().get("altbinaddons"),
            Some(&PathBuf::from("/data/altbin"))
        );
    }

    #[test]
    fn test_cli_special_paths_extend_yaml() {
        let f = yaml_file("staging:\n  special_paths:\n    a: /a\n");
        let path = f.path().to_str().unwrap();
        let cfg = load_from(&cli(&["--config", path, "--special-path", "b=/b", "--staging", "direct"])).unwrap();

        let staging = cfg.staging.unwrap();
        assert_eq!(staging.mode, Some(StagingMode::Direct));
        assert_eq!(staging.special_paths.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_from(&cli(&["--config", "/nonexistent/dylib-binder.yaml"])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_call_must_be_bound() {
        let f = yaml_file("symbols: [Init]\n");
        let path = f.path().to_str().unwrap();
        assert!(load_from(&cli(&["--config", path, "--call", "Init"])).is_ok());
        assert!(load_from(&cli(&["--config", path, "--call", "Cleanup"])).is_err());
    }

    #[test]
    fn test_cache_dir_must_be_special() {
        let f = yaml_file("staging:\n  cache_dir: /tmp/cache\n");
        let path = f.path().to_str().unwrap();
        assert!(load_from(&cli(&["--config", path])).is_err());
    }

    #[test]
    fn test_special_path_parser() {
        assert_eq!(parse_special_path("altbinaddons=/data"), Ok(("altbinaddons".to_string(), PathBuf::from("/data"))));
        assert!(parse_special_path("nodir=").is_err());
        assert!(parse_special_path("plain").is_err());
    }
}
