//! Effective configuration for a CLI run: config file and environment
//! (via `flagwire_config`) with command-line overrides applied on top.

use std::path::PathBuf;

use flagwire_config::{CacheKind, Config};
use flagwire_core::ResolverConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file this run reads: `--config` / `FLAGWIRE_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(flagwire_config::config_path)
}

/// File + environment + flags, validated.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = flagwire_config::load_config_from(&config_file(global))?;

    if let Some(ref endpoint) = global.endpoint {
        cfg.endpoint = Some(endpoint.clone());
    }
    if let Some(ref cert) = global.cert {
        cfg.cert_path = Some(cert.clone());
    }
    if let Some(deadline_ms) = global.deadline_ms {
        cfg.deadline_ms = deadline_ms;
    }
    if global.no_cache {
        cfg.cache = CacheKind::Disabled;
    }

    cfg.validate()?;
    Ok(cfg)
}

pub fn build_resolver_config(global: &GlobalOpts) -> Result<ResolverConfig, CliError> {
    Ok(effective_config(global)?.to_resolver_config()?)
}
