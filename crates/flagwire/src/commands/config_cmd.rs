//! Config subcommand handlers.

use std::path::Path;

use flagwire_config::{CacheKind, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output::{self, DetailRow};

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::effective_config(global)?;
            // Plain output is the TOML a user could save as their config file
            let out = match global.output {
                OutputFormat::Plain => cfg.to_toml()?,
                ref format => {
                    output::render_single(format, &cfg, detail_rows, |_| String::new())?
                }
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let path = config::config_file(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}

fn detail_rows(cfg: &Config) -> Vec<DetailRow> {
    let optional =
        |p: Option<&Path>| p.map_or_else(|| "-".into(), |p| p.display().to_string());
    vec![
        DetailRow {
            field: "Endpoint",
            value: cfg.endpoint_uri(),
        },
        DetailRow {
            field: "CA certificate",
            value: optional(cfg.cert_path.as_deref()),
        },
        DetailRow {
            field: "Deadline",
            value: format!("{}ms", cfg.deadline_ms),
        },
        DetailRow {
            field: "Cache",
            value: match cfg.cache {
                CacheKind::Lru => format!("lru ({} entries)", cfg.max_cache_size),
                CacheKind::Disabled => "disabled".into(),
            },
        },
        DetailRow {
            field: "Stream retries",
            value: cfg.max_event_stream_retries.to_string(),
        },
        DetailRow {
            field: "Retry backoff",
            value: format!("{}ms", cfg.retry_backoff_ms),
        },
        DetailRow {
            field: "Provider name",
            value: cfg.provider_name.clone(),
        },
    ]
}
