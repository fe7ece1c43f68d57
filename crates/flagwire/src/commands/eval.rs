//! `flagwire eval`: one-shot resolution of a single flag.

use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::mpsc;

use flagwire_core::{
    EvaluationContext, FlagKind, FlagValue, ProviderError, Reason, ResolutionDetails, Resolver,
    ResolverConfig, Value,
};

use crate::cli::{EvalArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, DetailRow};

/// What gets printed. `error_*` is only present when `--default` stood in
/// for a failed resolution.
#[derive(Debug, Serialize)]
struct EvalOutput {
    flag_key: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    details: ResolutionDetails<FlagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

pub async fn handle(
    config: ResolverConfig,
    args: &EvalArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = FlagKind::from(args.r#type);
    let context = build_context(args)?;
    // Parse up front so a bad default fails before any network traffic
    let default = args
        .default
        .as_deref()
        .map(|raw| parse_default(kind, raw))
        .transpose()?;

    let endpoint = config.endpoint.uri.clone();
    // The event stream is never started for a one-shot lookup
    let (events, _event_rx) = mpsc::unbounded_channel();
    let resolver = Resolver::connect(config, events)?;

    let out = match resolve_any(&resolver, kind, &args.flag, &context).await {
        Ok(details) => EvalOutput {
            flag_key: args.flag.clone(),
            kind: kind.to_string(),
            details,
            error_code: None,
            error_message: None,
        },
        Err(err) => {
            let Some(value) = default else {
                return Err(CliError::from_provider(err, &args.flag, &endpoint));
            };
            tracing::warn!(flag = %args.flag, error = %err, "Resolution failed, using default");
            EvalOutput {
                flag_key: args.flag.clone(),
                kind: kind.to_string(),
                details: ResolutionDetails {
                    value,
                    variant: None,
                    reason: Reason::Error,
                    flag_metadata: IndexMap::new(),
                },
                error_code: Some(err.code().to_string()),
                error_message: Some(err.into_message()),
            }
        }
    };

    let rendered = output::render_single(&global.output, &out, detail_rows, |o| {
        value_text(&o.details.value)
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

async fn resolve_any(
    resolver: &Resolver,
    kind: FlagKind,
    flag: &str,
    context: &EvaluationContext,
) -> Result<ResolutionDetails<FlagValue>, ProviderError> {
    Ok(match kind {
        FlagKind::Boolean => widen(resolver.resolve_boolean(flag, context).await?, FlagValue::Bool),
        FlagKind::String => widen(resolver.resolve_string(flag, context).await?, FlagValue::String),
        FlagKind::Integer => widen(resolver.resolve_integer(flag, context).await?, FlagValue::Int),
        FlagKind::Float => widen(resolver.resolve_float(flag, context).await?, FlagValue::Float),
        FlagKind::Object => widen(
            resolver.resolve_structure(flag, context).await?,
            FlagValue::Structure,
        ),
    })
}

fn widen<T>(
    details: ResolutionDetails<T>,
    f: impl FnOnce(T) -> FlagValue,
) -> ResolutionDetails<FlagValue> {
    ResolutionDetails {
        value: f(details.value),
        variant: details.variant,
        reason: details.reason,
        flag_metadata: details.flag_metadata,
    }
}

// ── Context ──────────────────────────────────────────────────────────

fn build_context(args: &EvalArgs) -> Result<EvaluationContext, CliError> {
    let mut context = EvaluationContext::new();

    if let Some(ref raw) = args.context_json {
        let json: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| invalid("context-json", e.to_string()))?;
        let serde_json::Value::Object(fields) = json else {
            return Err(invalid("context-json", "expected a JSON object"));
        };
        for (key, value) in fields {
            context = context.with_attribute(key, Value::from(value));
        }
    }

    for pair in &args.context {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(invalid("context", format!("expected KEY=VALUE, got '{pair}'")));
        };
        if key.is_empty() {
            return Err(invalid("context", format!("empty key in '{pair}'")));
        }
        context = context.with_attribute(key, parse_attribute(raw));
    }

    if let Some(ref key) = args.targeting_key {
        context = context.with_targeting_key(key.as_str());
    }
    Ok(context)
}

/// `age=42` is a number, `beta=true` a bool, `name=ann` a string.
fn parse_attribute(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw).map_or_else(|_| Value::from(raw), Value::from)
}

fn parse_default(kind: FlagKind, raw: &str) -> Result<FlagValue, CliError> {
    let bad =
        |reason: String| invalid("default", format!("'{raw}' is not a valid {kind}: {reason}"));
    Ok(match kind {
        FlagKind::Boolean => FlagValue::Bool(raw.parse::<bool>().map_err(|e| bad(e.to_string()))?),
        FlagKind::String => FlagValue::String(raw.to_owned()),
        FlagKind::Integer => FlagValue::Int(raw.parse::<i64>().map_err(|e| bad(e.to_string()))?),
        FlagKind::Float => FlagValue::Float(raw.parse::<f64>().map_err(|e| bad(e.to_string()))?),
        FlagKind::Object => {
            let json: serde_json::Value =
                serde_json::from_str(raw).map_err(|e| bad(e.to_string()))?;
            FlagValue::Structure(Value::from(json))
        }
    })
}

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Rendering ────────────────────────────────────────────────────────

fn value_text(value: &FlagValue) -> String {
    match value {
        FlagValue::Bool(b) => b.to_string(),
        FlagValue::String(s) => s.clone(),
        FlagValue::Int(n) => n.to_string(),
        FlagValue::Float(n) => n.to_string(),
        FlagValue::Structure(v) => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn detail_rows(out: &EvalOutput) -> Vec<DetailRow> {
    let mut rows = vec![
        DetailRow {
            field: "Flag",
            value: out.flag_key.clone(),
        },
        DetailRow {
            field: "Type",
            value: out.kind.clone(),
        },
        DetailRow {
            field: "Value",
            value: value_text(&out.details.value),
        },
        DetailRow {
            field: "Variant",
            value: out.details.variant.clone().unwrap_or_else(|| "-".into()),
        },
        DetailRow {
            field: "Reason",
            value: out.details.reason.to_string(),
        },
    ];
    if !out.details.flag_metadata.is_empty() {
        rows.push(DetailRow {
            field: "Metadata",
            value: serde_json::to_string(&out.details.flag_metadata).unwrap_or_default(),
        });
    }
    if let Some(ref code) = out.error_code {
        rows.push(DetailRow {
            field: "Error",
            value: match out.error_message {
                Some(ref message) => format!("{code}: {message}"),
                None => code.clone(),
            },
        });
    }
    rows
}
