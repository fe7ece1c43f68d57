//! `flagwire watch`: print provider events as they arrive.

use tokio::sync::mpsc;

use flagwire_core::{ProviderEventKind, Resolver, ResolverConfig};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: ResolverConfig,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let endpoint = config.endpoint.uri.clone();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let resolver = Resolver::connect(config, events_tx)
        .map_err(|e| CliError::from_provider(e, "<watch>", &endpoint))?;

    let color = output::should_color(&global.color);
    resolver.init().await;
    tracing::info!(%endpoint, "Watching provider events");

    let mut seen = 0usize;
    let mut last_error: Option<String> = None;
    let result = loop {
        if args.count.is_some_and(|limit| seen >= limit) {
            break Ok(());
        }

        tokio::select! {
            event = events.recv() => {
                // The stream task owns the only sender; None means it gave up
                let Some(event) = event else {
                    break Err(CliError::ProviderNotReady {
                        endpoint: endpoint.clone(),
                        message: last_error.unwrap_or_else(|| "event stream stopped".into()),
                    });
                };
                if event.kind == ProviderEventKind::Error {
                    last_error.clone_from(&event.message);
                }
                match output::render_event(&global.output, &event, color) {
                    Ok(line) => output::print_output(&line, global.quiet),
                    Err(e) => break Err(e),
                }
                seen += 1;
            }
            signal = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted");
                break signal.map_err(CliError::from);
            }
        }
    };

    resolver.shutdown().await;
    result
}
