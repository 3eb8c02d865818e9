use std::path::Path;

use netsdr_codec::MessageType;
use netsdr_session::{Connection, SessionConfig, SessionHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::{runtime, StreamArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_notification, print_stats, OutputFormat};

pub fn run(args: StreamArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let config = args.connect.session_config(config_path)?;
    runtime()?.block_on(stream(&args, &config, format))
}

async fn stream(args: &StreamArgs, config: &SessionConfig, format: OutputFormat) -> CliResult<i32> {
    let Connection {
        handle,
        mut notifications,
        dispatcher,
    } = args.connect.connect(config).await?;

    if !args.no_start {
        handle
            .start_iq(args.capture)
            .await
            .map_err(|err| session_error("start failed", err))?;
        info!(capture = %args.capture, "streaming started");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));

    let mut printed = 0usize;
    let ended = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break false,
            notification = notifications.recv() => {
                let Some(notification) = notification else {
                    break true;
                };
                print_notification(&notification, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break false;
                }
            }
        }
    };

    if ended {
        return match dispatcher.await {
            Ok(Err(err)) => Err(session_error("stream ended", err)),
            _ => Err(CliError::new(FAILURE, "stream ended")),
        };
    }

    report_stats(&handle, format).await;
    if !args.no_start {
        if let Err(err) = handle.stop_iq().await {
            warn!(%err, "stop command failed");
        }
    }

    Ok(SUCCESS)
}

async fn watch_ctrl_c(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupted, stopping stream");
        shutdown.cancel();
    }
}

async fn report_stats(handle: &SessionHandle, format: OutputFormat) {
    match handle.stream_stats(MessageType::DataItem0).await {
        Ok(stats) => {
            info!(
                frames = stats.frames,
                samples = stats.samples,
                gaps = stats.gaps,
                dropped = stats.dropped,
                decode_failures = stats.decode_failures,
                "stream summary"
            );
            if matches!(format, OutputFormat::Table) {
                print_stats(MessageType::DataItem0, &stats, format);
            }
        }
        Err(err) => warn!(%err, "stream stats unavailable"),
    }
}
