use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prefixio_frame::{FrameConfig, FrameReader};
use prefixio_transport::{connect, Endpoint, Listener};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, Context, ListenArgs};
use crate::exit::{transport_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};
use crate::output::{print_message, Received};

pub fn run(args: ListenArgs, ctx: Context) -> CliResult<i32> {
    let read_timeout = args
        .idle_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;
    let config = FrameConfig {
        max_payload_size: ctx.max_len,
        read_timeout,
        ..FrameConfig::default()
    };

    let listener =
        Listener::bind(&args.endpoint).map_err(|err| transport_error("bind failed", err))?;
    let local = listener
        .local_endpoint()
        .map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), local)?;

    let mut printed = 0usize;
    let mut connections = 0usize;

    while running.load(Ordering::SeqCst) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        connections += 1;
        let source = format!("conn-{connections}");
        debug!(%source, kind = stream.kind(), "accepted connection");

        let mut reader = match FrameReader::with_config_stream(stream, config.clone()) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(%source, error = %err, "dropping connection");
                continue;
            }
        };

        while running.load(Ordering::SeqCst) {
            let payload = match reader.read_frame() {
                Ok(payload) => payload,
                Err(err) if err.is_end_of_stream() => {
                    debug!(%source, "peer closed");
                    break;
                }
                Err(err) => {
                    // The stream cannot be resynchronized; only this connection is lost.
                    warn!(%source, error = %err, "dropping connection");
                    break;
                }
            };

            print_message(
                &Received {
                    index: printed,
                    source: &source,
                    payload,
                },
                ctx.format,
            );
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    info!(messages = printed, connections, "listener stopped");
    Ok(SUCCESS)
}

/// First Ctrl-C stops the accept loop; a second one exits immediately.
fn install_ctrlc_handler(running: Arc<AtomicBool>, local: Endpoint) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED);
        }
        // Unblock a pending accept so the loop observes the flag.
        let _ = connect(&local);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
