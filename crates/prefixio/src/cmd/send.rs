use prefixio_frame::{FrameConfig, FrameWriter};
use prefixio_transport::connect;
use tracing::info;

use crate::cmd::{parse_duration, resolve_messages, Context, SendArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};

pub fn run(args: SendArgs, ctx: Context) -> CliResult<i32> {
    let write_timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
    let messages = resolve_messages(&args.messages)?;

    let stream = connect(&args.endpoint).map_err(|err| transport_error("connect failed", err))?;
    let config = FrameConfig {
        max_payload_size: ctx.max_len,
        write_timeout,
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_stream(stream, config)
        .map_err(|err| frame_error("stream setup failed", err))?;

    for (index, payload) in messages.iter().enumerate() {
        writer
            .send(payload)
            .map_err(|err| frame_error(&format!("send of message {index} failed"), err))?;
    }

    // Half-close so the receiver sees a clean end-of-stream after the last frame.
    writer
        .get_ref()
        .shutdown_write()
        .map_err(|err| transport_error("shutdown failed", err))?;

    info!(endpoint = %args.endpoint, messages = messages.len(), "sent");
    Ok(SUCCESS)
}
