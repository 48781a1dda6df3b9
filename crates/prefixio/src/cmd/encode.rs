use std::io::Write;

use prefixio_frame::write_bytes;
use tracing::{debug, warn};

use crate::cmd::{resolve_messages, Context, EncodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs, ctx: Context) -> CliResult<i32> {
    let messages = resolve_messages(&args.messages)?;
    let mut out = std::io::stdout().lock();

    for (index, payload) in messages.iter().enumerate() {
        if payload.len() > ctx.max_len {
            warn!(
                index,
                size = payload.len(),
                max = ctx.max_len,
                "message exceeds the read-side maximum; decoders will reject it"
            );
        }
        write_bytes(&mut out, payload)
            .map_err(|err| frame_error(&format!("encoding message {index} failed"), err))?;
        debug!(index, size = payload.len(), "encoded message");
    }

    out.flush().map_err(|err| io_error("flush failed", err))?;
    Ok(SUCCESS)
}
