use std::fs::File;
use std::io::{BufReader, Read};

use prefixio_frame::{FrameConfig, FrameReader};
use tracing::{debug, info};

use crate::cmd::{Context, DecodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_message, Received};

pub fn run(args: DecodeArgs, ctx: Context) -> CliResult<i32> {
    let (source, input): (String, Box<dyn Read>) = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            (path.display().to_string(), Box::new(file))
        }
        None => ("stdin".to_string(), Box::new(std::io::stdin().lock())),
    };

    let config = FrameConfig {
        max_payload_size: ctx.max_len,
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config(BufReader::new(input), config);

    let mut index = 0usize;
    loop {
        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            Err(err) if err.is_end_of_stream() => {
                debug!(error = %err, "end of input");
                break;
            }
            Err(err) => {
                return Err(frame_error(
                    &format!("decoding message {index} failed"),
                    err,
                ))
            }
        };

        print_message(
            &Received {
                index,
                source: &source,
                payload,
            },
            ctx.format,
        );
        index += 1;
    }

    info!(messages = index, %source, "decoded");
    Ok(SUCCESS)
}
