use std::fs;

use framesync_frame::StreamEncoder;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_encode_summary, print_raw, EncodeSummary, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.to_config()?;
    let layout = config
        .layout()
        .map_err(|err| session_error("invalid configuration", err))?;
    let preamble = config
        .build_preamble()
        .map_err(|err| session_error("invalid configuration", err))?;

    let data = fs::read(&args.input)
        .map_err(|err| io_error(&format!("read {} failed", args.input.display()), err))?;

    let encoder = StreamEncoder::new(layout, preamble, config.sync_mode)
        .with_slack(config.trailer_slack())
        .with_ignore_prefix(args.ignore_prefix);
    let stream = encoder
        .encode(&data)
        .map_err(|err| frame_error("encode failed", err))?;

    match &args.output {
        Some(path) => {
            fs::write(path, &stream)
                .map_err(|err| io_error(&format!("write {} failed", path.display()), err))?;
            let summary = EncodeSummary {
                input_bytes: data.len(),
                frames: encoder.frame_count(data.len()),
                stream_bytes: stream.len(),
            };
            print_encode_summary(&summary, format);
        }
        None => print_raw(&stream).map_err(|err| io_error("write stdout failed", err))?,
    }
    Ok(SUCCESS)
}
