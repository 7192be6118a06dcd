use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use framesync_session::{
    LengthPrefixedSink, PayloadSink, RawSink, Session, SessionConfig, SessionStats,
};
use framesync_transport::{ByteTransport, StreamTransport};
use tracing::info;

use crate::cmd::{PayloadFormat, ReceiveArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.session.to_config()?;
    let sink = open_sink(args.output.as_deref(), args.output_format)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (stats, source) = match (&args.replay, &args.device) {
        (Some(replay), _) => {
            let file = File::open(replay)
                .map_err(|err| io_error(&format!("open {} failed", replay.display()), err))?;
            // Acknowledgements have nowhere to go when replaying a capture.
            let transport = StreamTransport::new(BufReader::new(file), io::sink());
            (receive(transport, sink, config, &running)?, replay)
        }
        (None, Some(device)) => (open_device(device, sink, config, &running)?, device),
        (None, None) => return Err(CliError::new(USAGE, "a DEVICE or --replay FILE is required")),
    };

    let source = source.display().to_string();
    if args.output.is_some() {
        print_stats(&stats, &source, format);
    } else {
        info!(
            source = %source,
            accepted = stats.frames_accepted,
            rejected = stats.frames_rejected,
            duplicates = stats.duplicates_suppressed,
            resyncs = stats.resyncs,
            sync_timeouts = stats.sync_timeouts,
            decode_errors = stats.decode_errors,
            delivered = stats.payloads_delivered,
            bytes = stats.payload_bytes,
            "receive finished"
        );
    }
    Ok(SUCCESS)
}

#[cfg(unix)]
fn open_device(
    device: &Path,
    sink: Box<dyn PayloadSink>,
    config: SessionConfig,
    running: &AtomicBool,
) -> CliResult<SessionStats> {
    let transport = framesync_transport::SerialDevice::open(device)
        .map_err(|err| crate::exit::transport_error("open device failed", err))?;
    receive(transport, sink, config, running)
}

#[cfg(not(unix))]
fn open_device(
    device: &Path,
    _sink: Box<dyn PayloadSink>,
    _config: SessionConfig,
    _running: &AtomicBool,
) -> CliResult<SessionStats> {
    Err(CliError::new(
        USAGE,
        format!(
            "{}: serial devices are only supported on unix; use --replay",
            device.display()
        ),
    ))
}

fn receive<T: ByteTransport>(
    transport: T,
    sink: Box<dyn PayloadSink>,
    config: SessionConfig,
    running: &AtomicBool,
) -> CliResult<SessionStats> {
    let mut session = Session::new(transport, sink, config)
        .map_err(|err| session_error("invalid configuration", err))?;
    session
        .run_until(|| !running.load(Ordering::SeqCst))
        .map_err(|err| session_error("receive failed", err))
}

fn open_sink(
    output: Option<&Path>,
    payload_format: PayloadFormat,
) -> CliResult<Box<dyn PayloadSink>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("create {} failed", path.display()), err))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    let sink: Box<dyn PayloadSink> = match payload_format {
        PayloadFormat::Raw => Box::new(RawSink::new(writer)),
        PayloadFormat::LengthPrefixed => Box::new(LengthPrefixedSink::new(writer)),
    };
    Ok(sink)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
