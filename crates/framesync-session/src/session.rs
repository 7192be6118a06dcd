use std::mem;

use bytes::{Bytes, BytesMut};
use framesync_frame::{
    check, Checksum, Deduplicator, Frame, FrameAssembler, FrameState, PreambleScanner, Pushback,
    ScanOutcome, SyncMode,
};
use framesync_transport::{ByteTransport, TransportError};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Fault, Result, SessionError};
use crate::sink::PayloadSink;
use crate::stats::SessionStats;
use crate::tokens::{ok_ack, ERROR_ACK, READY};

/// Where the controller is in the receive cycle.
///
/// ```text
/// AwaitSync ──match──▶ Assembling ──complete──▶ Validating ──ok──▶ Dispatching
///     ▲  │                  │                       │                  │
///     │  └─timeout──┐       └─resync──┐             └─mismatch──┐      │
///     │             ▼                 ▼                         ▼      │
///     └────────── ErrorRetry ◀────────┴─────────────────────────┘      │
///     └────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Searching for the preamble (skipped in per-session mode once synced).
    AwaitSync,
    /// Filling a frame window; `seed` holds bytes already consumed that
    /// start the window.
    Assembling { seed: Option<Bytes> },
    /// A tagged window awaits its checksum check.
    Validating(Frame),
    /// A checksum-valid frame awaits acknowledgement and delivery.
    Dispatching { frame: Frame, checksum: Checksum },
    /// A fault awaits the error acknowledgement.
    ErrorRetry(Fault),
}

/// Receive-side controller over one transport.
///
/// Owns the retry budget, the last sequence counter, the frame window and
/// any bytes read past an aborted frame; no state lives outside this struct.
pub struct Session<T, S> {
    transport: T,
    pending: BytesMut,
    sink: S,
    config: SessionConfig,
    scanner: PreambleScanner,
    assembler: FrameAssembler,
    dedup: Deduplicator,
    state: SessionState,
    stats: SessionStats,
    announced: bool,
    synced: bool,
    accepted_any: bool,
}

impl<T: ByteTransport, S: PayloadSink> Session<T, S> {
    /// Validate `config` and build a session. No I/O happens until the first
    /// [`step`](Self::step).
    pub fn new(transport: T, sink: S, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let preamble = config.build_preamble()?;
        let layout = config.layout()?;

        Ok(Self {
            transport,
            pending: BytesMut::new(),
            sink,
            scanner: PreambleScanner::new(preamble, config.retry_budget),
            assembler: FrameAssembler::new(layout)
                .with_chunk(config.fill_chunk)
                .with_confirmations(config.tag_confirmations),
            config,
            dedup: Deduplicator::new(),
            state: SessionState::AwaitSync,
            stats: SessionStats::default(),
            announced: false,
            synced: false,
            accepted_any: false,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }

    /// Perform one state transition and return the new state.
    ///
    /// The first call announces the receiver with `%READY%`.
    pub fn step(&mut self) -> Result<&SessionState> {
        if !self.announced {
            self.announced = true;
            self.send(READY)?;
            self.drain()?;
        }

        self.state = match mem::replace(&mut self.state, SessionState::AwaitSync) {
            SessionState::AwaitSync => self.await_sync()?,
            SessionState::Assembling { seed } => self.assemble(seed)?,
            SessionState::Validating(frame) => self.validate(frame),
            SessionState::Dispatching { frame, checksum } => self.dispatch(frame, checksum)?,
            SessionState::ErrorRetry(fault) => self.retry(fault)?,
        };
        Ok(&self.state)
    }

    /// Run until the transport closes.
    pub fn run(&mut self) -> Result<SessionStats> {
        self.run_until(|| false)
    }

    /// Run until the transport closes or `stop` returns true. `stop` is
    /// checked between transitions.
    pub fn run_until(&mut self, mut stop: impl FnMut() -> bool) -> Result<SessionStats> {
        info!(
            mode = ?self.config.sync_mode,
            frame_len = self.config.frame_len,
            "session started"
        );
        while !stop() {
            match self.step() {
                Ok(_) => {}
                Err(err) if err.is_closed() => {
                    info!("transport closed");
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        info!(
            accepted = self.stats.frames_accepted,
            rejected = self.stats.frames_rejected,
            delivered = self.stats.payloads_delivered,
            "session ended"
        );
        Ok(self.stats)
    }

    fn await_sync(&mut self) -> Result<SessionState> {
        if self.synced && self.config.sync_mode == SyncMode::PerSession {
            return Ok(SessionState::Assembling { seed: None });
        }

        let mut source = Pushback::new(&mut self.pending, &mut self.transport);
        match self.scanner.scan(&mut source)? {
            ScanOutcome::Matched { phase, .. } => {
                self.synced = true;
                // Only the first frame of a session carries the preamble as
                // payload; later preambles are markers.
                let seed = (!self.accepted_any)
                    .then(|| Bytes::copy_from_slice(self.scanner.preamble().as_bytes()));
                debug!(phase, seeded = seed.is_some(), "synchronized");
                Ok(SessionState::Assembling { seed })
            }
            ScanOutcome::BudgetExhausted { .. } => Ok(SessionState::ErrorRetry(Fault::SyncTimeout)),
        }
    }

    fn assemble(&mut self, seed: Option<Bytes>) -> Result<SessionState> {
        let mut source = Pushback::new(&mut self.pending, &mut self.transport);
        match self.assembler.fill(&mut source, seed.as_deref())? {
            FrameState::Complete(frame) => Ok(SessionState::Validating(frame)),
            FrameState::Resynced(reason) => {
                self.synced = false;
                let leftover = self.assembler.take_leftover();
                if !leftover.is_empty() {
                    let mut carried = BytesMut::from(leftover.as_ref());
                    carried.extend_from_slice(&self.pending);
                    self.pending = carried;
                }
                Ok(SessionState::ErrorRetry(Fault::FrameResync(reason)))
            }
        }
    }

    fn validate(&mut self, frame: Frame) -> SessionState {
        match check(&frame) {
            Ok(checksum) => SessionState::Dispatching { frame, checksum },
            Err(mismatch) => SessionState::ErrorRetry(Fault::ChecksumMismatch(mismatch)),
        }
    }

    fn dispatch(&mut self, frame: Frame, checksum: Checksum) -> Result<SessionState> {
        self.send(&ok_ack(checksum))?;
        self.accepted_any = true;
        self.stats.frames_accepted += 1;

        let counter = frame.counter();
        if self.dedup.admit(&frame) {
            match frame.decode_payload() {
                Ok(payload) => {
                    let len = payload.len();
                    self.sink.deliver(payload).map_err(SessionError::Sink)?;
                    self.stats.payloads_delivered += 1;
                    self.stats.payload_bytes += len as u64;
                    debug!(%checksum, %counter, bytes = len, "payload delivered");
                }
                Err(err) => self.note_fault(&Fault::Decode(err)),
            }
        } else {
            self.stats.duplicates_suppressed += 1;
            debug!(%counter, "duplicate frame suppressed");
        }

        self.drain()?;
        self.send(READY)?;
        self.drain()?;
        Ok(SessionState::AwaitSync)
    }

    fn retry(&mut self, fault: Fault) -> Result<SessionState> {
        self.note_fault(&fault);
        self.send(ERROR_ACK)?;
        self.drain()?;
        self.send(READY)?;
        self.drain()?;
        Ok(SessionState::AwaitSync)
    }

    fn note_fault(&mut self, fault: &Fault) {
        match fault {
            Fault::SyncTimeout => {
                self.stats.sync_timeouts += 1;
                debug!(fault = %fault, "reporting sync timeout");
            }
            Fault::FrameResync(reason) => {
                self.stats.resyncs += 1;
                info!(reason = %reason, "frame resync");
            }
            Fault::ChecksumMismatch(mismatch) => {
                self.stats.frames_rejected += 1;
                warn!(
                    expected = %mismatch.computed,
                    received = %mismatch.received,
                    "checksum mismatch"
                );
            }
            Fault::Decode(err) => {
                self.stats.decode_errors += 1;
                warn!(error = %err, "payload decode failed; not delivered");
            }
        }
    }

    fn send(&mut self, token: &[u8]) -> Result<()> {
        tolerate(self.transport.write_all(token), "write")
    }

    fn drain(&mut self) -> Result<()> {
        tolerate(self.transport.drain(), "drain")
    }
}

/// Transient transport errors on the acknowledgement path are logged and
/// dropped; the sender retransmits whatever it did not hear back about.
fn tolerate(result: std::result::Result<(), TransportError>, op: &'static str) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_transient() => {
            warn!(error = %err, op, "transport call failed; ignoring");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
