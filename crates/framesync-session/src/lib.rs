//! Receive-side session control for framesync.
//!
//! A [`Session`] owns a transport and a payload sink and drives the
//! synchronize / assemble / validate / dispatch cycle, answering each frame
//! with an 18-byte acknowledgement followed by `%READY%`. Nothing short of
//! the transport closing ends a session.

pub mod config;
pub mod error;
pub mod session;
pub mod sink;
pub mod stats;
pub mod tokens;

pub use config::SessionConfig;
pub use error::{Fault, Result, SessionError};
pub use session::{Session, SessionState};
pub use sink::{LengthPrefixedSink, PayloadSink, RawSink};
pub use stats::SessionStats;
pub use tokens::{ok_ack, ACK_LEN, ERROR_ACK, READY};
