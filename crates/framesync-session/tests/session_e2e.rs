use bytes::{Bytes, BytesMut};
use framesync_frame::{
    encode_frame, Checksum, FrameLayout, Preamble, SequenceCounter, StreamEncoder, SyncMode,
    DEFAULT_PREAMBLE, FILLER,
};
use framesync_session::{
    ok_ack, LengthPrefixedSink, Session, SessionConfig, SessionStats, ERROR_ACK, READY,
};
use framesync_transport::MemoryTransport;

const SLACK: usize = 16;

/// A standard frame followed by the trailer slack the default receiver
/// consumes while confirming the tag.
fn wire_frame(payload: &[u8], counter: &[u8; 4]) -> BytesMut {
    let mut wire = BytesMut::new();
    encode_frame(
        payload,
        SequenceCounter::new(*counter),
        FrameLayout::standard(),
        &mut wire,
    )
    .unwrap();
    wire.extend_from_slice(&[FILLER; SLACK]);
    wire
}

fn first_payload() -> Vec<u8> {
    let mut payload = DEFAULT_PREAMBLE.to_vec();
    payload.extend_from_slice(b"TElTVGRhdGEgZm9yIGEgc2luZ2xlIGZyYW1l");
    payload
}

/// Run a default session over `stream`; returns what was written back, the
/// delivered payloads and the final counters.
fn run(stream: impl Into<Bytes>, max_read: usize) -> (Vec<u8>, Vec<Bytes>, SessionStats) {
    let transport = MemoryTransport::new(stream).with_max_read(max_read);
    let mut session = Session::new(transport, Vec::new(), SessionConfig::default()).unwrap();
    let stats = session.run().unwrap();
    let (transport, payloads) = session.into_parts();
    (transport.outbound().to_vec(), payloads, stats)
}

fn tokens(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

#[test]
fn control_token_then_valid_frame_is_acknowledged_and_delivered() {
    let payload = first_payload();
    let mut stream = BytesMut::from(&b"GNORE%%I"[..]);
    stream.extend_from_slice(&wire_frame(&payload, b"0001"));

    let (outbound, payloads, stats) = run(stream.freeze(), 8);

    let ok = ok_ack(Checksum::of(&padded(&payload)));
    assert_eq!(outbound, tokens(&[READY, &ok, READY]));
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].as_ref(),
        framesync_frame::base64::decode(&payload).unwrap().as_ref()
    );
    assert_eq!(stats.frames_accepted, 1);
    assert_eq!(stats.payloads_delivered, 1);
}

#[test]
fn corrupted_checksum_digit_is_rejected() {
    let mut wire = wire_frame(&first_payload(), b"0001");
    let digit = FrameLayout::standard().checksum_range().start + 3;
    wire[digit] = if wire[digit] == b'F' { b'E' } else { b'F' };

    let (outbound, payloads, stats) = run(wire.freeze(), 64);

    assert_eq!(outbound, tokens(&[READY, ERROR_ACK, READY]));
    assert!(payloads.is_empty());
    assert_eq!(stats.frames_rejected, 1);
}

#[test]
fn exhausted_retry_budget_reports_once() {
    let (outbound, payloads, stats) = run(vec![b'.'; 100 * 6], 6);

    assert_eq!(outbound, tokens(&[READY, ERROR_ACK, READY]));
    assert!(payloads.is_empty());
    assert_eq!(stats.sync_timeouts, 1);
}

#[test]
fn retry_budget_not_reached_reports_nothing() {
    let (outbound, _, stats) = run(vec![b'.'; 99 * 6], 6);

    assert_eq!(outbound, READY);
    assert_eq!(stats.sync_timeouts, 0);
}

#[test]
fn repeated_counter_is_acknowledged_but_not_delivered() {
    let payload = first_payload();
    let mut stream = wire_frame(&payload, b"0001");
    stream.extend_from_slice(DEFAULT_PREAMBLE);
    stream.extend_from_slice(&wire_frame(&payload, b"0001"));

    let (outbound, payloads, stats) = run(stream.freeze(), 13);

    let ok = ok_ack(Checksum::of(&padded(&payload)));
    assert_eq!(outbound, tokens(&[READY, &ok, READY, &ok, READY]));
    assert_eq!(payloads.len(), 1);
    assert_eq!(stats.frames_accepted, 2);
    assert_eq!(stats.duplicates_suppressed, 1);
}

#[test]
fn distinct_counters_are_both_delivered() {
    let mut stream = wire_frame(&first_payload(), b"0001");
    stream.extend_from_slice(DEFAULT_PREAMBLE);
    stream.extend_from_slice(&wire_frame(b"QUJD", b"0002"));

    let (_, payloads, stats) = run(stream.freeze(), 13);

    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].as_ref(), b"ABC");
    assert_eq!(stats.duplicates_suppressed, 0);
}

#[test]
fn control_token_mid_frame_drops_partial_frame() {
    let payload = first_payload();
    let wire = wire_frame(&payload, b"0001");
    let ok = ok_ack(Checksum::of(&padded(&payload)));

    // Every alignment of the token against the 8-byte reads, including the
    // ones where it ends a byte or two into a read and the retransmitted
    // preamble follows in the same read.
    for cut in 288..=304 {
        let mut stream = BytesMut::from(&wire[..cut]);
        stream.extend_from_slice(b"%IGNORE%");
        stream.extend_from_slice(&wire);

        let (outbound, payloads, stats) = run(stream.freeze(), 8);

        assert_eq!(
            outbound,
            tokens(&[READY, ERROR_ACK, READY, &ok, READY]),
            "cut at {cut}"
        );
        assert_eq!(payloads.len(), 1, "cut at {cut}");
        assert_eq!(stats.resyncs, 1, "cut at {cut}");
        assert_eq!(stats.sync_timeouts, 0, "cut at {cut}");
    }
}

#[test]
fn control_token_mid_frame_with_odd_reads() {
    let payload = first_payload();
    let wire = wire_frame(&payload, b"0001");

    for max_read in [3, 5, 7] {
        for cut in [100, 101, 102, 103] {
            let mut stream = BytesMut::from(&wire[..cut]);
            stream.extend_from_slice(b"%IGNORE%");
            stream.extend_from_slice(&wire);

            let (_, payloads, stats) = run(stream.freeze(), max_read);

            assert_eq!(payloads.len(), 1, "cut at {cut}, reads of {max_read}");
            assert_eq!(stats.resyncs, 1, "cut at {cut}, reads of {max_read}");
            assert_eq!(stats.sync_timeouts, 0, "cut at {cut}, reads of {max_read}");
        }
    }
}

#[test]
fn undecodable_payload_is_acknowledged_but_not_delivered() {
    let mut payload = DEFAULT_PREAMBLE.to_vec();
    payload.extend_from_slice(b"not base64!");

    let (outbound, payloads, stats) = run(wire_frame(&payload, b"0001").freeze(), 8);

    let ok = ok_ack(Checksum::of(&padded(&payload)));
    assert_eq!(outbound, tokens(&[READY, &ok, READY]));
    assert!(payloads.is_empty());
    assert_eq!(stats.decode_errors, 1);
}

#[test]
fn encoded_file_reassembles_per_frame() {
    let data = riff(4000);
    let encoder = StreamEncoder::new(
        FrameLayout::standard(),
        Preamble::default(),
        SyncMode::PerFrame,
    )
    .with_ignore_prefix(true);
    let stream = encoder.encode(&data).unwrap();

    let transport = MemoryTransport::new(stream)
        .with_max_read(5)
        .with_failing_read(3)
        .with_failing_read(400);
    let mut session = Session::new(transport, Vec::new(), SessionConfig::default()).unwrap();
    let stats = session.run().unwrap();

    assert_eq!(session.sink().concat(), data);
    assert_eq!(stats.frames_rejected, 0);
    assert_eq!(stats.payload_bytes, data.len() as u64);
}

#[test]
fn encoded_file_reassembles_per_session_into_length_prefixed_records() {
    let data = riff(2500);
    let config = SessionConfig {
        sync_mode: SyncMode::PerSession,
        ..SessionConfig::default()
    };
    let stream = StreamEncoder::new(
        FrameLayout::standard(),
        Preamble::default(),
        SyncMode::PerSession,
    )
    .encode(&data)
    .unwrap();

    let transport = MemoryTransport::new(stream).with_max_read(7);
    let mut session =
        Session::new(transport, LengthPrefixedSink::new(Vec::new()), config).unwrap();
    let stats = session.run().unwrap();
    let (_, sink) = session.into_parts();
    let records = sink.into_inner();

    let mut reassembled = Vec::new();
    let mut rest = records.as_slice();
    while !rest.is_empty() {
        let (len, tail) = rest.split_at(4);
        let len = u32::from_ne_bytes(len.try_into().unwrap()) as usize;
        reassembled.extend_from_slice(&tail[..len]);
        rest = &tail[len..];
    }
    assert_eq!(reassembled, data);
    assert_eq!(stats.payloads_delivered, 4);
}

fn padded(payload: &[u8]) -> Vec<u8> {
    let mut region = payload.to_vec();
    region.resize(FrameLayout::standard().payload_len(), b'=');
    region
}

fn riff(len: usize) -> Vec<u8> {
    let mut data = b"RIFF~\xc8$\rAVI LIST".to_vec();
    data.extend((0..len).map(|i| (i * 31 % 256) as u8));
    data
}
