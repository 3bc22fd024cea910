//! Scenario-level tests exercising `CodecFilter` end to end, against a small
//! hand-rolled length-prefixed codec rather than anything pulled from a mocking crate.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use codec_filter::factory::{ClosureFactory, FixedPairFactory};
use codec_filter::next_filter::recording::RecordingNextFilter;
use codec_filter::session::InMemorySession;
use codec_filter::{
    ByteBuffer, CodecFilter, Decoder, DecoderError, DecoderOutputGuard, Encoder, EncoderError,
    EncoderOutput, Message, Session, WriteFuture, WriteRequest,
};

/// Frames are `len: u16 (big-endian) || payload`. Decodes each complete payload into
/// a `String` application message. Cumulative: every call hands its entire input to
/// an internal accumulator (so the filter's own buffer never has to survive across
/// reads), then extracts as many complete frames as are available.
#[derive(Clone, Default)]
struct LengthPrefixedCodec {
    accumulator: Vec<u8>,
}

impl Decoder for LengthPrefixedCodec {
    fn decode(
        &mut self,
        _session: &dyn Session,
        input: &mut ByteBuffer,
        output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        self.accumulator.extend_from_slice(input.remaining_slice());
        input.advance(input.remaining());

        loop {
            if self.accumulator.len() < 2 {
                break;
            }
            let len = BigEndian::read_u16(&self.accumulator[..2]) as usize;
            if self.accumulator.len() < 2 + len {
                break;
            }
            let payload = self.accumulator[2..2 + len].to_vec();
            self.accumulator.drain(..2 + len);
            let text = String::from_utf8(payload).map_err(DecoderError::wrap)?;
            output.write(text);
        }
        Ok(())
    }
}

impl Encoder for LengthPrefixedCodec {
    fn encode(
        &mut self,
        _session: &dyn Session,
        _message: Box<dyn Any + Send>,
        _output: &EncoderOutput,
    ) -> Result<(), EncoderError> {
        Ok(())
    }
}

/// Like `LengthPrefixedCodec`, but a leading `0xFF` byte is treated as a bad-lead-byte
/// condition raising a recoverable error, optionally advancing past it first.
#[derive(Clone)]
struct BadLeadByteCodec {
    advance_before_error: bool,
}

impl Decoder for BadLeadByteCodec {
    fn decode(
        &mut self,
        _session: &dyn Session,
        input: &mut ByteBuffer,
        output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        if !input.has_remaining() {
            return Ok(());
        }
        if input.remaining_slice()[0] == 0xFF {
            if self.advance_before_error {
                input.advance(1);
            }
            return Err(DecoderError::recoverable("bad lead byte"));
        }

        if input.remaining() < 2 {
            return Ok(());
        }
        let len = BigEndian::read_u16(&input.remaining_slice()[..2]) as usize;
        if input.remaining() < 2 + len {
            return Ok(());
        }
        input.advance(2);
        let payload = input.remaining_slice()[..len].to_vec();
        input.advance(len);
        let text = String::from_utf8(payload).map_err(DecoderError::wrap)?;
        output.write(text);
        Ok(())
    }
}

impl Encoder for BadLeadByteCodec {
    fn encode(
        &mut self,
        _session: &dyn Session,
        _message: Box<dyn Any + Send>,
        _output: &EncoderOutput,
    ) -> Result<(), EncoderError> {
        Ok(())
    }
}

/// Never emits from `decode`; emits exactly one terminal message from `finish_decode`,
/// counting dispose calls so the test can assert each codec was torn down once.
struct BufferOnCloseCodec {
    dispose_count: Arc<AtomicUsize>,
}

impl Decoder for BufferOnCloseCodec {
    fn decode(
        &mut self,
        _session: &dyn Session,
        _input: &mut ByteBuffer,
        _output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        Ok(())
    }

    fn finish_decode(
        &mut self,
        _session: &dyn Session,
        output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        output.write("X".to_string());
        Ok(())
    }

    fn dispose(&mut self, _session: &dyn Session) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Encoder for BufferOnCloseCodec {
    fn encode(
        &mut self,
        _session: &dyn Session,
        _message: Box<dyn Any + Send>,
        _output: &EncoderOutput,
    ) -> Result<(), EncoderError> {
        Ok(())
    }

    fn dispose(&mut self, _session: &dyn Session) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Panics if `encode` is ever called, to prove bypassed writes never reach it.
struct PanicIfEncodedCodec;

impl Decoder for PanicIfEncodedCodec {
    fn decode(
        &mut self,
        _session: &dyn Session,
        input: &mut ByteBuffer,
        _output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        input.advance(input.remaining());
        Ok(())
    }
}

impl Encoder for PanicIfEncodedCodec {
    fn encode(
        &mut self,
        _session: &dyn Session,
        _message: Box<dyn Any + Send>,
        _output: &EncoderOutput,
    ) -> Result<(), EncoderError> {
        panic!("encoder must not be invoked for an already-encoded write");
    }
}

#[test]
fn s1_split_frame_across_two_reads() {
    let filter = CodecFilter::new(FixedPairFactory::new(
        LengthPrefixedCodec::default(),
        LengthPrefixedCodec::default(),
    ));
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    filter.message_received(&session, &next, Message::Bytes(ByteBuffer::wrap(vec![0x00, 0x03, 0x41, 0x42])));
    assert!(next.received_strings().is_empty(), "frame is incomplete, nothing should be delivered yet");

    filter.message_received(&session, &next, Message::Bytes(ByteBuffer::wrap(vec![0x43])));
    assert_eq!(next.received_strings(), vec!["ABC"]);
}

#[test]
fn s2_two_frames_in_one_read() {
    let filter = CodecFilter::new(FixedPairFactory::new(
        LengthPrefixedCodec::default(),
        LengthPrefixedCodec::default(),
    ));
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    let frame = vec![0x00, 0x02, 0x41, 0x42, 0x00, 0x01, 0x43];
    filter.message_received(&session, &next, Message::Bytes(ByteBuffer::wrap(frame)));

    assert_eq!(next.received_strings(), vec!["AB", "C"]);
}

#[test]
fn s3_recoverable_error_with_progress_then_delivery() {
    let codec = BadLeadByteCodec { advance_before_error: true };
    let filter = CodecFilter::new(FixedPairFactory::new(codec.clone(), codec));
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    filter.message_received(
        &session,
        &next,
        Message::Bytes(ByteBuffer::wrap(vec![0xFF, 0x00, 0x01, 0x41])),
    );

    assert_eq!(next.exception_count(), 1);
    assert_eq!(next.received_strings(), vec!["A"]);
}

#[test]
fn s4_recoverable_error_without_progress_exits_loop() {
    let codec = BadLeadByteCodec { advance_before_error: false };
    let filter = CodecFilter::new(FixedPairFactory::new(codec.clone(), codec));
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    filter.message_received(
        &session,
        &next,
        Message::Bytes(ByteBuffer::wrap(vec![0xFF, 0x00, 0x01, 0x41])),
    );

    assert_eq!(next.exception_count(), 1);
    assert!(next.received_strings().is_empty());
}

#[test]
fn s5_finish_decode_emits_terminal_message_then_session_closed() {
    let dispose_count = Arc::new(AtomicUsize::new(0));
    let decoder_count = dispose_count.clone();
    let encoder_count = dispose_count.clone();
    let factory = ClosureFactory::new(
        move |_session: &dyn Session| -> Box<dyn Encoder> {
            Box::new(BufferOnCloseCodec { dispose_count: encoder_count.clone() })
        },
        move |_session: &dyn Session| -> Box<dyn Decoder> {
            Box::new(BufferOnCloseCodec { dispose_count: decoder_count.clone() })
        },
    );
    let filter = CodecFilter::new(factory);
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    filter.session_closed(&session, &next);

    assert_eq!(next.received_strings(), vec!["X"]);
    assert_eq!(next.events().last().map(|e| e.as_str()), Some("SessionClosed"));
    assert_eq!(dispose_count.load(Ordering::SeqCst), 2, "decoder and encoder must each dispose once");
}

#[test]
fn s6_pre_encoded_bypass_skips_encoder() {
    let factory = ClosureFactory::new(
        |_session: &dyn Session| -> Box<dyn Encoder> { Box::new(PanicIfEncodedCodec) },
        |_session: &dyn Session| -> Box<dyn Decoder> { Box::new(PanicIfEncodedCodec) },
    );
    let filter = CodecFilter::new(factory);
    let session = InMemorySession::new(1);
    filter.on_add(&session).unwrap();
    let next = RecordingNextFilter::new();

    let future = WriteFuture::new();
    let request = WriteRequest::new(Message::Bytes(ByteBuffer::wrap(vec![1, 2, 3])), future.clone());
    filter.filter_write(&session, &next, request).unwrap();

    assert_eq!(next.filter_write_count(), 1);
    assert!(future.is_written());
}
