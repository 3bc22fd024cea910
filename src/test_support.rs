//! Minimal codec test double shared by unit tests across modules. Integration-style
//! scenarios define their own richer codecs rather than growing this one.

use std::any::Any;

use crate::buffer::ByteBuffer;
use crate::codec::{Decoder, Encoder};
use crate::decoder_output::DecoderOutputGuard;
use crate::encoder_output::EncoderOutput;
use crate::error::{DecoderError, EncoderError};
use crate::session::Session;

/// Decodes by handing back whatever bytes remain, as a single `Vec<u8>` application
/// message; encodes by wrapping a `Vec<u8>` message straight back into a buffer.
/// Stateless, so `Clone`/`Default` are trivial — exactly what the factory tests need.
#[derive(Clone, Default)]
pub struct EchoCodec;

impl Decoder for EchoCodec {
    fn decode(
        &mut self,
        _session: &dyn Session,
        input: &mut ByteBuffer,
        output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        if !input.has_remaining() {
            return Ok(());
        }
        let bytes = input.remaining_slice().to_vec();
        input.advance(bytes.len());
        output.write(bytes);
        Ok(())
    }
}

impl Encoder for EchoCodec {
    fn encode(
        &mut self,
        _session: &dyn Session,
        message: Box<dyn Any + Send>,
        output: &EncoderOutput,
    ) -> Result<(), EncoderError> {
        let bytes = match message.downcast::<Vec<u8>>() {
            Ok(bytes) => *bytes,
            Err(_) => return Err(EncoderError::fatal("EchoCodec only encodes Vec<u8> messages")),
        };
        output
            .write(ByteBuffer::wrap(bytes))
            .map_err(|_| EncoderError::fatal("encoder output slot already written this call"))
    }
}
