//! The pluggable `Decoder` / `Encoder` traits (§3, §6). Concrete codecs are external
//! collaborators — this crate only defines the seam and drives it.

use std::any::Any;
use std::error::Error as StdError;

use crate::buffer::ByteBuffer;
use crate::decoder_output::DecoderOutputGuard;
use crate::encoder_output::EncoderOutput;
use crate::error::DecoderError;
use crate::error::EncoderError;
use crate::session::Session;

/// A stateful, per-session decoder. Implementations accumulate partial frames
/// themselves — `CodecFilter` never buffers across calls (§1 Non-goals).
pub trait Decoder: Send {
    /// Consumes as much of `input` as forms complete messages, writing each to
    /// `output`. Must advance `input`'s position past whatever it consumed; leaving
    /// the position unchanged on error is what lets the decode loop detect "no
    /// progress" (§4.2d).
    fn decode(
        &mut self,
        session: &dyn Session,
        input: &mut ByteBuffer,
        output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError>;

    /// Called once at session close to let a decoder emit a terminal message it was
    /// still buffering (S5). The default assumes nothing was buffered.
    fn finish_decode(
        &mut self,
        _session: &dyn Session,
        _output: &mut DecoderOutputGuard<'_>,
    ) -> Result<(), DecoderError> {
        Ok(())
    }

    /// Releases any resources held by the decoder. Errors are logged and swallowed
    /// by the caller (§7) — never propagated to the filter chain.
    fn dispose(&mut self, _session: &dyn Session) -> Result<(), Box<dyn StdError + Send + Sync>> {
        Ok(())
    }
}

/// A stateful, per-session encoder producing at most one payload per `encode` call.
pub trait Encoder: Send {
    /// Encodes `message` and, if it produces a wire payload, writes it to `output`
    /// exactly once. Emitting nothing is a valid outcome (e.g. coalescing, §4.4
    /// property 8).
    fn encode(
        &mut self,
        session: &dyn Session,
        message: Box<dyn Any + Send>,
        output: &EncoderOutput,
    ) -> Result<(), EncoderError>;

    fn dispose(&mut self, _session: &dyn Session) -> Result<(), Box<dyn StdError + Send + Sync>> {
        Ok(())
    }
}
