//! Error types raised by the codec filter.
//!
//! Mirrors the split the underlying network stack uses for its own I/O errors: a
//! recoverability flag lives on the error itself rather than being inferred by the
//! caller, and foreign errors are wrapped rather than swallowed.

use std::error::Error as StdError;
use std::fmt;

use crate::buffer::HexDump;

/// Raised by a [`Decoder`](crate::codec::Decoder) while decoding, or while finishing
/// decode at session close.
#[derive(Debug)]
pub struct DecoderError {
    message: String,
    recoverable: bool,
    hex_dump: Option<HexDump>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DecoderError {
    /// Builds a non-recoverable decoder error.
    pub fn fatal<M: Into<String>>(message: M) -> DecoderError {
        DecoderError {
            message: message.into(),
            recoverable: false,
            hex_dump: None,
            source: None,
        }
    }

    /// Builds a decoder error the decoder asserts it can resume from, provided the
    /// input position advanced during the call that raised it.
    pub fn recoverable<M: Into<String>>(message: M) -> DecoderError {
        DecoderError {
            message: message.into(),
            recoverable: true,
            hex_dump: None,
            source: None,
        }
    }

    /// Wraps a foreign error as a fatal decoder error.
    pub fn wrap<E: StdError + Send + Sync + 'static>(source: E) -> DecoderError {
        DecoderError {
            message: source.to_string(),
            recoverable: false,
            hex_dump: None,
            source: Some(Box::new(source)),
        }
    }

    /// True if this error was raised as recoverable.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// True if a hex-dump has already been attached.
    #[inline]
    pub fn has_hex_dump(&self) -> bool {
        self.hex_dump.is_some()
    }

    /// Attaches a hex-dump to the error. A no-op if one is already present, so the
    /// decode loop can call this unconditionally (§4.2 invariant 9).
    #[inline]
    pub fn set_hex_dump_if_absent(&mut self, dump: HexDump) {
        if self.hex_dump.is_none() {
            self.hex_dump = Some(dump);
        }
    }

    /// The attached hex-dump, if any.
    #[inline]
    pub fn hex_dump(&self) -> Option<&HexDump> {
        self.hex_dump.as_ref()
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decoder error: {}", self.message)?;
        if let Some(dump) = &self.hex_dump {
            write!(f, "\n{}", dump)?;
        }
        Ok(())
    }
}

impl StdError for DecoderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Raised by an [`Encoder`](crate::codec::Encoder) while encoding.
#[derive(Debug)]
pub struct EncoderError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl EncoderError {
    pub fn fatal<M: Into<String>>(message: M) -> EncoderError {
        EncoderError { message: message.into(), source: None }
    }

    pub fn wrap<E: StdError + Send + Sync + 'static>(source: E) -> EncoderError {
        EncoderError {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoder error: {}", self.message)
    }
}

impl StdError for EncoderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// A programming-error condition: duplicate filter add, a second `EncoderOutput::write`
/// within one `encode` call, or similar contract violations. Never raised due to network
/// input — always a caller bug.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum IllegalUsage {
    /// The same `CodecFilter` instance was added to a session's chain more than once.
    DuplicateFilterAdd,
    /// `EncoderOutput::write` was called a second time within a single `encode` call.
    DuplicateEncoderWrite,
}

impl fmt::Display for IllegalUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalUsage::DuplicateFilterAdd => {
                write!(f, "codec filter instance already added to this session")
            }
            IllegalUsage::DuplicateEncoderWrite => {
                write!(f, "encoder wrote more than one message in a single encode call")
            }
        }
    }
}

impl StdError for IllegalUsage {}

/// Any error the inbound path can classify and hand to `exceptionCaught` or `sessionClosed`.
#[derive(Debug)]
pub enum FilterError {
    Decode(DecoderError),
    Encode(EncoderError),
    Usage(IllegalUsage),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Decode(e) => e.fmt(f),
            FilterError::Encode(e) => e.fmt(f),
            FilterError::Usage(e) => e.fmt(f),
        }
    }
}

impl StdError for FilterError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FilterError::Decode(e) => Some(e),
            FilterError::Encode(e) => Some(e),
            FilterError::Usage(e) => Some(e),
        }
    }
}

impl From<DecoderError> for FilterError {
    fn from(e: DecoderError) -> Self {
        FilterError::Decode(e)
    }
}

impl From<EncoderError> for FilterError {
    fn from(e: EncoderError) -> Self {
        FilterError::Encode(e)
    }
}

impl From<IllegalUsage> for FilterError {
    fn from(e: IllegalUsage) -> Self {
        FilterError::Usage(e)
    }
}
