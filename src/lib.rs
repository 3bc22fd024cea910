//! A bidirectional protocol codec filter for session-oriented, event-driven filter
//! chains: drives a pluggable decoder against inbound byte buffers and a pluggable
//! encoder against outbound application messages, handling partial frames, decode
//! error recovery, and mid-stream worker reassignment.

pub mod buffer;
pub mod codec;
pub mod decoder_output;
pub mod encoder_output;
pub mod error;
pub mod factory;
pub mod filter;
pub mod next_filter;
pub mod session;
pub mod test_support;

pub use buffer::{ByteBuffer, FileRegion, HexDump};
pub use codec::{Decoder, Encoder};
pub use decoder_output::{DecoderOutput, DecoderOutputGuard};
pub use encoder_output::EncoderOutput;
pub use error::{DecoderError, EncoderError, FilterError, IllegalUsage};
pub use factory::{ClosureFactory, CodecFactory, FixedPairFactory, TypePairFactory};
pub use filter::CodecFilter;
pub use next_filter::{Message, NextFilter, WriteFuture, WriteRequest};
pub use session::{Session, SessionId, WorkerToken};
