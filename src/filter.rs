//! `CodecFilter`: the event handler wired into the filter chain (§4).
//!
//! Per-session codec state is a direct translation of the source's attribute-keyed
//! approach (Design Notes §9): rather than stashing into the generic session
//! attribute bag, the filter owns its own `SessionId -> CodecState` map, so multiple
//! `CodecFilter` instances can coexist on the same chain without colliding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::buffer::DEFAULT_HEX_DUMP_CAP;
use crate::decoder_output::DecoderOutput;
use crate::encoder_output::EncoderOutput;
use crate::error::{EncoderError, FilterError, IllegalUsage};
use crate::factory::CodecFactory;
use crate::next_filter::{Message, NextFilter, WriteRequest};
use crate::session::{Session, SessionId};

struct CodecState {
    decoder: Box<dyn crate::codec::Decoder>,
    encoder: Box<dyn crate::codec::Encoder>,
    decoder_output: DecoderOutput,
    encoder_output: EncoderOutput,
}

type StateHandle = Arc<Mutex<CodecState>>;

/// Translates between raw byte buffers and application messages for every session it
/// is added to, driving a per-session decoder on the inbound path and a per-session
/// encoder on the outbound path.
pub struct CodecFilter {
    factory: Box<dyn CodecFactory>,
    states: Mutex<HashMap<SessionId, StateHandle>>,
    hex_dump_cap: usize,
}

impl CodecFilter {
    pub fn new<F: CodecFactory + 'static>(factory: F) -> CodecFilter {
        CodecFilter {
            factory: Box::new(factory),
            states: Mutex::new(HashMap::new()),
            hex_dump_cap: DEFAULT_HEX_DUMP_CAP,
        }
    }

    /// Overrides the byte cap applied to hex-dumps attached to decode errors.
    pub fn with_hex_dump_cap(mut self, cap: usize) -> CodecFilter {
        self.hex_dump_cap = cap;
        self
    }

    fn state_for(&self, id: SessionId) -> Option<StateHandle> {
        self.states.lock().expect("codec filter state lock poisoned").get(&id).cloned()
    }

    /// §4.1 onAdd. Fails if this filter instance already has state for the session.
    pub fn on_add(&self, session: &dyn Session) -> Result<(), IllegalUsage> {
        let mut states = self.states.lock().expect("codec filter state lock poisoned");
        if states.contains_key(&session.id()) {
            return Err(IllegalUsage::DuplicateFilterAdd);
        }

        let decoder = self.factory.decoder(session);
        let encoder = self.factory.encoder(session);
        states.insert(
            session.id(),
            Arc::new(Mutex::new(CodecState {
                decoder,
                encoder,
                decoder_output: DecoderOutput::new(),
                encoder_output: EncoderOutput::new(),
            })),
        );
        log::debug!("codec filter added to session {}", session.id());
        Ok(())
    }

    /// §4.1 onRemove. Disposal failures are isolated — logged, not propagated.
    pub fn on_remove(&self, session: &dyn Session) {
        let removed = self.states.lock().expect("codec filter state lock poisoned").remove(&session.id());
        if let Some(handle) = removed {
            let mut state = handle.lock().expect("codec state lock poisoned");
            if let Err(e) = state.decoder.dispose(session) {
                log::warn!("decoder dispose failed for session {}: {}", session.id(), e);
            }
            if let Err(e) = state.encoder.dispose(session) {
                log::warn!("encoder dispose failed for session {}: {}", session.id(), e);
            }
            log::debug!("codec filter removed from session {}", session.id());
        }
    }

    /// §4.2 messageReceived: the decode loop.
    pub fn message_received(&self, session: &dyn Session, next: &dyn NextFilter, message: Message) {
        let mut buffer = match message {
            Message::Bytes(buf) => buf,
            other => {
                next.message_received(session, other);
                return;
            }
        };

        let handle = match self.state_for(session.id()) {
            Some(handle) => handle,
            None => {
                log::error!("messageReceived for session {} with no codec state installed", session.id());
                next.message_received(session, Message::Bytes(buffer));
                return;
            }
        };
        let mut state = handle.lock().expect("codec state lock poisoned");
        let state = &mut *state;

        let io_thread = session.worker_token();

        while buffer.has_remaining() {
            if session.worker_token() != io_thread {
                log::trace!("session {} realigned mid-decode, yielding", session.id());
                break;
            }

            let old_pos = buffer.position();

            let decode_result = {
                let mut guard = state.decoder_output.lock();
                let result = state.decoder.decode(session, &mut buffer, &mut guard);
                guard.flush(next, session);
                result
            };

            let mut err = match decode_result {
                Ok(()) => {
                    // No error, but also no progress: the decoder has inspected what's
                    // available and is waiting on more bytes for a full frame. Without
                    // this check the loop would spin forever on the same partial frame.
                    if buffer.position() == old_pos {
                        break;
                    }
                    continue;
                }
                Err(err) => err,
            };

            if !err.has_hex_dump() {
                let dump = buffer.hex_dump_from_capped(old_pos, self.hex_dump_cap);
                err.set_hex_dump_if_absent(dump);
            }
            state.decoder_output.lock().flush(next, session);

            let recoverable = err.is_recoverable();
            let progressed = buffer.position() != old_pos;
            next.exception_caught(session, FilterError::Decode(err));

            if recoverable && progressed {
                continue;
            }
            break;
        }
    }

    /// §4.3 messageSent: drains decoded messages parked while the session had no
    /// registered worker, once the registration sentinel arrives.
    pub fn message_sent(&self, session: &dyn Session, next: &dyn NextFilter, request: &WriteRequest) {
        if request.is_registered_sentinel() {
            if let Some(handle) = self.state_for(session.id()) {
                let state = handle.lock().expect("codec state lock poisoned");
                state.decoder_output.lock().flush(next, session);
            }
        }
        next.message_sent(session, request);
    }

    /// §4.4 filterWrite: encode-then-forward, or bypass for already-encoded payloads.
    pub fn filter_write(
        &self,
        session: &dyn Session,
        next: &dyn NextFilter,
        request: WriteRequest,
    ) -> Result<(), EncoderError> {
        let (message, future) = match request {
            WriteRequest::Registered => {
                next.filter_write(session, WriteRequest::Registered);
                return Ok(());
            }
            WriteRequest::Write { message, future } => (message, future),
        };

        if message.bypasses_codec() {
            next.filter_write(session, WriteRequest::Write { message, future });
            return Ok(());
        }

        let app = match message {
            Message::Application(app) => app,
            Message::Bytes(_) | Message::File(_) => unreachable!("bypass handled above"),
        };

        let handle = self.state_for(session.id()).ok_or_else(|| {
            EncoderError::fatal(format!(
                "filterWrite for session {} with no codec state installed",
                session.id()
            ))
        })?;
        let mut state = handle.lock().expect("codec state lock poisoned");
        let state = &mut *state;

        state.encoder.encode(session, app, &state.encoder_output)?;

        match state.encoder_output.take() {
            Some(encoded) => {
                next.filter_write(session, WriteRequest::Write { message: Message::Bytes(encoded), future });
            }
            None => {
                log::trace!("encoder for session {} elided output", session.id());
                future.set_written();
            }
        }
        Ok(())
    }

    /// §4.5 sessionClosed: finishDecode, isolated dispose, final flush, forward.
    pub fn session_closed(&self, session: &dyn Session, next: &dyn NextFilter) {
        let removed = self.states.lock().expect("codec filter state lock poisoned").remove(&session.id());
        if let Some(handle) = removed {
            let mut state = handle.lock().expect("codec state lock poisoned");
            let state = &mut *state;

            let finish_result = {
                let mut guard = state.decoder_output.lock();
                state.decoder.finish_decode(session, &mut guard)
            };
            if let Err(err) = finish_result {
                next.exception_caught(session, FilterError::Decode(err));
            }

            if let Err(e) = state.decoder.dispose(session) {
                log::warn!("decoder dispose failed for session {}: {}", session.id(), e);
            }
            if let Err(e) = state.encoder.dispose(session) {
                log::warn!("encoder dispose failed for session {}: {}", session.id(), e);
            }

            state.decoder_output.lock().flush(next, session);
        }
        next.session_closed(session);
    }
}
