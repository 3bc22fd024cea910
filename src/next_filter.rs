//! The downstream filter-chain view (`NextFilter`), the unit of work it forwards
//! (`WriteRequest`), and the completion signal attached to writes (`WriteFuture`).
//!
//! The filter chain itself, and how events actually propagate between filters, are
//! external collaborators (§1 Non-goals) — this module only defines the surface the
//! codec filter calls into and a recording test double.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};

use crate::buffer::{ByteBuffer, FileRegion};
use crate::error::FilterError;
use crate::session::Session;

/// An application-level message, either still undecoded/unencoded bytes, a raw file
/// region that bypasses the codec entirely, or a decoded/to-be-encoded application
/// object of a type only the caller and the codec agree on.
pub enum Message {
    Bytes(ByteBuffer),
    File(FileRegion),
    Application(Box<dyn Any + Send>),
}

impl Message {
    /// Application messages bypass the codec only when they already are wire bytes
    /// or a file region (§3 invariants, §4.4 step 1).
    #[inline]
    pub fn bypasses_codec(&self) -> bool {
        matches!(self, Message::Bytes(_) | Message::File(_))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Bytes(_) => write!(f, "Message::Bytes"),
            Message::File(_) => write!(f, "Message::File"),
            Message::Application(_) => write!(f, "Message::Application"),
        }
    }
}

struct WriteFutureState {
    written: Mutex<bool>,
    condvar: Condvar,
}

/// A one-shot, settable-once completion signal for a write, backed by a mutex and
/// condvar rather than any async runtime — the core never awaits anything itself
/// (§5), so a synchronous signal is all a caller (or test) needs.
#[derive(Clone)]
pub struct WriteFuture(Arc<WriteFutureState>);

impl WriteFuture {
    pub fn new() -> WriteFuture {
        WriteFuture(Arc::new(WriteFutureState {
            written: Mutex::new(false),
            condvar: Condvar::new(),
        }))
    }

    /// Marks the write as complete, waking any waiter.
    pub fn set_written(&self) {
        let mut written = self.0.written.lock().expect("write future lock poisoned");
        *written = true;
        self.0.condvar.notify_all();
    }

    /// Blocks until `set_written` has been called.
    pub fn await_uninterruptibly(&self) {
        let mut written = self.0.written.lock().expect("write future lock poisoned");
        while !*written {
            written = self.0.condvar.wait(written).expect("write future lock poisoned");
        }
    }

    #[inline]
    pub fn is_written(&self) -> bool {
        *self.0.written.lock().expect("write future lock poisoned")
    }
}

impl Default for WriteFuture {
    fn default() -> Self {
        WriteFuture::new()
    }
}

/// The unit of work dispatched down the outbound path. `Registered` is the
/// distinguished sentinel of §4.3/§6, signalling that the session's worker has just
/// been (re)registered; it carries no message or future of its own.
pub enum WriteRequest {
    Write { message: Message, future: WriteFuture },
    Registered,
}

impl WriteRequest {
    pub fn new(message: Message, future: WriteFuture) -> WriteRequest {
        WriteRequest::Write { message, future }
    }

    /// The distinguished *worker-registered* sentinel (§4.3).
    #[inline]
    pub fn registered_sentinel() -> WriteRequest {
        WriteRequest::Registered
    }

    #[inline]
    pub fn is_registered_sentinel(&self) -> bool {
        matches!(self, WriteRequest::Registered)
    }

    /// The current message. `None` for the registration sentinel.
    pub fn message(&self) -> Option<&Message> {
        match self {
            WriteRequest::Write { message, .. } => Some(message),
            WriteRequest::Registered => None,
        }
    }

    /// Overwrites the request's message in place, as the encoder path does when it
    /// substitutes the encoded payload for the original application object (§4.4).
    ///
    /// # Panics
    /// Panics if called on the registration sentinel, which carries no message slot.
    pub fn set_message(&mut self, new_message: Message) {
        match self {
            WriteRequest::Write { message, .. } => *message = new_message,
            WriteRequest::Registered => panic!("cannot set a message on the registered sentinel"),
        }
    }

    /// The completion future. `None` for the registration sentinel.
    pub fn future(&self) -> Option<&WriteFuture> {
        match self {
            WriteRequest::Write { future, .. } => Some(future),
            WriteRequest::Registered => None,
        }
    }
}

/// The handler's view of its immediate successor in the filter chain.
pub trait NextFilter {
    fn message_received(&self, session: &dyn Session, message: Message);
    fn message_sent(&self, session: &dyn Session, request: &WriteRequest);
    fn filter_write(&self, session: &dyn Session, request: WriteRequest);
    fn exception_caught(&self, session: &dyn Session, error: FilterError);
    fn session_closed(&self, session: &dyn Session);
}

/// A small test double that records every event it receives, in order, for assertion.
/// Kept as a plain (non-cfg-gated) module, matching the teacher's own hand-rolled
/// `MockChannel`-style doubles, so integration tests under `tests/` can use it too.
pub mod recording {
    use super::*;

    #[derive(Debug)]
    pub enum Event {
        MessageReceived(String),
        MessageSent,
        FilterWrite,
        ExceptionCaught(String),
        SessionClosed,
    }

    #[derive(Default)]
    pub struct RecordingNextFilter {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingNextFilter {
        pub fn new() -> RecordingNextFilter {
            RecordingNextFilter { events: Mutex::new(Vec::new()) }
        }

        pub fn events(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("recording lock poisoned")
                .iter()
                .map(|e| format!("{:?}", e))
                .collect()
        }

        /// Extracts the decoded `String` payloads seen via `message_received`, in order.
        pub fn received_strings(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("recording lock poisoned")
                .iter()
                .filter_map(|e| match e {
                    Event::MessageReceived(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn exception_count(&self) -> usize {
            self.events
                .lock()
                .expect("recording lock poisoned")
                .iter()
                .filter(|e| matches!(e, Event::ExceptionCaught(_)))
                .count()
        }

        pub fn filter_write_count(&self) -> usize {
            self.events
                .lock()
                .expect("recording lock poisoned")
                .iter()
                .filter(|e| matches!(e, Event::FilterWrite))
                .count()
        }
    }

    impl NextFilter for RecordingNextFilter {
        fn message_received(&self, _session: &dyn Session, message: Message) {
            let rendered = match &message {
                Message::Application(app) => match app.downcast_ref::<String>() {
                    Some(s) => s.clone(),
                    None => "<non-string application message>".to_string(),
                },
                Message::Bytes(_) => "<bytes>".to_string(),
                Message::File(_) => "<file>".to_string(),
            };
            self.events.lock().expect("recording lock poisoned").push(Event::MessageReceived(rendered));
        }

        fn message_sent(&self, _session: &dyn Session, _request: &WriteRequest) {
            self.events.lock().expect("recording lock poisoned").push(Event::MessageSent);
        }

        fn filter_write(&self, _session: &dyn Session, request: WriteRequest) {
            self.events.lock().expect("recording lock poisoned").push(Event::FilterWrite);
            if let Some(future) = request.future() {
                future.set_written();
            }
        }

        fn exception_caught(&self, _session: &dyn Session, error: FilterError) {
            self.events
                .lock()
                .expect("recording lock poisoned")
                .push(Event::ExceptionCaught(error.to_string()));
        }

        fn session_closed(&self, _session: &dyn Session) {
            self.events.lock().expect("recording lock poisoned").push(Event::SessionClosed);
        }
    }
}
