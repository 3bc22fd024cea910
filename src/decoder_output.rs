//! `DecoderOutput`: the per-session sink a decoder writes produced messages into.
//!
//! The mutex is the "exclusive hold" referred to throughout §4: acquiring
//! [`DecoderOutput::lock`] yields a [`DecoderOutputGuard`] and holding it for the
//! duration of a `decode` + `flush` pair is what the spec calls doing both "under
//! exclusive hold of the DecoderOutput" (§4.2c, §4.3, §4.5).

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::next_filter::{Message, NextFilter};
use crate::session::Session;

/// An ordered FIFO queue of messages a decoder has produced for one session, drained
/// to the next filter in enqueue order.
pub struct DecoderOutput {
    queue: Mutex<VecDeque<Box<dyn Any + Send>>>,
}

impl DecoderOutput {
    pub fn new() -> DecoderOutput {
        DecoderOutput { queue: Mutex::new(VecDeque::new()) }
    }

    /// Acquires exclusive access to the queue for the duration of a decode-then-flush
    /// unit of work.
    pub fn lock(&self) -> DecoderOutputGuard<'_> {
        DecoderOutputGuard { queue: self.queue.lock().expect("decoder output lock poisoned") }
    }
}

impl Default for DecoderOutput {
    fn default() -> Self {
        DecoderOutput::new()
    }
}

/// Exclusive access to a `DecoderOutput`'s queue, held across one `decode` call and
/// the `flush` that follows it.
pub struct DecoderOutputGuard<'a> {
    queue: MutexGuard<'a, VecDeque<Box<dyn Any + Send>>>,
}

impl<'a> DecoderOutputGuard<'a> {
    /// Enqueues a decoded message. Called by decoders as they produce output.
    pub fn write<T: Any + Send>(&mut self, value: T) {
        self.queue.push_back(Box::new(value));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drains the queue to `next`, yielding control the moment the session's worker
    /// token changes mid-drain, and returning immediately without draining anything
    /// if the session has no worker registered yet (§4.6).
    pub fn flush(&mut self, next: &dyn NextFilter, session: &dyn Session) {
        if !session.is_worker_registered() {
            return;
        }

        let io_thread = session.worker_token();

        loop {
            if self.queue.is_empty() {
                break;
            }

            if session.worker_token() != io_thread {
                log::trace!("session {} realigned mid-flush, yielding", session.id());
                break;
            }

            // unwrap is safe: the emptiness check above just ran under the same lock.
            let message = self.queue.pop_front().unwrap();
            next.message_received(session, Message::Application(message));
        }
    }
}
