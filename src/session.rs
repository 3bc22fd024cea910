//! The `Session` capability set consumed by the codec filter (§6).
//!
//! The session itself, its filter chain, and its attribute storage are external
//! collaborators (§1 Non-goals) — this module only defines the interface the filter
//! needs and a small in-memory implementation used by the test suite.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub type SessionId = u64;

/// A portable stand-in for "the thread currently responsible for this session's
/// events". The filter never inspects a real OS thread id; it only compares tokens
/// for equality across iterations of the decode loop (Design Notes §9).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct WorkerToken(pub u64);

/// A boxed attribute value stored in a session's attribute map.
pub type Attribute = Box<dyn Any + Send>;

/// The capability set the codec filter needs from a session. Implemented by the
/// embedding runtime; `InMemorySession` below is a minimal implementation for tests.
pub trait Session {
    fn id(&self) -> SessionId;

    fn is_connected(&self) -> bool;

    /// The worker currently responsible for dispatching this session's events.
    fn worker_token(&self) -> WorkerToken;

    /// True once the session has an I/O worker registered (vs. freshly accepted or
    /// mid-reassignment with no owner yet).
    fn is_worker_registered(&self) -> bool;

    /// True if an attribute is stored under `key`.
    fn has_attribute(&self, key: &str) -> bool;

    /// Runs `visit` with a reference to the stored attribute, if any. Mutex-backed
    /// implementations can't hand out a bare `&Attribute` without risking an
    /// outstanding borrow across a lock release, so access is mediated by a closure.
    fn view_attribute(&self, key: &str, visit: &mut dyn FnMut(&Attribute));

    fn set_attribute(&self, key: &str, value: Attribute);

    fn remove_attribute(&self, key: &str) -> Option<Attribute>;
}

/// A minimal, in-memory `Session` used by tests and as a reference implementation.
/// Attribute storage is a plain mutex-guarded map — adequate for test fixtures, not
/// intended as a production session implementation.
pub struct InMemorySession {
    id: SessionId,
    connected: AtomicBool,
    worker_registered: AtomicBool,
    worker_token: AtomicU64,
    attributes: Mutex<HashMap<String, Attribute>>,
}

impl InMemorySession {
    pub fn new(id: SessionId) -> InMemorySession {
        InMemorySession {
            id,
            connected: AtomicBool::new(true),
            worker_registered: AtomicBool::new(true),
            worker_token: AtomicU64::new(0),
            attributes: Mutex::new(HashMap::new()),
        }
    }

    /// Simulates the runtime reassigning this session to a different worker.
    pub fn realign(&self, token: WorkerToken) {
        self.worker_token.store(token.0, Ordering::SeqCst);
    }

    pub fn set_worker_registered(&self, registered: bool) {
        self.worker_registered.store(registered, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Session for InMemorySession {
    #[inline]
    fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[inline]
    fn worker_token(&self) -> WorkerToken {
        WorkerToken(self.worker_token.load(Ordering::SeqCst))
    }

    #[inline]
    fn is_worker_registered(&self) -> bool {
        self.worker_registered.load(Ordering::SeqCst)
    }

    fn has_attribute(&self, key: &str) -> bool {
        self.attributes.lock().expect("session attribute lock poisoned").contains_key(key)
    }

    fn view_attribute(&self, key: &str, visit: &mut dyn FnMut(&Attribute)) {
        if let Some(value) = self.attributes.lock().expect("session attribute lock poisoned").get(key) {
            visit(value);
        }
    }

    fn set_attribute(&self, key: &str, value: Attribute) {
        self.attributes
            .lock()
            .expect("session attribute lock poisoned")
            .insert(key.to_string(), value);
    }

    fn remove_attribute(&self, key: &str) -> Option<Attribute> {
        self.attributes.lock().expect("session attribute lock poisoned").remove(key)
    }
}
