//! `CodecFactory` and its three construction modes (§2.1, §6, Design Notes §9).
//!
//! The reflective "type identifier with zero-arg constructor" mode from the source is
//! expressed on stable Rust as a `Default`-bounded type pair — the compiler enforces
//! the type-compatibility check the original ran at runtime.

use std::marker::PhantomData;

use crate::codec::{Decoder, Encoder};
use crate::session::Session;

/// Resolves, per session, the `(encoder, decoder)` pair a `CodecFilter` should use.
pub trait CodecFactory: Send + Sync {
    fn encoder(&self, session: &dyn Session) -> Box<dyn Encoder>;
    fn decoder(&self, session: &dyn Session) -> Box<dyn Decoder>;
}

/// Mode (a): an externally supplied factory built from two closures.
pub struct ClosureFactory<EF, DF> {
    encoder_fn: EF,
    decoder_fn: DF,
}

impl<EF, DF> ClosureFactory<EF, DF>
where
    EF: Fn(&dyn Session) -> Box<dyn Encoder> + Send + Sync,
    DF: Fn(&dyn Session) -> Box<dyn Decoder> + Send + Sync,
{
    pub fn new(encoder_fn: EF, decoder_fn: DF) -> ClosureFactory<EF, DF> {
        ClosureFactory { encoder_fn, decoder_fn }
    }
}

impl<EF, DF> CodecFactory for ClosureFactory<EF, DF>
where
    EF: Fn(&dyn Session) -> Box<dyn Encoder> + Send + Sync,
    DF: Fn(&dyn Session) -> Box<dyn Decoder> + Send + Sync,
{
    fn encoder(&self, session: &dyn Session) -> Box<dyn Encoder> {
        (self.encoder_fn)(session)
    }

    fn decoder(&self, session: &dyn Session) -> Box<dyn Decoder> {
        (self.decoder_fn)(session)
    }
}

/// Mode (b): a fixed encoder/decoder pair, cloned into a fresh instance per session.
/// This is the Rust analogue of "sharing one instance across all sessions" — the
/// shared part is the codec's *logic and configuration* (the prototype), while each
/// session still gets its own mutable state, preserving the "exclusively owned by one
/// session" invariant (§3) that a literal shared `&mut` instance could not.
pub struct FixedPairFactory<D, E> {
    decoder_prototype: D,
    encoder_prototype: E,
}

impl<D, E> FixedPairFactory<D, E>
where
    D: Decoder + Clone + 'static,
    E: Encoder + Clone + 'static,
{
    pub fn new(decoder_prototype: D, encoder_prototype: E) -> FixedPairFactory<D, E> {
        FixedPairFactory { decoder_prototype, encoder_prototype }
    }
}

impl<D, E> CodecFactory for FixedPairFactory<D, E>
where
    D: Decoder + Clone + 'static,
    E: Encoder + Clone + 'static,
{
    fn encoder(&self, _session: &dyn Session) -> Box<dyn Encoder> {
        Box::new(self.encoder_prototype.clone())
    }

    fn decoder(&self, _session: &dyn Session) -> Box<dyn Decoder> {
        Box::new(self.decoder_prototype.clone())
    }
}

/// Mode (c): a pair of codec *types*, instantiated per session via `Default`. Stands
/// in for the source's reflective "type identifier with zero-arg constructor and
/// compile-time type-compatibility check" — here the check is the `Decoder +
/// Default` / `Encoder + Default` bound itself, enforced at the call site.
pub struct TypePairFactory<D, E> {
    _marker: PhantomData<fn() -> (D, E)>,
}

impl<D, E> TypePairFactory<D, E>
where
    D: Decoder + Default + 'static,
    E: Encoder + Default + 'static,
{
    pub fn new() -> TypePairFactory<D, E> {
        TypePairFactory { _marker: PhantomData }
    }
}

impl<D, E> Default for TypePairFactory<D, E>
where
    D: Decoder + Default + 'static,
    E: Encoder + Default + 'static,
{
    fn default() -> Self {
        TypePairFactory::new()
    }
}

impl<D, E> CodecFactory for TypePairFactory<D, E>
where
    D: Decoder + Default + 'static,
    E: Encoder + Default + 'static,
{
    fn encoder(&self, _session: &dyn Session) -> Box<dyn Encoder> {
        Box::new(E::default())
    }

    fn decoder(&self, _session: &dyn Session) -> Box<dyn Decoder> {
        Box::new(D::default())
    }
}
