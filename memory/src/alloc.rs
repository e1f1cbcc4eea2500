//! Host-audited allocation accounting.
//!
//! Every piece of dynamic storage whose ownership crosses the host/machine
//! boundary (chunk buffers, display-slot storage) is registered against an
//! [`Alloc`] handle. The host creates one handle, threads it into every
//! constructor, and checks `outstanding() == 0` at teardown.

use std::cell::Cell;
use std::rc::Rc;

/// Cloneable handle over a shared live-block counter.
///
/// The machine is single-threaded by contract, so the counter is a plain
/// `Rc<Cell<_>>` rather than an atomic.
#[derive(Clone, Debug, Default)]
pub struct Alloc {
    live: Rc<Cell<usize>>,
}

impl Alloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audited blocks currently alive. Must be exactly zero once
    /// every owner (assembler, machine, loose buffers) has been dropped.
    pub fn outstanding(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn retain(&self) {
        self.live.set(self.live.get() + 1);
    }

    pub(crate) fn release(&self) {
        let n = self.live.get();
        debug_assert!(n > 0, "release without matching retain");
        self.live.set(n.saturating_sub(1));
    }
}

/// Owned chunk bytes with a deferred release hook.
///
/// Construction transfers ownership of the buffer to the machine side; the
/// hook runs exactly once, when the buffer is dropped. The loader drops a
/// buffer immediately on parse failure and otherwise keeps it inside the
/// loaded image until machine teardown.
pub struct ChunkBuf {
    bytes: Box<[u8]>,
    release: Option<Box<dyn FnOnce()>>,
    alloc: Alloc,
}

impl ChunkBuf {
    pub fn new(alloc: &Alloc, bytes: Vec<u8>, release: impl FnOnce() + 'static) -> Self {
        alloc.retain();
        Self {
            bytes: bytes.into_boxed_slice(),
            release: Some(Box::new(release)),
            alloc: alloc.clone(),
        }
    }

    /// Buffer without a host hook; still audited.
    pub fn without_hook(alloc: &Alloc, bytes: Vec<u8>) -> Self {
        alloc.retain();
        Self {
            bytes: bytes.into_boxed_slice(),
            release: None,
            alloc: alloc.clone(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for ChunkBuf {
    fn drop(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
        self.alloc.release();
    }
}

impl std::fmt::Debug for ChunkBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkBuf")
            .field("len", &self.bytes.len())
            .field("hooked", &self.release.is_some())
            .finish()
    }
}
