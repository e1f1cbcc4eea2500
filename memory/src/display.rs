//! Fixed byte strings ("display" values) with two-phase writes.
//!
//! A writer first reserves storage sized exactly to the intended length,
//! then fills the returned view in place. Reads hand back a byte slice
//! valid until the next mutation.

use crate::alloc::Alloc;

pub struct DisplayBuf {
    bytes: Box<[u8]>,
    alloc: Alloc,
}

impl DisplayBuf {
    /// Phase one: allocate exactly `len` zeroed bytes.
    pub fn reserve(alloc: &Alloc, len: usize) -> Self {
        alloc.retain();
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
            alloc: alloc.clone(),
        }
    }

    /// Reserve-and-fill convenience for hosts that already hold the bytes.
    pub fn from_bytes(alloc: &Alloc, src: &[u8]) -> Self {
        let mut buf = Self::reserve(alloc, src.len());
        buf.bytes.copy_from_slice(src);
        buf
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Phase two: the writer fills this view.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for DisplayBuf {
    fn drop(&mut self) {
        self.alloc.release();
    }
}

impl std::fmt::Debug for DisplayBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBuf")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_then_fill_round_trips() {
        let alloc = Alloc::new();
        let mut buf = DisplayBuf::reserve(&alloc, 4);
        buf.as_mut_slice().copy_from_slice(b"abcd");
        assert_eq!(buf.as_bytes(), b"abcd");
        drop(buf);
        assert_eq!(alloc.outstanding(), 0);
    }

    #[test]
    fn zero_length_is_permitted() {
        let alloc = Alloc::new();
        let buf = DisplayBuf::reserve(&alloc, 0);
        assert!(buf.is_empty());
    }
}
