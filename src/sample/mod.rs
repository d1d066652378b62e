use std::fs::File;
use std::io::{Error, Result};
use std::sync::atomic::AtomicU64;

use arena::Arena;
use rb::Rb;
use tracing::debug;

use crate::ffi::{Metadata, PAGE_SIZE};

mod arena;
mod rb;

pub use rb::Tally;

/// Ring buffer shared with the kernel.
///
/// The first page holds the [metadata][Metadata], the rest is the data
/// area the kernel writes sample records into. Records are only tallied
/// and released, never decoded further.
///
/// The mapping is released when the sampler is dropped.
pub struct Sampler {
    arena: Arena,
}

impl Sampler {
    pub(crate) fn new(perf: &File, exp: u8) -> Result<Self> {
        let Some(len) = 2_usize
            .checked_pow(exp as u32)
            .and_then(|n| n.checked_add(1))
            .and_then(|n| n.checked_mul(*PAGE_SIZE))
        else {
            return Err(Error::other("allocation size overflow"));
        };
        let arena = Arena::new(perf, len, 0)?;
        debug!(len = arena.len(), "mapped ring buffer");

        Ok(Sampler { arena })
    }

    fn metadata_inner(&self) -> *mut Metadata {
        let alloc_ptr = self.arena.as_slice().as_ptr();
        alloc_ptr as *mut Metadata
    }

    /// Tallies the records published since the last call and releases
    /// their space to the kernel.
    pub fn consume(&self) -> Tally {
        let alloc = self.arena.as_slice();
        let metadata = unsafe { &mut *self.metadata_inner() };
        let rb = Rb::new(
            // https://github.com/torvalds/linux/blob/v6.13/kernel/events/core.c#L6212
            &alloc[*PAGE_SIZE..],
            unsafe { AtomicU64::from_ptr(&mut metadata.data_tail as _) },
            unsafe { AtomicU64::from_ptr(&mut metadata.data_head as _) },
        );
        rb.consume()
    }

    /// Size of the data area in bytes.
    pub fn data_len(&self) -> usize {
        self.arena.len() - *PAGE_SIZE
    }
}

// `Arena::ptr` is valid during the lifetime of `Sampler`.
unsafe impl Send for Sampler {}
