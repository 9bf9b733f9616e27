//! # Staging Page
//!
//! A single page-aligned, page-sized heap buffer. Loads bounce through it:
//! backend page → scratch → `UFFDIO_COPY` into the faulting frontend page.
//! Because the handler services faults serially, one scratch page is all
//! the cache storage the algorithm needs.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use eyre::{ensure, Result};

/// An owned page-aligned buffer of exactly one page.
#[derive(Debug)]
pub struct PageBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl PageBuf {
    /// Allocates a zeroed buffer of `page_size` bytes aligned to `page_size`.
    pub fn new(page_size: usize) -> Result<Self> {
        let layout = Layout::from_size_align(page_size, page_size)
            .map_err(|e| eyre::eyre!("invalid scratch page layout: {e}"))?;

        // SAFETY: layout has non-zero size (page_size >= 4096 on every
        // supported system).
        let raw = unsafe { alloc_zeroed(layout) };
        ensure!(
            !raw.is_null(),
            "scratch page allocation of {} bytes failed",
            page_size
        );

        Ok(Self {
            // SAFETY: raw was checked non-null above.
            ptr: unsafe { NonNull::new_unchecked(raw) },
            layout,
        })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for PageBuf {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout and is only
        // freed here.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

// SAFETY: PageBuf is an owned allocation with no shared state; moving it to
// the handler thread transfers exclusive access along with it.
unsafe impl Send for PageBuf {}
