//! # Fault-Service Engine
//!
//! One fault, serviced to completion: map the faulting address onto a cache
//! slot, write the slot's current tenant back to the backend if there is
//! one, stage the requested backend page, and install it at the faulting
//! address with a wake.
//!
//! ## Ownership
//!
//! `CacheEngine` is assembled on the caller thread during construction and
//! then moved into the handler thread, which keeps it for life. Only code
//! running on that thread can reach the tag table or touch the frontend
//! mappings; the move makes the single-writer discipline a property of the
//! type system rather than a convention.
//!
//! ## Error Policy
//!
//! Remap and re-registration failures during eviction are logged and
//! servicing continues: the write-back already happened, and the worst
//! outcome is a page that never faults again. A failed install is returned
//! to the handler loop instead, because the faulting access stays blocked
//! until an install succeeds.

use std::ffi::c_void;
use std::ptr;

use eyre::{Result, WrapErr};
use log::{trace, warn};
use userfaultfd::Uffd;

use super::geometry::CacheGeometry;
use super::scratch::PageBuf;
use super::tags::TagTable;
use crate::sys;

/// The cache data model plus the fault-service algorithm, owned by the
/// handler thread.
#[derive(Debug)]
pub(crate) struct CacheEngine {
    geometry: CacheGeometry,
    tags: TagTable,
    scratch: PageBuf,
    frontend_base: usize,
    backend_base: usize,
}

impl CacheEngine {
    pub fn new(geometry: CacheGeometry, frontend_base: usize, backend_base: usize) -> Result<Self> {
        let tags = TagTable::new(geometry.num_lines());
        let scratch = PageBuf::new(geometry.page_size())?;
        debug_assert_eq!(scratch.len(), geometry.page_size());
        Ok(Self {
            geometry,
            tags,
            scratch,
            frontend_base,
            backend_base,
        })
    }

    /// Services one page fault reported at `fault_addr`, leaving the
    /// faulting access resumed on success.
    pub fn service(&mut self, channel: &Uffd, fault_addr: usize) -> Result<()> {
        let page_size = self.geometry.page_size();
        let aligned_addr = self.geometry.page_align_down(fault_addr);
        let offset = aligned_addr - self.frontend_base;
        let page_index = self.geometry.page_index(offset);
        let slot = self.geometry.slot_index(page_index);

        trace!("pagefault at {fault_addr:#x}: backend page {page_index}, slot {slot}");

        if let Some(stored_page) = self.tags.lookup(slot) {
            debug_assert_eq!(self.geometry.slot_index(stored_page), slot);
            self.evict(channel, stored_page);
        }

        // SAFETY: offset is page-aligned and below backend_size (the fault
        // address lies inside the registered frontend range, which mirrors
        // the backend 1:1), so the source page is within the caller-owned
        // backend; the scratch buffer is exactly page_size bytes.
        unsafe {
            ptr::copy_nonoverlapping(
                (self.backend_base + offset) as *const u8,
                self.scratch.as_mut_ptr(),
                page_size,
            );
        }
        self.tags.store(slot, page_index);

        // SAFETY: scratch holds page_size valid bytes and aligned_addr is a
        // page inside the registered frontend range.
        let copied = unsafe {
            channel.copy(
                self.scratch.as_ptr() as *const c_void,
                aligned_addr as *mut c_void,
                page_size,
                true,
            )
        }
        .wrap_err_with(|| format!("page install at {aligned_addr:#x} failed"))?;
        debug_assert_eq!(copied, page_size);

        Ok(())
    }

    /// Writes the slot's current tenant back to the backend and returns its
    /// frontend page to the fault-on-touch state.
    fn evict(&mut self, channel: &Uffd, stored_page: usize) {
        let page_size = self.geometry.page_size();
        let evict_offset = self.geometry.page_offset(stored_page);
        let frontend_page = (self.frontend_base + evict_offset) as *mut u8;
        let backend_page = (self.backend_base + evict_offset) as *mut u8;

        trace!("evict backend page {stored_page}: write back and remap {frontend_page:p}");

        // SAFETY: the tag is valid, so this frontend page is populated and
        // readable; the backend page at the same offset is caller-owned
        // writable memory. Every store the caller made through the frontend
        // is persisted by this copy.
        unsafe {
            ptr::copy_nonoverlapping(frontend_page as *const u8, backend_page, page_size);
        }

        // SAFETY: frontend_page is a page-aligned page inside the frontend
        // mapping, which only this thread mutates.
        if let Err(err) = unsafe { sys::remap_anon_fixed(frontend_page, page_size) } {
            warn!("evicted page {stored_page} could not be remapped: {err:#}");
            return;
        }

        // The fresh mapping lost its registration together with the old one.
        if let Err(err) = channel.register(frontend_page as *mut c_void, page_size) {
            warn!("evicted page {stored_page} could not be re-registered: {err}");
        }
    }
}
