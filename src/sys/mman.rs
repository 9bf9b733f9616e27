//! # Page Mapping Helpers
//!
//! Raw `mmap`/`munmap` plumbing for the one mapping operation the cache
//! performs outside of `memmap2`: restoring an evicted frontend page to the
//! unmapped-but-reserved state at its original address. `memmap2` owns the
//! frontend region as a whole; this module mutates single pages inside it,
//! the same split the storage layer uses for `madvise` hints inside a
//! mapped file.

use std::io;

use eyre::{ensure, Result};

/// Returns the system page size.
pub fn page_size() -> usize {
    // SAFETY: sysconf is always safe to call; _SC_PAGESIZE cannot fail on
    // any supported system.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Replaces `[addr, addr + len)` with a fresh anonymous private mapping at
/// the same address.
///
/// Used after an eviction write-back: the populated frontend page is torn
/// down and an empty mapping is put back in its place so the contiguous
/// frontend address space survives and the next access faults again. The
/// new mapping carries no userfaultfd registration; the caller must
/// re-register it.
///
/// # Safety
///
/// `addr` must be page-aligned and `[addr, addr + len)` must lie inside a
/// mapping this process owns and no other code is concurrently accessing.
/// On failure of the second step the range is left unmapped; a stray access
/// would then fault fatally rather than corrupt memory.
pub unsafe fn remap_anon_fixed(addr: *mut u8, len: usize) -> Result<()> {
    let ret = libc::munmap(addr as *mut libc::c_void, len);
    ensure!(
        ret == 0,
        "munmap of {:p} ({} bytes) failed: {}",
        addr,
        len,
        io::Error::last_os_error()
    );

    let mapped = libc::mmap(
        addr as *mut libc::c_void,
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
        -1,
        0,
    );
    ensure!(
        mapped != libc::MAP_FAILED,
        "anonymous MAP_FIXED remap at {:p} ({} bytes) failed: {}",
        addr,
        len,
        io::Error::last_os_error()
    );

    Ok(())
}
