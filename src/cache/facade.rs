//! # Cache Facade
//!
//! `UserModeCache` owns every resource behind the frontend: the shutdown
//! eventfd, the userfaultfd channel, the anonymous frontend reservation,
//! and the handler thread. Construction acquires them in dependency order
//! with RAII owners, so a failure at any step rolls the earlier ones back
//! as the error propagates; destruction releases them in reverse.
//!
//! ## Failure Model
//!
//! Argument errors are programmer errors and panic. OS resource failures
//! put the facade into a failed state instead: `is_ready()` returns false
//! and `frontend()` returns null. No error type crosses the public API.

use std::ffi::c_void;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use eyre::{Result, WrapErr};
use log::{debug, error};
use memmap2::{MmapMut, MmapOptions};
use userfaultfd::{Uffd, UffdBuilder};

use super::engine::CacheEngine;
use super::geometry::CacheGeometry;
use super::handler;
use crate::config::MAX_BACKEND_PAGES;
use crate::sys::{self, EventFd};

/// A page-granular, direct-mapped, write-back cache over a caller-supplied
/// backend memory region.
///
/// The frontend returned by [`frontend`](Self::frontend) behaves as
/// ordinary memory of the backend's size. Page faults on it are serviced
/// transparently by a dedicated handler thread; at most
/// `cache_size / page_size` frontend pages are populated at any moment.
///
/// Dropping the cache signals the handler, joins it, and releases all OS
/// resources. Pages still resident at that point are NOT written back to
/// the backend; callers that need the backend fully current must force
/// eviction first. Callers must also have quiesced: a frontend access that
/// faults after shutdown blocks forever.
pub struct UserModeCache {
    inner: Option<CacheInner>,
}

struct CacheInner {
    frontend_base: usize,
    backend_size: usize,
    handler: Option<JoinHandle<()>>,
    shutdown: Arc<EventFd>,
    // Closed after the handler has been joined (the thread holds the other
    // reference), satisfying the teardown order: signal, join, close.
    _channel: Arc<Uffd>,
    // Keeps the frontend reservation alive for the cache's lifetime; the
    // pages inside it are mutated only by the handler thread.
    _frontend: MmapMut,
}

impl UserModeCache {
    /// Builds the cache and spawns its fault handler.
    ///
    /// `cache_size` is the in-memory cache capacity in bytes and must be a
    /// positive power-of-two multiple of the page size. `backend` points to
    /// caller-owned storage of `backend_size` bytes (a multiple of the page
    /// size, at least `cache_size`), page-aligned.
    ///
    /// Violating any of those preconditions panics. OS-level failures do
    /// not: they leave the facade in the failed state, observable through
    /// [`is_ready`](Self::is_ready).
    ///
    /// # Safety
    ///
    /// `backend` must be valid for reads and writes of `backend_size` bytes
    /// for the cache's whole lifetime, and must not be accessed directly by
    /// the caller while the cache is live (the handler copies pages in and
    /// out of it from its own thread).
    pub unsafe fn new(cache_size: usize, backend: *mut u8, backend_size: usize) -> Self {
        let page_size = sys::page_size();

        assert!(cache_size > 0, "cache size must be positive");
        assert!(
            cache_size % page_size == 0,
            "cache size {cache_size} is not a multiple of the page size {page_size}"
        );
        assert!(
            cache_size.is_power_of_two(),
            "cache size {cache_size} must be a power of two"
        );
        assert!(
            backend_size >= cache_size,
            "backend size {backend_size} is smaller than the cache size {cache_size}"
        );
        assert!(
            backend_size % page_size == 0,
            "backend size {backend_size} is not a multiple of the page size {page_size}"
        );
        assert!(!backend.is_null(), "backend pointer must be non-null");
        assert!(
            backend as usize % page_size == 0,
            "backend pointer {backend:p} is not page-aligned"
        );
        assert!(
            backend_size / page_size <= MAX_BACKEND_PAGES,
            "backend page count does not fit in a tag word"
        );

        match CacheInner::build(page_size, cache_size, backend as usize, backend_size) {
            Ok(inner) => Self { inner: Some(inner) },
            Err(err) => {
                error!("cache construction failed: {err:#}");
                Self { inner: None }
            }
        }
    }

    /// True iff construction fully succeeded and the fault channel is live.
    pub fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    /// Base of the frontend range: `backend_size` bytes of caller-accessible
    /// memory. Null in the failed state.
    pub fn frontend(&self) -> *mut u8 {
        self.inner
            .as_ref()
            .map_or(std::ptr::null_mut(), |inner| inner.frontend_base as *mut u8)
    }

    /// Size in bytes of the frontend (and of the backend it mirrors).
    /// Zero in the failed state.
    pub fn backend_size(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.backend_size)
    }
}

impl Drop for UserModeCache {
    fn drop(&mut self) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };

        if let Some(handle) = inner.handler.take() {
            inner.shutdown.put();
            if handle.join().is_err() {
                error!("fault handler thread panicked during shutdown");
            }
        }
        // Remaining owners (channel, frontend mapping, eventfd) release
        // with the struct.
    }
}

impl std::fmt::Debug for UserModeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserModeCache")
            .field("ready", &self.is_ready())
            .field("frontend", &self.frontend())
            .field("backend_size", &self.backend_size())
            .finish()
    }
}

impl CacheInner {
    fn build(
        page_size: usize,
        cache_size: usize,
        backend_base: usize,
        backend_size: usize,
    ) -> Result<Self> {
        let shutdown =
            Arc::new(EventFd::new().wrap_err("shutdown signal creation failed")?);

        let channel = {
            let mut builder = UffdBuilder::new();
            builder
                .close_on_exec(true)
                .non_blocking(true)
                .user_mode_only(true);
            match builder.create() {
                Ok(channel) => channel,
                // Kernels before 5.11 reject UFFD_USER_MODE_ONLY outright;
                // retry unrestricted rather than refusing to run there.
                Err(_) => {
                    builder.user_mode_only(false);
                    builder.create().wrap_err("userfaultfd creation failed")?
                }
            }
        };
        let channel = Arc::new(channel);

        let mut frontend = MmapOptions::new()
            .len(backend_size)
            .map_anon()
            .wrap_err("frontend reservation failed")?;
        let frontend_base = frontend.as_mut_ptr() as usize;

        channel
            .register(frontend_base as *mut c_void, backend_size)
            .wrap_err("frontend fault registration failed")?;

        let geometry = CacheGeometry::new(page_size, cache_size, backend_size);
        let mut engine = CacheEngine::new(geometry, frontend_base, backend_base)?;

        let thread_channel = Arc::clone(&channel);
        let thread_shutdown = Arc::clone(&shutdown);
        let handler = thread::Builder::new()
            .name("umcache-fault".into())
            .spawn(move || handler::run(&thread_channel, &thread_shutdown, &mut engine))
            .wrap_err("fault handler spawn failed")?;

        debug!(
            "cache ready: {} line(s) of {} bytes over {} backend pages at {frontend_base:#x}",
            geometry.num_lines(),
            page_size,
            geometry.backend_pages()
        );

        Ok(Self {
            frontend_base,
            backend_size,
            handler: Some(handler),
            shutdown,
            _channel: channel,
            _frontend: frontend,
        })
    }
}
