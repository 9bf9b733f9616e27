//! # umcache - User-Mode Demand-Paged Cache
//!
//! umcache exposes a caller-supplied "backend" memory region through a
//! same-sized contiguous "frontend" virtual range. Reads and writes through
//! the frontend transparently pull pages into a smaller direct-mapped cache;
//! when a cache slot must host a different backend page, the previous tenant
//! is written back to the backend first.
//!
//! The mechanism is a user-space page-fault handler built on Linux
//! `userfaultfd(2)`: the frontend starts fully unmapped, every first touch of
//! a page traps into a dedicated handler thread, and the handler resolves the
//! fault by copying the backend page in and waking the blocked access.
//!
//! ## Quick Start
//!
//! ```ignore
//! use umcache::UserModeCache;
//!
//! // SAFETY: backend is page-aligned, lives longer than the cache, and is
//! // not touched directly while the cache is live.
//! let cache = unsafe { UserModeCache::new(4 * page, backend_ptr, 16 * page) };
//! assert!(cache.is_ready());
//!
//! let frontend = cache.frontend();
//! // ordinary loads and stores; faults are serviced transparently
//! unsafe { frontend.write(42) };
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller thread                         handler thread
//! ─────────────                         ──────────────
//! load/store frontend ──page fault──▶ userfaultfd ──▶ poll()
//!        │                                              │
//!        │ (blocked by kernel)            evict slot tenant (write back,
//!        │                                remap page, re-register)
//!        │                                              │
//!        │                                copy backend page → scratch
//!        │                                              │
//!        ◀───────────── UFFDIO_COPY + wake ─────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`cache`]: direct-mapped geometry, tag table, fault-service engine,
//!   handler loop, and the [`UserModeCache`] facade
//! - [`sys`]: eventfd shutdown signal, `poll(2)` wait, fixed-address
//!   anonymous remapping
//! - [`config`]: tag-word encoding constants
//!
//! ## Threading Model
//!
//! Exactly one handler thread services faults sequentially. All mutable
//! cache state (tag table, scratch page) is moved into that thread at
//! construction, so no locks exist anywhere in the crate: ownership is the
//! synchronization.
//!
//! ## Caveats
//!
//! - Linux only. The crate refuses to compile elsewhere.
//! - Pages still resident in the cache are not written back at drop;
//!   callers that need the backend fully current must force eviction by
//!   touching enough distinct pages first.
//! - Callers must quiesce (no in-flight frontend accesses) before dropping
//!   the cache; a fault raised after shutdown is never serviced.

#[cfg(not(target_os = "linux"))]
compile_error!("umcache requires Linux (userfaultfd, eventfd)");

pub mod cache;
pub mod config;
pub mod sys;

pub use cache::UserModeCache;
