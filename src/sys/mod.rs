//! # OS Plumbing
//!
//! Thin owners around the Linux primitives the cache is built on. Everything
//! here follows the same discipline: a kernel resource is acquired by a
//! constructor returning `eyre::Result`, held by a type that releases it on
//! drop, and exposed to the rest of the crate through a narrow safe surface.
//!
//! ## Module Organization
//!
//! - [`event`]: `EventFd`, the cross-thread shutdown signal
//! - [`poll`]: the two-descriptor `poll(2)` wait and its disposition
//! - [`mman`]: page size query and fixed-address anonymous remapping
//!
//! The userfaultfd descriptor itself is not wrapped here; the `userfaultfd`
//! crate already provides an owning `Uffd` handle with the ioctl surface the
//! engine needs.

mod event;
mod mman;
mod poll;

pub use event::EventFd;
pub use mman::{page_size, remap_anon_fixed};
pub use poll::{wait_readable, WaitOutcome};
