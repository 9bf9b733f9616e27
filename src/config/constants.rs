//! # Tag-Word Encoding Constants
//!
//! Each cache slot is described by a single machine word. The most
//! significant bit records whether the slot is occupied; the remaining
//! `usize::BITS - 1` bits hold the backend page index of the occupant.
//!
//! ```text
//! bit 63 (on 64-bit)    bits 62..0
//! ┌────────────────┬──────────────────────────┐
//! │   TAG_VALID    │   backend page index     │
//! └────────────────┴──────────────────────────┘
//! ```
//!
//! An all-zero word means "empty", which lets the tag table start as plain
//! zeroed storage. 63 payload bits index far more backend pages than any
//! address space can hold, so the encoding never saturates in practice;
//! construction still checks the backend page count against
//! [`MAX_BACKEND_PAGES`].

/// Validity bit of a tag word. Set iff the slot holds a backend page.
pub const TAG_VALID: usize = 1 << (usize::BITS - 1);

/// Payload bits of a tag word: the backend page index of the occupant.
pub const TAG_PAGE_MASK: usize = TAG_VALID - 1;

/// Largest backend page index representable in a tag word.
pub const MAX_BACKEND_PAGES: usize = TAG_PAGE_MASK;

const _: () = assert!(
    TAG_VALID & TAG_PAGE_MASK == 0,
    "validity bit must not overlap the page-index payload"
);

const _: () = assert!(
    TAG_VALID | TAG_PAGE_MASK == usize::MAX,
    "validity bit and payload together must cover the whole tag word"
);
