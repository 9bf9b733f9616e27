//! # Direct-Mapped Geometry
//!
//! The arithmetic that turns a faulting frontend address into a backend
//! page index and a cache slot. Kept free of any OS state so every identity
//! the fault path relies on can be checked in plain unit tests.
//!
//! All of it hinges on two power-of-two facts the facade enforces at
//! construction: `page_size` is a power of two (so aligning and shifting
//! replace division) and `cache_size` is a power of two (so
//! `page_index & (num_lines - 1)` equals `page_index % num_lines`).

/// Fixed shape of one cache instance: page size, line count, and the shifts
/// and masks derived from them.
#[derive(Debug, Clone, Copy)]
pub struct CacheGeometry {
    page_size: usize,
    page_shift: u32,
    num_lines: usize,
    index_mask: usize,
    backend_size: usize,
}

impl CacheGeometry {
    /// Derives the geometry from validated sizes.
    ///
    /// Callers must have checked that `page_size` and `cache_size` are
    /// powers of two and that both sizes are multiples of `page_size`.
    pub fn new(page_size: usize, cache_size: usize, backend_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        debug_assert!(cache_size.is_power_of_two());
        debug_assert_eq!(cache_size % page_size, 0);
        debug_assert_eq!(backend_size % page_size, 0);

        let num_lines = cache_size / page_size;
        Self {
            page_size,
            page_shift: page_size.trailing_zeros(),
            num_lines,
            index_mask: num_lines - 1,
            backend_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    pub fn backend_size(&self) -> usize {
        self.backend_size
    }

    /// Number of pages in the backend (and in the frontend, which mirrors it).
    pub fn backend_pages(&self) -> usize {
        self.backend_size >> self.page_shift
    }

    /// Rounds an address down to its page boundary.
    pub fn page_align_down(&self, addr: usize) -> usize {
        addr & !(self.page_size - 1)
    }

    /// Backend page index of a byte offset into the frontend. The frontend
    /// and backend are the same size with identical page layout, so the
    /// offset is valid in both.
    pub fn page_index(&self, offset: usize) -> usize {
        offset >> self.page_shift
    }

    /// Cache slot a backend page is direct-mapped to.
    pub fn slot_index(&self, page_index: usize) -> usize {
        page_index & self.index_mask
    }

    /// Byte offset of a backend page within the backend (or frontend).
    pub fn page_offset(&self, page_index: usize) -> usize {
        page_index << self.page_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn test_single_line_maps_every_page_to_slot_zero() {
        let geo = CacheGeometry::new(PAGE, PAGE, 16 * PAGE);

        assert_eq!(geo.num_lines(), 1);
        for page in 0..16 {
            assert_eq!(geo.slot_index(page), 0);
        }
    }

    #[test]
    fn test_equal_sizes_give_every_page_its_own_slot() {
        let geo = CacheGeometry::new(PAGE, 8 * PAGE, 8 * PAGE);

        assert_eq!(geo.num_lines(), 8);
        for page in 0..8 {
            assert_eq!(geo.slot_index(page), page);
        }
    }

    #[test]
    fn test_slot_index_is_page_index_mod_num_lines() {
        let geo = CacheGeometry::new(PAGE, 4 * PAGE, 64 * PAGE);

        for page in 0..64 {
            assert_eq!(geo.slot_index(page), page % 4);
        }
    }

    #[test]
    fn test_page_align_down() {
        let geo = CacheGeometry::new(PAGE, PAGE, 2 * PAGE);

        assert_eq!(geo.page_align_down(0), 0);
        assert_eq!(geo.page_align_down(1), 0);
        assert_eq!(geo.page_align_down(PAGE - 1), 0);
        assert_eq!(geo.page_align_down(PAGE), PAGE);
        assert_eq!(geo.page_align_down(PAGE + 7), PAGE);
    }

    #[test]
    fn test_page_index_and_offset_round_trip() {
        let geo = CacheGeometry::new(PAGE, 2 * PAGE, 16 * PAGE);

        for page in 0..16 {
            let offset = geo.page_offset(page);
            assert_eq!(offset, page * PAGE);
            assert_eq!(geo.page_index(offset), page);
            assert_eq!(geo.page_index(offset + PAGE - 1), page);
        }
    }

    #[test]
    fn test_backend_pages() {
        let geo = CacheGeometry::new(PAGE, 2 * PAGE, 16 * PAGE);
        assert_eq!(geo.backend_pages(), 16);
    }
}
