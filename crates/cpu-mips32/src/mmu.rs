//! Segment-based fixed address mapping.
//!
//! MIPS32 without a TLB translates addresses through a static segment
//! table. Each segment pairs an address range with an access-mode mask;
//! the first segment that contains the address and intersects the
//! caller's mode wins. A miss means the access is not permitted and the
//! CPU raises an address error.

use crate::ram::Ram;

/// A contiguous range of virtual addresses with an access-mode mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub base_address: u32,
    pub limit: u32,
    pub access_flags: u32,
}

impl Segment {
    pub const USER: u32 = 0x01;
    pub const SUPERVISOR: u32 = 0x02;
    pub const KERNEL: u32 = 0x04;
    pub const ALL: u32 = 0x07;

    #[must_use]
    pub const fn new(base_address: u32, limit: u32, access_flags: u32) -> Self {
        Self {
            base_address,
            limit,
            access_flags,
        }
    }

    #[must_use]
    pub fn contains(&self, address: u32) -> bool {
        u64::from(self.base_address) <= u64::from(address)
            && u64::from(address) < u64::from(self.base_address) + u64::from(self.limit)
    }

    #[must_use]
    pub fn has_access(&self, access_flags: u32) -> bool {
        self.access_flags & access_flags != 0
    }
}

/// The fixed-mapping MMU: an ordered segment list, evaluated in order.
#[derive(Debug)]
pub struct Mmu {
    segments: Vec<Segment>,
}

impl Mmu {
    /// The architectural MIPS32 fixed mapping:
    /// useg / kseg0+1 / ksseg / kseg3.
    #[must_use]
    pub fn fixed_mapping() -> Self {
        Self::with_segments(vec![
            Segment::new(0x0000_0000, 0x7FFF_FFFF, Segment::USER),
            Segment::new(0x8000_0000, 0x3FFF_FFFF, Segment::KERNEL),
            Segment::new(0xC000_0000, 0x1FFF_FFFF, Segment::SUPERVISOR),
            Segment::new(0xE000_0000, 0x1FFF_FFFF, Segment::KERNEL),
        ])
    }

    #[must_use]
    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        self.segments = segments;
    }

    /// Translate `address` for a caller running with `access_flags`.
    ///
    /// Returns the backing word on a hit, `None` when no segment grants
    /// the access (the caller raises AdEL/AdES).
    pub fn access<'r>(
        &self,
        ram: &'r mut Ram,
        address: u32,
        access_flags: u32,
    ) -> Option<&'r mut u32> {
        for segment in &self.segments {
            if segment.contains(address) && segment.has_access(access_flags) {
                return Some(ram.word(address));
            }
        }

        None
    }
}
