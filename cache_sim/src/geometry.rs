use std::fmt;

use serde::Serialize;

use crate::{
    bin::{log2, low_mask, shr},
    cache::{CacheError, PhysAddr},
};

/// shape of a cache. immutable between resizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Geometry {
    size: u64,
    block_size: u64,
    assoc: u64,
    number_of_sets: u64,
    offset_bits: u32,
    index_bits: u32,
}

impl Geometry {
    /// validates the parameters and derives the address split.
    pub fn new(size: u64, block_size: u64, assoc: u64) -> Result<Self, CacheError> {
        let invalid = CacheError::InvalidGeometry {
            size,
            block_size,
            assoc,
        };
        if !size.is_power_of_two() || !block_size.is_power_of_two() || !assoc.is_power_of_two() {
            return Err(invalid);
        }
        let Some(set_bytes) = block_size.checked_mul(assoc) else {
            return Err(invalid);
        };
        let number_of_sets = size / set_bytes;
        if !number_of_sets.is_power_of_two() {
            return Err(invalid);
        }
        Ok(Self {
            size,
            block_size,
            assoc,
            number_of_sets,
            offset_bits: log2(block_size),
            index_bits: log2(number_of_sets),
        })
    }
    pub fn size(&self) -> u64 {
        self.size
    }
    pub fn block_size(&self) -> u64 {
        self.block_size
    }
    pub fn assoc(&self) -> u64 {
        self.assoc
    }
    pub fn number_of_sets(&self) -> u64 {
        self.number_of_sets
    }
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }
    pub fn tag_shift(&self) -> u32 {
        self.offset_bits + self.index_bits
    }
    /// total number of lines, `number_of_sets * assoc`.
    pub fn num_lines(&self) -> u64 {
        self.number_of_sets * self.assoc
    }
    pub fn tag_of(&self, pa: PhysAddr) -> u64 {
        shr(pa.inner(), self.tag_shift())
    }
    pub fn index_of(&self, pa: PhysAddr) -> u64 {
        shr(pa.inner(), self.offset_bits) & low_mask(self.index_bits)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size: {}, assoc: {}, line-size: {}",
            self.size, self.assoc, self.block_size
        )
    }
}
