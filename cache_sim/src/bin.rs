/// floor of log2. `log2(0)` and `log2(1)` are both 0.
#[inline]
pub const fn log2(v: u64) -> u32 {
    if v == 0 {
        0
    } else {
        63 - v.leading_zeros()
    }
}

/// mask of the lower `bits` bits. saturates at 64 bits.
#[inline]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// `v >> shift`, yielding 0 once every bit has been shifted out.
#[inline]
pub const fn shr(v: u64, shift: u32) -> u64 {
    if shift >= 64 {
        0
    } else {
        v >> shift
    }
}
