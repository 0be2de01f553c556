//! Bit-level wire primitives shared by every command encoder.
//!
//! The firmware packs several narrow values into shared words and stores
//! multi-byte fields little-endian. MAC addresses are the one special case:
//! the six address bytes travel in reverse order relative to their canonical
//! most-significant-first representation.

use crate::types::MacAddr;

/// Highest valid interface index is `MAX_IF - 1`.
pub const MAX_IF: u16 = 64;

/// Number of 64-bit words reserved for an interface bitmap in a command
/// buffer. The parameter region reserves four words regardless of `MAX_IF`,
/// so only word 0 can currently be non-zero.
pub const IF_BITMAP_WORDS: usize = 4;

/// Writes `value` into `word` at bit `offset`, occupying `width` bits.
/// Bits outside the field are left untouched.
///
/// `value` is masked to `width` bits; an oversized value is silently
/// truncated. Callers own range validation — the firmware performs none
/// either, so a width violation here is a caller bug, not a recoverable
/// condition.
#[inline]
pub fn pack_field(word: u64, offset: u32, width: u32, value: u64) -> u64 {
    let mask = field_mask(offset, width);
    (word & !mask) | ((value << offset) & mask)
}

/// Extracts the `width`-bit field at bit `offset` from `word`.
#[inline]
pub fn unpack_field(word: u64, offset: u32, width: u32) -> u64 {
    (word & field_mask(offset, width)) >> offset
}

#[inline]
fn field_mask(offset: u32, width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        ((1u64 << width) - 1) << offset
    }
}

/// Serializes a MAC address into its wire order (least-significant byte
/// first).
#[inline]
pub fn mac_to_wire(mac: &MacAddr) -> [u8; 6] {
    let octets = mac.octets();
    let mut wire = [0u8; 6];
    for i in 0..6 {
        wire[i] = octets[5 - i];
    }
    wire
}

/// Restores a MAC address from its wire order.
#[inline]
pub fn mac_from_wire(wire: &[u8]) -> MacAddr {
    let mut octets = [0u8; 6];
    for i in 0..6 {
        octets[i] = wire[5 - i];
    }
    MacAddr::new(octets)
}

/// Builds the interface bitmap used by bulk VLAN/FDB/ACL membership
/// commands.
///
/// Bit `i % 64` of word `i / 64` is set for every index `i` among the first
/// `min(num_ifs, if_ids.len())` entries with `i < MAX_IF`. Out-of-range
/// indices are dropped without error; the firmware tolerates oversized lists
/// the same way.
pub fn build_if_id_bitmap(if_ids: &[u16], num_ifs: usize) -> [u64; IF_BITMAP_WORDS] {
    let mut bitmap = [0u64; IF_BITMAP_WORDS];
    for &if_id in if_ids.iter().take(num_ifs) {
        if if_id < MAX_IF {
            bitmap[usize::from(if_id) / 64] |= 1u64 << (if_id % 64);
        }
    }
    bitmap
}
