//! Layout - storage sizes, alignment, and record field placement

use vela_error::IResult;
use vela_front::{Field, TypeId};

use crate::ltype::TypeLayer;
use crate::registry::{FieldLayout, RecordInfo};

/// Minimum bits to hold `v` as an unsigned value. `v` must be >= 0.
pub fn unsigned_bits(v: i64) -> u32 {
    debug_assert!(v >= 0);
    (64 - (v as u64).leading_zeros()).max(1)
}

/// Minimum bits to hold `v` in two's complement.
pub fn signed_bits(v: i64) -> u32 {
    if v > 0 {
        unsigned_bits(v) + 1
    } else if v == 0 {
        1
    } else {
        65 - (!(v as u64)).leading_zeros()
    }
}

/// Minimum bits to hold every value of `lo..=hi`, unsigned when the
/// whole range is non-negative.
pub fn range_bits(lo: i64, hi: i64) -> u32 {
    debug_assert!(lo <= hi);
    if lo >= 0 {
        unsigned_bits(hi)
    } else {
        signed_bits(lo).max(signed_bits(hi))
    }
}

/// Smallest of 8, 16, 32, 64 bits that holds `lo..=hi`.
pub fn storage_bits(lo: i64, hi: i64) -> u16 {
    match range_bits(lo, hi) {
        0..=8 => 8,
        9..=16 => 16,
        17..=32 => 32,
        _ => 64,
    }
}

/// Natural alignment for a value of `size_bits`: the next power of
/// two, clamped to the 8..=64 range.
pub fn natural_align(size_bits: u64) -> u32 {
    let mut align = 8u32;
    while u64::from(align) < size_bits && align < 64 {
        align *= 2;
    }
    align
}

/// Rounds `bits` up to a multiple of `align_bits`.
pub fn round_up_bits(bits: u64, align_bits: u32) -> u64 {
    let a = u64::from(align_bits);
    bits.div_ceil(a) * a
}

/// Bit width a discrete component occupies inside a packed record:
/// the declared size if the component type carries one, otherwise the
/// minimal width of its range (bias applied first for biased types).
fn packed_field_bits(layer: &TypeLayer<'_>, ty: TypeId, lo: i64, hi: i64) -> u64 {
    let rep = layer.model().rep_of(layer.model().base_type(ty));
    if let Some(size) = rep.size_bits {
        return u64::from(size);
    }
    if rep.biased {
        u64::from(unsigned_bits(hi - lo))
    } else {
        u64::from(range_bits(lo, hi))
    }
}

/// Whether a packed-record component can live in a bit-field. C
/// bit-fields are unsigned here, so only non-negative discrete ranges
/// qualify; everything else falls back to byte alignment.
pub(crate) fn bit_packable(layer: &TypeLayer<'_>, ty: TypeId) -> Option<(i64, i64)> {
    if !layer.model().is_discrete(ty) {
        return None;
    }
    match layer.model().range_of(ty) {
        Some((lo, hi)) if lo >= 0 => Some((lo, hi)),
        _ => None,
    }
}

/// Places every field of a record and computes its total size and
/// alignment. Field types must already be elaborated.
pub fn record_layout(layer: &TypeLayer<'_>, fields: &[Field], packed: bool) -> IResult<RecordInfo> {
    let mut laid = Vec::with_capacity(fields.len());
    let mut next_bit = 0u64;
    let mut max_align = 8u32;

    for field in fields {
        let (offset, width, align) = if packed {
            if let Some((lo, hi)) = bit_packable(layer, field.ty) {
                (next_bit, packed_field_bits(layer, field.ty, lo, hi), 8)
            } else {
                let size = layer.type_size_bits(field.ty)?;
                (round_up_bits(next_bit, 8), size, 8)
            }
        } else {
            let size = layer.type_size_bits(field.ty)?;
            let align = layer.type_align_bits(field.ty);
            (round_up_bits(next_bit, align), size, align)
        };
        laid.push(FieldLayout {
            name: field.name.clone(),
            ty: field.ty,
            bit_offset: offset,
            bit_size: width,
        });
        next_bit = offset + width;
        max_align = max_align.max(align);
    }

    let align_bits = if packed { 8 } else { max_align };
    Ok(RecordInfo {
        fields: laid,
        size_bits: round_up_bits(next_bit, align_bits),
        align_bits,
        packed,
    })
}
