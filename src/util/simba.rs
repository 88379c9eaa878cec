use std::fmt::Debug;

use bytemuck::cast;
use simba::simd::{SimdRealField, SimdValue, WideBoolF32x4, WideBoolF32x8, WideF32x4, WideF32x8};
use wide::{f32x4, f32x8, u32x4, u32x8};

use crate::geometry::SimdVector;

/// Lane type usable for both ray packets and triangle blocks.
///
/// Covers the pieces simba doesn't provide: sign bit manipulation, building lane masks
/// from integer bitmasks and a `u32` vector for per-lane ids and visibility masks.
pub trait SimdLanes:
    SimdRealField + SimdValue<Element = f32> + Copy + Debug + Send + Sync + 'static
{
    /// One `u32` per lane.
    type Ints: Copy + Debug + Default + PartialEq + Send + Sync;

    /// Bitmask with one bit set for every lane.
    const ALL_LANES: u64 = super::low_bits(Self::LANES);

    /// Only the sign bit of every lane, as a bit pattern.
    fn sign_bit(self) -> Self;

    /// XORs the bit pattern `sign` into every lane.
    /// With `sign` from [`SimdLanes::sign_bit`] this negates lanes where the sign was set.
    fn flip_sign(self, sign: Self) -> Self;

    /// Lane mask with lane `i` set iff bit `i` of `bits` is set. Bits past `LANES` are ignored.
    fn mask_from_bits(bits: u64) -> Self::SimdBool;

    fn infinity() -> Self;

    fn ints_splat(value: u32) -> Self::Ints;

    fn ints_extract(ints: &Self::Ints, lane: usize) -> u32;

    fn ints_replace(ints: &mut Self::Ints, lane: usize, value: u32);

    /// Lanes where `a & b` has at least one bit set.
    fn ints_overlap(a: Self::Ints, b: Self::Ints) -> Self::SimdBool;

    /// `value` in the lanes of `mask`, `ints` elsewhere.
    fn ints_select(mask: Self::SimdBool, value: Self::Ints, ints: Self::Ints) -> Self::Ints;
}

impl SimdLanes for f32 {
    type Ints = u32;

    #[inline(always)]
    fn sign_bit(self) -> Self {
        f32::from_bits(self.to_bits() & 0x8000_0000)
    }

    #[inline(always)]
    fn flip_sign(self, sign: Self) -> Self {
        f32::from_bits(self.to_bits() ^ sign.to_bits())
    }

    #[inline(always)]
    fn mask_from_bits(bits: u64) -> bool {
        bits & 1 != 0
    }

    #[inline(always)]
    fn infinity() -> Self {
        f32::INFINITY
    }

    #[inline(always)]
    fn ints_splat(value: u32) -> u32 {
        value
    }

    #[inline(always)]
    fn ints_extract(ints: &u32, lane: usize) -> u32 {
        debug_assert!(lane == 0);
        *ints
    }

    #[inline(always)]
    fn ints_replace(ints: &mut u32, lane: usize, value: u32) {
        debug_assert!(lane == 0);
        *ints = value;
    }

    #[inline(always)]
    fn ints_overlap(a: u32, b: u32) -> bool {
        a & b != 0
    }

    #[inline(always)]
    fn ints_select(mask: bool, value: u32, ints: u32) -> u32 {
        if mask { value } else { ints }
    }
}

macro_rules! impl_wide_lanes {
    ($simd:ident, $bool:ident, $wide:ident, $ints:ident, $lane_bits:expr) => {
        impl SimdLanes for $simd {
            type Ints = $ints;

            #[inline(always)]
            fn sign_bit(self) -> Self {
                $simd(self.0 & $wide::splat(-0.0))
            }

            #[inline(always)]
            fn flip_sign(self, sign: Self) -> Self {
                $simd(self.0 ^ sign.0)
            }

            #[inline(always)]
            fn mask_from_bits(bits: u64) -> $bool {
                const LANE_BITS: $ints = $ints::new($lane_bits);
                // Truncation only drops bits past the lane count
                let set = $ints::splat(bits as u32) & LANE_BITS;
                $bool(cast(!set.cmp_eq($ints::splat(0))))
            }

            #[inline(always)]
            fn infinity() -> Self {
                Self::splat(f32::INFINITY)
            }

            #[inline(always)]
            fn ints_splat(value: u32) -> $ints {
                $ints::splat(value)
            }

            #[inline(always)]
            fn ints_extract(ints: &$ints, lane: usize) -> u32 {
                ints.as_array_ref()[lane]
            }

            #[inline(always)]
            fn ints_replace(ints: &mut $ints, lane: usize, value: u32) {
                ints.as_array_mut()[lane] = value;
            }

            #[inline(always)]
            fn ints_overlap(a: $ints, b: $ints) -> $bool {
                $bool(cast(!(a & b).cmp_eq($ints::splat(0))))
            }

            #[inline(always)]
            fn ints_select(mask: $bool, value: $ints, ints: $ints) -> $ints {
                cast::<$wide, $ints>(mask.0).blend(value, ints)
            }
        }
    };
}

impl_wide_lanes!(WideF32x4, WideBoolF32x4, f32x4, u32x4, [1, 2, 4, 8]);
impl_wide_lanes!(
    WideF32x8,
    WideBoolF32x8,
    f32x8,
    u32x8,
    [1, 2, 4, 8, 16, 32, 64, 128]
);

/// Dot product using fused multiply-adds.
#[inline(always)]
pub fn fma_dot<T: SimdLanes>(a: &SimdVector<T>, b: &SimdVector<T>) -> T {
    a.z.simd_mul_add(b.z, a.y.simd_mul_add(b.y, a.x * b.x))
}
