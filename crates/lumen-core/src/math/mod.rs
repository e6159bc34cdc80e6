// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Small math toolbox used by the renderer: colors, pixel extents and
//! power-of-two helpers.

pub mod color;
pub mod dimension;

pub use self::color::LinearRgba;
pub use self::dimension::{Extent2D, Extent3D, Origin3D};

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

/// Returns the smallest power of two greater than or equal to `value`.
///
/// `0` maps to `1`, so the result is always a valid capacity. Values above
/// `2^31` saturate to `2^31`, the largest power of two a `u32` holds.
#[inline]
pub fn next_pow2(value: u32) -> u32 {
    value
        .max(1)
        .checked_next_power_of_two()
        .unwrap_or(MAX_POW2)
}

/// The largest power of two representable as a `u32`.
pub const MAX_POW2: u32 = 1 << 31;

/// Returns `true` if `value` is a non-zero power of two.
#[inline]
pub fn is_pow2(value: u32) -> bool {
    value.is_power_of_two()
}

/// Returns the base-2 logarithm of a power of two.
#[inline]
pub fn log2_pow2(value: u32) -> u32 {
    debug_assert!(is_pow2(value), "log2_pow2 expects a power of two, got {value}");
    value.trailing_zeros()
}
