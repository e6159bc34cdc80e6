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

//! Defines the `LinearRgba` color type used for primitive tints.

/// Represents a color using `f32` RGBA components in the `[0, 1]` range.
///
/// Primitives carry their tint as a `LinearRgba`; the batch renderer packs it
/// into four bytes per vertex with [`LinearRgba::to_packed_rgba8`].
///
/// `#[repr(C)]` ensures a consistent memory layout, which is important when passing
/// color data to graphics APIs.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LinearRgba {
    /// The red component.
    pub r: f32,
    /// The green component.
    pub g: f32,
    /// The blue component.
    pub b: f32,
    /// The alpha (opacity) component.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque white (`[1.0, 1.0, 1.0, 1.0]`).
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black (`[0.0, 0.0, 0.0, 1.0]`).
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Opaque red (`[1.0, 0.0, 0.0, 1.0]`).
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Fully transparent black (`[0.0, 0.0, 0.0, 0.0]`).
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a new `LinearRgba` with explicit RGBA values.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a new opaque `LinearRgba` (alpha = 1.0).
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates an opaque color from a `0xRRGGBB` integer.
    pub fn from_rgb_u32(rgb: u32) -> Self {
        let [b, g, r, _] = rgb.to_le_bytes();
        Self::rgb(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        )
    }

    /// Returns a copy of this color with a new alpha value.
    #[inline]
    pub fn with_alpha(&self, a: f32) -> Self {
        Self { a, ..*self }
    }

    /// Packs the color into an RGBA8 word whose little-endian bytes are `[r, g, b, a]`.
    ///
    /// When `premultiplied` is `true` the RGB channels are scaled by alpha before
    /// quantization, matching textures that store premultiplied pixels. A fully
    /// transparent color always packs to `0`.
    pub fn to_packed_rgba8(&self, premultiplied: bool) -> u32 {
        let alpha = self.a.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return 0;
        }

        let scale = if premultiplied { alpha } else { 1.0 };
        let quantize = |c: f32| ((c.clamp(0.0, 1.0) * scale * 255.0) + 0.5) as u8;
        let a = ((alpha * 255.0) + 0.5) as u8;

        u32::from_le_bytes([quantize(self.r), quantize(self.g), quantize(self.b), a])
    }
}

impl Default for LinearRgba {
    /// Returns opaque white, the neutral tint.
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_rgb_u32() {
        let c = LinearRgba::from_rgb_u32(0xFF8000);
        assert_relative_eq!(c.r, 1.0);
        assert_relative_eq!(c.g, 128.0 / 255.0);
        assert_relative_eq!(c.b, 0.0);
        assert_relative_eq!(c.a, 1.0);
    }

    #[test]
    fn test_packed_opaque_white() {
        assert_eq!(LinearRgba::WHITE.to_packed_rgba8(true), 0xFFFF_FFFF);
        assert_eq!(LinearRgba::WHITE.to_packed_rgba8(false), 0xFFFF_FFFF);
    }

    #[test]
    fn test_packed_byte_order_is_rgba() {
        let packed = LinearRgba::RED.to_packed_rgba8(false);
        assert_eq!(packed.to_le_bytes(), [255, 0, 0, 255]);
    }

    #[test]
    fn test_packed_premultiplies_rgb() {
        let half = LinearRgba::WHITE.with_alpha(0.5);
        let [r, g, b, a] = half.to_packed_rgba8(true).to_le_bytes();
        assert_eq!((r, g, b, a), (128, 128, 128, 128));

        let [r, _, _, a] = half.to_packed_rgba8(false).to_le_bytes();
        assert_eq!((r, a), (255, 128));
    }

    #[test]
    fn test_transparent_packs_to_zero() {
        assert_eq!(LinearRgba::RED.with_alpha(0.0).to_packed_rgba8(false), 0);
        assert_eq!(LinearRgba::TRANSPARENT.to_packed_rgba8(true), 0);
    }
}
