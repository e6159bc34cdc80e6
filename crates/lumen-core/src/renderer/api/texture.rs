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

//! Defines data structures related to GPU texture and sampler resources.

use crate::math::{is_pow2, Extent2D};
use std::borrow::Cow;

/// The memory layout of texels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Four 8-bit unsigned normalized channels.
    #[default]
    Rgba8Unorm,
    /// Four 8-bit channels, sRGB encoded.
    Rgba8UnormSrgb,
    /// Four 8-bit channels in BGRA order.
    Bgra8Unorm,
    /// A single 8-bit channel.
    R8Unorm,
    /// A combined 24-bit depth and 8-bit stencil format.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Returns the number of bytes used by one texel.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::R8Unorm => 1,
        }
    }
}

/// A set of flags describing the allowed usages of a [`TextureId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUsage {
    bits: u32,
}

impl TextureUsage {
    /// The texture can be used as the destination of a copy operation.
    pub const COPY_DST: Self = Self { bits: 1 << 0 };
    /// The texture can be bound in a shader for sampling (reading).
    pub const TEXTURE_BINDING: Self = Self { bits: 1 << 1 };
    /// The texture can be used as a color attachment in a render pass.
    pub const RENDER_ATTACHMENT: Self = Self { bits: 1 << 2 };
    /// The texture can be used as a depth/stencil attachment.
    pub const DEPTH_STENCIL_ATTACHMENT: Self = Self { bits: 1 << 3 };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain all flags of `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions of the texture in pixels.
    pub size: Extent2D,
    /// The format of the texels in the texture.
    pub format: TextureFormat,
    /// A bitmask of [`TextureUsage`] flags describing how the texture will be used.
    pub usage: TextureUsage,
    /// Whether the uploaded pixels should be treated as premultiplied by alpha.
    pub premultiply_alpha: bool,
}

/// An opaque handle to a GPU texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Defines how texture coordinates are handled when sampling outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    #[default]
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Point sampling. Returns the value of the nearest texel.
    Nearest,
    /// Linear interpolation. Returns a weighted average of the four nearest texels.
    #[default]
    Linear,
}

/// The sampling style of a texture: filtering, wrapping and mipmapping.
///
/// Changing a texture's style bumps its style dirty id; the binding cache re-applies
/// it on the next bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerStyle {
    /// The filter mode used for both magnification and minification.
    pub filter: FilterMode,
    /// The address mode used for both U and V coordinates.
    pub wrap: AddressMode,
    /// Whether mipmaps are generated and sampled.
    pub mipmap: bool,
}

impl SamplerStyle {
    /// Returns the style actually applicable to a texture of `size`.
    ///
    /// Devices without non-power-of-two repeat support can only clamp such textures,
    /// and cannot mipmap them.
    pub fn coerced_for(&self, size: Extent2D, supports_npot_repeat: bool) -> Self {
        let pow2 = is_pow2(size.width) && is_pow2(size.height);
        if pow2 || supports_npot_repeat {
            return *self;
        }

        let coerced = Self {
            filter: self.filter,
            wrap: AddressMode::ClampToEdge,
            mipmap: false,
        };
        if coerced != *self {
            log::debug!(
                "SamplerStyle: {}x{} texture falls back to {:?} without mipmaps",
                size.width,
                size.height,
                coerced.wrap
            );
        }
        coerced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npot_style_is_clamped_without_support() {
        let style = SamplerStyle {
            filter: FilterMode::Nearest,
            wrap: AddressMode::Repeat,
            mipmap: true,
        };

        let coerced = style.coerced_for(Extent2D::new(100, 64), false);
        assert_eq!(coerced.wrap, AddressMode::ClampToEdge);
        assert!(!coerced.mipmap);
        assert_eq!(coerced.filter, FilterMode::Nearest);
    }

    #[test]
    fn test_pow2_style_is_untouched() {
        let style = SamplerStyle {
            filter: FilterMode::Linear,
            wrap: AddressMode::Repeat,
            mipmap: true,
        };

        assert_eq!(style.coerced_for(Extent2D::new(128, 64), false), style);
        assert_eq!(style.coerced_for(Extent2D::new(100, 60), true), style);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(TextureFormat::Rgba8Unorm.bytes_per_pixel(), 4);
        assert_eq!(TextureFormat::R8Unorm.bytes_per_pixel(), 1);
    }
}
