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

//! Blend modes and the premultiplied-alpha blend lookup table.

use serde::{Deserialize, Serialize};

/// A factor in a blend equation, determining how much a source or destination color contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// The factor is `0.0`.
    Zero,
    /// The factor is `1.0`.
    One,
    /// The factor is the source alpha component (`src.a`).
    SrcAlpha,
    /// The factor is `1.0 - src.a`.
    OneMinusSrcAlpha,
    /// The factor is the destination color (`dst.rgb`).
    DstColor,
    /// The factor is `1.0 - src.rgb`.
    OneMinusSrcColor,
}

/// A source/destination factor pair, combined with an additive blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// The factor applied to the fragment shader output.
    pub src_factor: BlendFactor,
    /// The factor applied to the color already in the framebuffer.
    pub dst_factor: BlendFactor,
}

/// How a primitive's color is composited onto the target.
///
/// The `*Npm` variants are the equivalents for textures whose pixels are not
/// premultiplied by alpha. Producers normally pick the premultiplied names and let
/// [`BlendMode::resolve`] switch to the right variant for the texture being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Standard "over" compositing.
    #[default]
    Normal,
    /// Additive blending.
    Add,
    /// Multiplies source and destination colors.
    Multiply,
    /// Inverse multiply, brightening the destination.
    Screen,
    /// [`BlendMode::Normal`] for non-premultiplied sources.
    NormalNpm,
    /// [`BlendMode::Add`] for non-premultiplied sources.
    AddNpm,
    /// [`BlendMode::Screen`] for non-premultiplied sources.
    ScreenNpm,
    /// Blending disabled; the source replaces the destination.
    None,
}

impl BlendMode {
    /// Composes the blend mode with a texture's premultiplied-alpha flag.
    ///
    /// Non-premultiplied textures turn `Normal`, `Add` and `Screen` into their `*Npm`
    /// variants; premultiplied textures turn the `*Npm` variants back. Every other
    /// mode is returned unchanged.
    pub fn resolve(self, premultiplied_alpha: bool) -> Self {
        match (premultiplied_alpha, self) {
            (false, BlendMode::Normal) => BlendMode::NormalNpm,
            (false, BlendMode::Add) => BlendMode::AddNpm,
            (false, BlendMode::Screen) => BlendMode::ScreenNpm,
            (true, BlendMode::NormalNpm) => BlendMode::Normal,
            (true, BlendMode::AddNpm) => BlendMode::Add,
            (true, BlendMode::ScreenNpm) => BlendMode::Screen,
            (_, mode) => mode,
        }
    }

    /// Returns the fixed-function blend state for this mode, or `None` when blending
    /// is disabled.
    pub fn blend_state(self) -> Option<BlendState> {
        use BlendFactor::*;

        let (src_factor, dst_factor) = match self {
            BlendMode::Normal => (One, OneMinusSrcAlpha),
            BlendMode::Add => (One, One),
            BlendMode::Multiply => (DstColor, OneMinusSrcAlpha),
            BlendMode::Screen => (One, OneMinusSrcColor),
            BlendMode::NormalNpm => (SrcAlpha, OneMinusSrcAlpha),
            BlendMode::AddNpm => (SrcAlpha, One),
            BlendMode::ScreenNpm => (SrcAlpha, OneMinusSrcColor),
            BlendMode::None => return None,
        };

        Some(BlendState {
            src_factor,
            dst_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_non_premultiplied() {
        assert_eq!(BlendMode::Normal.resolve(false), BlendMode::NormalNpm);
        assert_eq!(BlendMode::Add.resolve(false), BlendMode::AddNpm);
        assert_eq!(BlendMode::Screen.resolve(false), BlendMode::ScreenNpm);
        assert_eq!(BlendMode::Multiply.resolve(false), BlendMode::Multiply);
        assert_eq!(BlendMode::NormalNpm.resolve(false), BlendMode::NormalNpm);
    }

    #[test]
    fn test_resolve_premultiplied() {
        assert_eq!(BlendMode::Normal.resolve(true), BlendMode::Normal);
        assert_eq!(BlendMode::NormalNpm.resolve(true), BlendMode::Normal);
        assert_eq!(BlendMode::AddNpm.resolve(true), BlendMode::Add);
        assert_eq!(BlendMode::ScreenNpm.resolve(true), BlendMode::Screen);
        assert_eq!(BlendMode::None.resolve(true), BlendMode::None);
    }

    #[test]
    fn test_blend_states() {
        let normal = BlendMode::Normal.blend_state().unwrap();
        assert_eq!(normal.src_factor, BlendFactor::One);
        assert_eq!(normal.dst_factor, BlendFactor::OneMinusSrcAlpha);

        let add_npm = BlendMode::AddNpm.blend_state().unwrap();
        assert_eq!(add_npm.src_factor, BlendFactor::SrcAlpha);
        assert_eq!(add_npm.dst_factor, BlendFactor::One);

        assert!(BlendMode::None.blend_state().is_none());
    }
}
