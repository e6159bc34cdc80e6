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

//! The flattened, already-transformed geometry producers submit for batching.

use crate::asset::TextureHandle;
use crate::math::LinearRgba;
use crate::renderer::api::BlendMode;

/// Index pattern of a quad made of four vertices in `[tl, tr, br, bl]` order.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// A renderable primitive: sprite, mesh or tile.
///
/// Producers borrow their geometry into the primitive; the batcher copies what it
/// needs, so the primitive never outlives the `render` call.
#[derive(Debug, Clone, Copy)]
pub struct RenderPrimitive<'a> {
    /// Flat `[x0, y0, x1, y1, ...]` positions.
    pub vertices: &'a [f32],
    /// Flat `[u0, v0, u1, v1, ...]` texture coordinates, one pair per vertex.
    pub uvs: &'a [f32],
    /// Triangle indices into this primitive's own vertex list.
    pub indices: &'a [u16],
    /// The texture sampled by every vertex of the primitive.
    pub texture: &'a TextureHandle,
    /// Tint color and alpha.
    pub tint: LinearRgba,
    /// The requested blend mode, before premultiplied-alpha resolution.
    pub blend_mode: BlendMode,
}

impl<'a> RenderPrimitive<'a> {
    /// Creates a primitive with a white tint and normal blending.
    pub fn new(
        vertices: &'a [f32],
        uvs: &'a [f32],
        indices: &'a [u16],
        texture: &'a TextureHandle,
    ) -> Self {
        Self {
            vertices,
            uvs,
            indices,
            texture,
            tint: LinearRgba::WHITE,
            blend_mode: BlendMode::Normal,
        }
    }

    /// Sets the tint.
    pub fn with_tint(mut self, tint: LinearRgba) -> Self {
        self.tint = tint;
        self
    }

    /// Sets the blend mode.
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Returns the number of vertices described by `vertices`.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Checks that the geometry is self-consistent: whole coordinate pairs, one UV per
    /// vertex, and every index inside the vertex list.
    pub fn is_well_formed(&self) -> bool {
        let vertex_count = self.vertex_count();
        self.vertices.len() % 2 == 0
            && self.uvs.len() == self.vertices.len()
            && self
                .indices
                .iter()
                .all(|&index| (index as usize) < vertex_count)
    }
}
