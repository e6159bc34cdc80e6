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

//! The batch accumulator and its flush engine.

use super::batch_context::{BatchContext, DrawGroup};
use crate::buffer_pool::{BufferPool, GeometryRing};
use crate::error::BatchError;
use crate::shader_cache::ShaderVariantCache;
use crate::texture_binding::TextureBindingCache;
use lumen_core::asset::TextureHandle;
use lumen_core::math::LinearRgba;
use lumen_core::renderer::{
    BlendMode, GraphicsDevice, PrimitiveTopology, RenderPrimitive, RendererConfig, TintedVertex,
    UntintedVertex, VertexLayout, MAX_BATCH_VERTICES,
};
use serde::Serialize;

/// Counters for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Indexed draws issued.
    pub draw_calls: usize,
    /// Non-empty flushes.
    pub flushes: usize,
    /// Primitives drawn.
    pub primitives: usize,
    /// Primitives rejected by `render`.
    pub dropped_primitives: usize,
}

/// The device-side collaborators a flush needs.
///
/// Borrowed per call so the binding and shader caches can be shared with
/// other lanes drawing to the same device.
pub struct GpuContext<'a> {
    /// The device draws are issued on.
    pub device: &'a dyn GraphicsDevice,
    /// Texture-unit state and GPU texture mirrors.
    pub textures: &'a mut TextureBindingCache,
    /// Compiled batch shaders.
    pub shaders: &'a mut ShaderVariantCache,
}

#[derive(Debug)]
struct BufferedPrimitive {
    texture: TextureHandle,
    tint: LinearRgba,
    blend_mode: BlendMode,
    vertex_start: usize,
    vertex_count: usize,
    index_start: usize,
    index_count: usize,
}

/// Accumulates primitives and turns them into grouped, indexed draw calls.
///
/// Submission order is preserved end to end. A batch is flushed explicitly,
/// or implicitly when the next primitive would overflow the vertex capacity.
#[derive(Debug)]
pub struct BatchRenderer {
    layout: VertexLayout,
    vertex_capacity: usize,
    pool: BufferPool,
    ring: GeometryRing,
    context: BatchContext,
    primitives: Vec<BufferedPrimitive>,
    positions: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    vertex_count: usize,
    last_groups: Vec<DrawGroup>,
    stats: BatchStats,
}

impl BatchRenderer {
    /// Creates a renderer packing groups of at most `max_textures` textures.
    pub fn new(config: &RendererConfig, max_textures: u32) -> Self {
        let layout = config.vertex_layout;
        let vertex_capacity = config.batch_vertex_capacity.clamp(1, MAX_BATCH_VERTICES);
        Self {
            layout,
            vertex_capacity,
            pool: BufferPool::new(layout.stride()),
            ring: GeometryRing::new(config.can_reuse_upload_buffer_within_frame),
            context: BatchContext::new(max_textures),
            primitives: Vec::new(),
            positions: Vec::with_capacity(vertex_capacity * 2),
            uvs: Vec::with_capacity(vertex_capacity * 2),
            indices: Vec::with_capacity(vertex_capacity * 3 / 2),
            vertex_count: 0,
            last_groups: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    /// The vertex record layout.
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Vertices buffered before an implicit flush.
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    /// Largest number of textures in one draw.
    pub fn max_textures(&self) -> u32 {
        self.context.max_textures()
    }

    /// Primitives waiting for the next flush.
    pub fn pending_primitives(&self) -> usize {
        self.primitives.len()
    }

    /// Vertices waiting for the next flush.
    pub fn pending_vertices(&self) -> usize {
        self.vertex_count
    }

    /// Indices waiting for the next flush.
    pub fn pending_indices(&self) -> usize {
        self.indices.len()
    }

    /// The groups drawn by the most recent flush of this frame.
    pub fn last_groups(&self) -> &[DrawGroup] {
        &self.last_groups
    }

    /// Counters since the last [`begin_frame`](Self::begin_frame).
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Resets per-frame state.
    pub fn begin_frame(&mut self) {
        self.ring.begin_frame();
        self.stats = BatchStats::default();
        self.last_groups.clear();
    }

    /// Buffers a primitive.
    ///
    /// Primitives whose texture is not valid yet, whose geometry is malformed, or
    /// whose vertices cannot be addressed with 16-bit indices are dropped and
    /// counted in [`BatchStats::dropped_primitives`].
    ///
    /// ## Errors
    /// Returns the error of an implicit flush.
    pub fn render(
        &mut self,
        gpu: &mut GpuContext<'_>,
        primitive: &RenderPrimitive<'_>,
    ) -> Result<(), BatchError> {
        if !primitive.texture.is_valid() {
            log::trace!(
                "BatchRenderer: Skipping primitive with unloaded texture {:?}",
                primitive.texture.id()
            );
            self.stats.dropped_primitives += 1;
            return Ok(());
        }

        let vertex_count = primitive.vertex_count();
        if !primitive.is_well_formed() || vertex_count > MAX_BATCH_VERTICES {
            log::warn!(
                "BatchRenderer: Dropping malformed primitive ({} coords, {} uvs, {} indices)",
                primitive.vertices.len(),
                primitive.uvs.len(),
                primitive.indices.len()
            );
            self.stats.dropped_primitives += 1;
            return Ok(());
        }

        if self.vertex_count > 0 && self.vertex_count + vertex_count > self.vertex_capacity {
            self.flush(gpu)?;
        }

        self.primitives.push(BufferedPrimitive {
            texture: primitive.texture.clone(),
            tint: primitive.tint,
            blend_mode: primitive.blend_mode,
            vertex_start: self.vertex_count,
            vertex_count,
            index_start: self.indices.len(),
            index_count: primitive.indices.len(),
        });
        self.positions.extend_from_slice(primitive.vertices);
        self.uvs.extend_from_slice(primitive.uvs);
        self.indices.extend_from_slice(primitive.indices);
        self.vertex_count += vertex_count;
        Ok(())
    }

    /// Packs, uploads and draws everything buffered.
    ///
    /// Primitives whose texture was destroyed or emptied after they were buffered
    /// are dropped here and counted in [`BatchStats::dropped_primitives`]. The
    /// buffered primitives are discarded whether or not the flush succeeds.
    ///
    /// ## Errors
    /// * `BatchError::Resource` - If scratch memory, upload, binding or a draw fails.
    pub fn flush(&mut self, gpu: &mut GpuContext<'_>) -> Result<(), BatchError> {
        if self.primitives.is_empty() {
            return Ok(());
        }
        let result = self.flush_buffered(gpu);
        self.clear_pending();
        result
    }

    fn flush_buffered(&mut self, gpu: &mut GpuContext<'_>) -> Result<(), BatchError> {
        let device = gpu.device;
        let stride = self.layout.stride();
        let index_count = self.indices.len();
        let shader = gpu.shaders.get_shader(device, self.context.max_textures())?;

        let (attributes, indices) = self.pool.acquire_pair(self.vertex_count, index_count)?;
        let attributes = attributes.as_mut_slice();
        let indices = indices.as_mut_slice();

        self.context.begin(&gpu.textures.bound_units_snapshot());
        let mut packed_vertices = 0;
        let mut packed_indices = 0;
        let mut dropped = 0;
        for primitive in &self.primitives {
            // Textures destroyed or emptied since `render` cannot be bound.
            if !primitive.texture.is_valid() {
                dropped += 1;
                continue;
            }

            let premultiplied = primitive.texture.premultiply_alpha();
            let blend_mode = primitive.blend_mode.resolve(premultiplied);
            let slot = self
                .context
                .assign(&primitive.texture, blend_mode, packed_indices as u32);

            let source = primitive.vertex_start..primitive.vertex_start + primitive.vertex_count;
            let target = packed_vertices..packed_vertices + primitive.vertex_count;
            pack_vertices(
                self.layout,
                &self.positions[source.start * 2..source.end * 2],
                &self.uvs[source.start * 2..source.end * 2],
                primitive.tint.to_packed_rgba8(premultiplied),
                slot as f32,
                &mut attributes[target.start * stride..target.end * stride],
            );

            let source = primitive.index_start..primitive.index_start + primitive.index_count;
            let target = packed_indices..packed_indices + primitive.index_count;
            for (packed, &index) in indices[target].iter_mut().zip(&self.indices[source]) {
                *packed = (index as usize + packed_vertices) as u16;
            }

            packed_vertices += primitive.vertex_count;
            packed_indices += primitive.index_count;
        }
        let groups = self.context.finish(packed_indices as u32);

        if dropped > 0 {
            log::debug!("BatchRenderer: Dropped {dropped} primitives whose texture became invalid");
            self.stats.dropped_primitives += dropped;
        }
        if groups.is_empty() {
            self.last_groups.clear();
            return Ok(());
        }

        self.ring.upload_and_bind(
            device,
            &attributes[..packed_vertices * stride],
            &indices[..packed_indices],
        )?;
        device.bind_shader(shader)?;

        for group in &groups {
            for entry in &group.textures {
                gpu.textures.bind(device, &entry.texture, entry.slot)?;
            }
            device.set_blend_mode(group.blend_mode)?;
            device.draw_indexed(PrimitiveTopology::TriangleList, group.size, group.start)?;
        }

        let drawn = self.primitives.len() - dropped;
        log::trace!(
            "BatchRenderer: Flushed {drawn} primitives in {} draw calls",
            groups.len()
        );
        self.stats.flushes += 1;
        self.stats.draw_calls += groups.len();
        self.stats.primitives += drawn;
        self.last_groups = groups;
        Ok(())
    }

    fn clear_pending(&mut self) {
        self.primitives.clear();
        self.positions.clear();
        self.uvs.clear();
        self.indices.clear();
        self.vertex_count = 0;
    }

    /// Releases GPU buffers and scratch memory.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        self.ring.destroy(device);
        self.pool.clear();
        self.clear_pending();
        self.last_groups.clear();
    }

    /// Forgets GPU buffers after the device lost its context.
    pub fn context_lost(&mut self) {
        self.ring.context_lost();
    }
}

fn pack_vertices(
    layout: VertexLayout,
    positions: &[f32],
    uvs: &[f32],
    color: u32,
    texture_slot: f32,
    out: &mut [u8],
) {
    let records = out.chunks_exact_mut(layout.stride());
    let vertices = positions.chunks_exact(2).zip(uvs.chunks_exact(2));
    for (record, (position, uv)) in records.zip(vertices) {
        let position = [position[0], position[1]];
        let uv = [uv[0], uv[1]];
        match layout {
            VertexLayout::Tinted => record.copy_from_slice(bytemuck::bytes_of(&TintedVertex {
                position,
                uv,
                color,
                texture_slot,
            })),
            VertexLayout::Untinted => {
                record.copy_from_slice(bytemuck::bytes_of(&UntintedVertex {
                    position,
                    uv,
                    texture_slot,
                }))
            }
        }
    }
}
