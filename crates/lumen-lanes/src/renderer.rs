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

//! Owns one device and every lane-level cache that draws on it.

use crate::error::BatchError;
use crate::render_lane::{BatchRenderer, BatchStats, DrawGroup, GpuContext};
use crate::render_target_pool::RenderTargetPool;
use crate::shader_cache::ShaderVariantCache;
use crate::texture_binding::TextureBindingCache;
use crate::texture_gc::TextureGc;
use lumen_core::asset::TextureResourceId;
use lumen_core::renderer::{GraphicsDevice, RenderPrimitive, RendererConfig};

/// A 2D renderer drawing batched primitives on a single [`GraphicsDevice`].
///
/// A frame is `begin_frame`, any number of `render` calls, then `end_frame`.
/// Texture mirrors, shader variants, GPU geometry and pooled render targets
/// persist across frames.
#[derive(Debug)]
pub struct Renderer2D<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    textures: TextureBindingCache,
    shaders: ShaderVariantCache,
    batch: BatchRenderer,
    render_targets: RenderTargetPool,
    texture_gc: TextureGc,
}

impl<D: GraphicsDevice> Renderer2D<D> {
    /// Creates a renderer for `device`.
    ///
    /// ## Errors
    /// * `BatchError::Config` - If the configuration is invalid.
    /// * `BatchError::Render` - If the device cannot compile a batch shader.
    pub fn new(device: D, config: RendererConfig) -> Result<Self, BatchError> {
        config.validate()?;

        let limits = device.limits();
        let textures = TextureBindingCache::new(&limits);
        let shaders =
            ShaderVariantCache::new(&device, config.vertex_layout, config.max_textures_per_batch)?;
        let batch = BatchRenderer::new(&config, shaders.max_textures());
        let render_targets =
            RenderTargetPool::new(config.enable_full_screen_render_target_fast_path)
                .with_max_dimension(limits.max_texture_dimension_2d);
        let texture_gc = TextureGc::from_config(&config);

        log::info!(
            "Renderer2D: Initialized on '{}' ({} textures per batch, {} vertices per flush, GC {:?})",
            device.adapter_info().name,
            shaders.max_textures(),
            batch.vertex_capacity(),
            texture_gc.mode()
        );

        Ok(Self {
            device,
            config,
            textures,
            shaders,
            batch,
            render_targets,
            texture_gc,
        })
    }

    fn split(&mut self) -> (&mut BatchRenderer, GpuContext<'_>) {
        (
            &mut self.batch,
            GpuContext {
                device: &self.device,
                textures: &mut self.textures,
                shaders: &mut self.shaders,
            },
        )
    }

    /// Starts a frame.
    pub fn begin_frame(&mut self) {
        self.batch.begin_frame();
    }

    /// Submits a primitive. It is drawn by a later flush, in submission order.
    ///
    /// ## Errors
    /// Returns the error of an implicit flush.
    pub fn render(&mut self, primitive: &RenderPrimitive<'_>) -> Result<(), BatchError> {
        let (batch, mut gpu) = self.split();
        batch.render(&mut gpu, primitive)
    }

    /// Draws everything submitted so far.
    ///
    /// ## Errors
    /// * `BatchError::Resource` - If packing, upload or a draw fails.
    pub fn flush(&mut self) -> Result<(), BatchError> {
        let (batch, mut gpu) = self.split();
        batch.flush(&mut gpu)
    }

    /// Flushes, frees mirrors of dropped textures and advances the texture GC.
    ///
    /// Returns the frame statistics.
    ///
    /// ## Errors
    /// Returns the error of the final flush. GC bookkeeping still runs.
    pub fn end_frame(&mut self) -> Result<BatchStats, BatchError> {
        let flushed = self.flush();

        let swept = self.textures.sweep_disposed(&self.device);
        if swept > 0 {
            log::debug!("Renderer2D: Released {swept} disposed textures");
        }
        self.texture_gc.post_render(&self.device, &mut self.textures);

        flushed.map(|()| self.batch.stats())
    }

    /// Forgets cached texture-unit state. Call after other code touched the
    /// device's texture bindings.
    pub fn reset_state(&mut self) {
        self.textures.reset();
    }

    /// Runs a texture collection now, as in [`GcMode::Manual`](lumen_core::renderer::GcMode).
    ///
    /// Returns the number of textures evicted.
    pub fn collect_textures(&mut self) -> usize {
        self.texture_gc.run(&self.device, &mut self.textures)
    }

    /// Frees the GPU storage of one texture now.
    pub fn unload_texture(&mut self, texture: TextureResourceId) -> bool {
        self.texture_gc
            .unload(&self.device, &mut self.textures, texture)
    }

    /// Counters since the last [`begin_frame`](Self::begin_frame).
    pub fn stats(&self) -> BatchStats {
        self.batch.stats()
    }

    /// The groups drawn by the most recent flush.
    pub fn last_groups(&self) -> &[DrawGroup] {
        self.batch.last_groups()
    }

    /// The configuration the renderer was built with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Largest number of textures one draw samples on this device.
    pub fn max_textures(&self) -> u32 {
        self.shaders.max_textures()
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Texture mirrors and unit state.
    pub fn textures(&self) -> &TextureBindingCache {
        &self.textures
    }

    /// The compiled batch shaders.
    pub fn shaders(&self) -> &ShaderVariantCache {
        &self.shaders
    }

    /// The render-target pool.
    pub fn render_targets(&self) -> &RenderTargetPool {
        &self.render_targets
    }

    /// The render-target pool, mutably.
    pub fn render_targets_mut(&mut self) -> &mut RenderTargetPool {
        &mut self.render_targets
    }

    /// The texture garbage collector.
    pub fn texture_gc(&self) -> &TextureGc {
        &self.texture_gc
    }

    /// The texture garbage collector, mutably.
    pub fn texture_gc_mut(&mut self) -> &mut TextureGc {
        &mut self.texture_gc
    }

    /// Forgets every GPU object after the device lost its context. Resources are
    /// recreated on demand.
    pub fn context_lost(&mut self) {
        log::warn!("Renderer2D: Graphics context lost, dropping GPU state");
        self.batch.context_lost();
        self.shaders.context_lost();
        self.textures.context_lost();
    }

    /// Releases every GPU object and pooled render target.
    pub fn destroy(&mut self) {
        self.batch.destroy(&self.device);
        self.shaders.destroy(&self.device);
        self.textures.destroy(&self.device);
        self.render_targets.clear(true);
        log::debug!("Renderer2D: Destroyed");
    }
}
