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

//! Idle eviction of GPU texture storage.
//!
//! The collector counts frames. Each bind stamps the texture with the current
//! count; a texture whose stamp falls more than `max_idle` frames behind loses
//! its GPU storage but keeps its pixels, so a later bind simply uploads it again.
//! Render targets are never collected.

use crate::texture_binding::TextureBindingCache;
use lumen_core::asset::TextureResourceId;
use lumen_core::renderer::{GcMode, GraphicsDevice, RendererConfig};

/// Frame-counting texture garbage collector.
#[derive(Debug, Clone)]
pub struct TextureGc {
    mode: GcMode,
    count: u64,
    check_count: u32,
    max_idle: u64,
    check_count_max: u32,
}

impl Default for TextureGc {
    fn default() -> Self {
        Self::new(GcMode::Auto, 3600, 600)
    }
}

impl TextureGc {
    /// Creates a collector evicting textures idle for more than `max_idle` frames
    /// and, in [`GcMode::Auto`], collecting every `check_interval` frames.
    pub fn new(mode: GcMode, max_idle: u64, check_interval: u32) -> Self {
        Self {
            mode,
            count: 0,
            check_count: 0,
            max_idle,
            check_count_max: check_interval,
        }
    }

    /// Creates a collector from the renderer configuration.
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(
            config.gc_mode,
            config.gc_max_idle_frames,
            config.gc_check_interval_frames,
        )
    }

    /// The current mode.
    pub fn mode(&self) -> GcMode {
        self.mode
    }

    /// Switches mode. The check counter keeps running across switches.
    pub fn set_mode(&mut self, mode: GcMode) {
        log::debug!("TextureGc: Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    /// Frames counted so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Frames of inactivity tolerated before eviction.
    pub fn max_idle(&self) -> u64 {
        self.max_idle
    }

    /// Advances the frame counter and, in [`GcMode::Auto`], collects once per
    /// check interval. Call once per frame after rendering.
    ///
    /// Returns the number of textures evicted this frame.
    pub fn post_render(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureBindingCache,
    ) -> usize {
        self.count += 1;
        textures.set_tick(self.count);

        if self.mode != GcMode::Auto {
            return 0;
        }
        self.check_count += 1;
        if self.check_count > self.check_count_max {
            self.check_count = 0;
            return self.run(device, textures);
        }
        0
    }

    /// Evicts every resident texture that is not a render target and has been
    /// idle for more than `max_idle` frames. Does nothing when disabled.
    ///
    /// Returns the number of textures evicted.
    pub fn run(&mut self, device: &dyn GraphicsDevice, textures: &mut TextureBindingCache) -> usize {
        if self.mode == GcMode::Disabled {
            return 0;
        }

        let count = self.count;
        let max_idle = self.max_idle;
        let evicted = textures.evict_where(device, |shadow| {
            if shadow.is_render_target() {
                return false;
            }
            shadow
                .source()
                .map_or(true, |texture| count.saturating_sub(texture.touched()) > max_idle)
        });

        if evicted > 0 {
            log::debug!(
                "TextureGc: Evicted {evicted} idle textures at frame {count} ({} resident)",
                textures.managed_count()
            );
        }
        evicted
    }

    /// Evicts one texture immediately, regardless of mode or idle time.
    pub fn unload(
        &mut self,
        device: &dyn GraphicsDevice,
        textures: &mut TextureBindingCache,
        texture: TextureResourceId,
    ) -> bool {
        textures.destroy_texture(device, texture)
    }
}
