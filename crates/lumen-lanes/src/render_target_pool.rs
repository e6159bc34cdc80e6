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

//! Reusable offscreen render targets for multi-pass filter chains.
//!
//! Requests are rounded up to power-of-two pixel sizes so that a handful of keys
//! serves most filter passes. When the full-screen fast path is on, a request
//! matching the screen exactly uses a dedicated [`PoolKey::Screen`] key instead,
//! avoiding a larger-than-needed target for whole-screen effects.
//!
//! Sizes never exceed the pool's maximum dimension, normally the device's
//! `max_texture_dimension_2d`; larger requests are clamped to it.

use ahash::AHashMap;
use lumen_core::asset::{TextureHandle, TextureResource};
use lumen_core::math::{next_pow2, Extent2D};

/// The free-list key a target was acquired under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKey {
    /// A power-of-two pixel size.
    Sized {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Exactly the current screen size.
    Screen,
}

/// A pooled offscreen target.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    texture: TextureHandle,
    key: PoolKey,
}

impl RenderTarget {
    /// The texture to render into and sample from.
    pub fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    /// The key the target returns to on release.
    pub fn key(&self) -> PoolKey {
        self.key
    }

    /// Size of the storage in pixels.
    pub fn pixel_size(&self) -> Extent2D {
        self.texture.size()
    }

    /// Size in logical units: pixel size divided by resolution.
    pub fn logical_size(&self) -> (f32, f32) {
        self.texture.logical_size()
    }

    /// Pixel density the target was acquired with.
    pub fn resolution(&self) -> f32 {
        self.texture.resolution()
    }
}

/// Free lists of render targets keyed by rounded size.
#[derive(Debug)]
pub struct RenderTargetPool {
    free: AHashMap<PoolKey, Vec<TextureHandle>>,
    screen_size: Extent2D,
    full_screen_enabled: bool,
    fast_path_allowed: bool,
    stencil: bool,
    max_dimension: u32,
    created: usize,
}

/// Maximum target dimension when none is configured, matching [`DeviceLimits`].
///
/// [`DeviceLimits`]: lumen_core::renderer::DeviceLimits
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

impl RenderTargetPool {
    /// Creates an empty pool. `fast_path_allowed` gates the [`PoolKey::Screen`] key.
    pub fn new(fast_path_allowed: bool) -> Self {
        Self {
            free: AHashMap::new(),
            screen_size: Extent2D::new(0, 0),
            full_screen_enabled: false,
            fast_path_allowed,
            stencil: false,
            max_dimension: DEFAULT_MAX_DIMENSION,
            created: 0,
        }
    }

    /// Makes new targets carry a depth/stencil attachment, for masking filters.
    pub fn with_stencil(mut self, stencil: bool) -> Self {
        self.stencil = stencil;
        self
    }

    /// Caps the pixel size of every target, e.g. at the device's 2D texture limit.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    /// The largest width or height a target may have, in pixels.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Returns a target of at least `min_width x min_height` logical units at
    /// `resolution`, reusing a free one when possible.
    ///
    /// Dimensions beyond [`max_dimension`](Self::max_dimension) are clamped, so
    /// such a target is smaller than requested.
    pub fn acquire(&mut self, min_width: f32, min_height: f32, resolution: f32) -> RenderTarget {
        let width = self.pixel_extent(min_width * resolution);
        let height = self.pixel_extent(min_height * resolution);

        let (key, size) = if self.full_screen_enabled
            && self.fast_path_allowed
            && width == self.screen_size.width
            && height == self.screen_size.height
        {
            (PoolKey::Screen, self.screen_size)
        } else {
            let width = next_pow2(width).min(self.max_dimension);
            let height = next_pow2(height).min(self.max_dimension);
            (
                PoolKey::Sized { width, height },
                Extent2D::new(width, height),
            )
        };

        let texture = match self.free.get_mut(&key).and_then(Vec::pop) {
            Some(texture) => texture,
            None => {
                self.created += 1;
                log::debug!(
                    "RenderTargetPool: Created {}x{} target for {:?}",
                    size.width,
                    size.height,
                    key
                );
                TextureResource::render_target(size, resolution, self.stencil)
            }
        };
        texture.set_resolution(resolution);

        RenderTarget { texture, key }
    }

    /// Returns a target matching the logical size of `input`, at `resolution` or
    /// the input's own resolution.
    pub fn acquire_for(&mut self, input: &RenderTarget, resolution: Option<f32>) -> RenderTarget {
        let (width, height) = input.logical_size();
        self.acquire(width, height, resolution.unwrap_or(input.resolution()))
    }

    fn pixel_extent(&self, pixels: f32) -> u32 {
        let requested = (pixels - 1e-6).ceil().max(1.0);
        if requested > self.max_dimension as f32 {
            log::warn!(
                "RenderTargetPool: Clamping {requested} pixel request to {}",
                self.max_dimension
            );
            return self.max_dimension;
        }
        requested as u32
    }

    /// Returns a target to the free list of the key it was acquired under.
    ///
    /// Full-screen targets that no longer match the screen are destroyed instead.
    pub fn release(&mut self, target: RenderTarget) {
        let RenderTarget { texture, key } = target;
        if key == PoolKey::Screen && texture.size() != self.screen_size {
            texture.destroy();
            return;
        }
        self.free.entry(key).or_default().push(texture);
    }

    /// Updates the screen size in pixels. A change destroys every pooled
    /// full-screen target.
    pub fn set_screen_size(&mut self, size: Extent2D) {
        if size == self.screen_size {
            return;
        }
        self.full_screen_enabled = !size.is_empty();
        if let Some(stale) = self.free.remove(&PoolKey::Screen) {
            for texture in stale {
                texture.destroy();
            }
        }
        self.screen_size = size;
    }

    /// The screen size used by the full-screen key.
    pub fn screen_size(&self) -> Extent2D {
        self.screen_size
    }

    /// Empties every free list, optionally destroying the targets.
    pub fn clear(&mut self, destroy: bool) {
        for texture in self.free.drain().flat_map(|(_, textures)| textures) {
            if destroy {
                texture.destroy();
            }
        }
    }

    /// Number of pooled targets under `key`.
    pub fn free_count(&self, key: PoolKey) -> usize {
        self.free.get(&key).map_or(0, Vec::len)
    }

    /// Number of targets created since the pool was made.
    pub fn created_count(&self) -> usize {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    #[test]
    fn test_release_then_acquire_reuses_target() {
        let mut pool = RenderTargetPool::new(true);
        let first = pool.acquire(100.0, 60.0, 1.0);
        assert_eq!(first.key(), PoolKey::Sized { width: 128, height: 64 });
        let texture = first.texture().clone();
        pool.release(first);

        let second = pool.acquire(120.0, 50.0, 1.0);
        assert!(Rc::ptr_eq(second.texture(), &texture));
        assert_eq!(pool.created_count(), 1);
    }

    #[test]
    fn test_resolution_scales_pixels_not_key_storage() {
        let mut pool = RenderTargetPool::new(true);
        let target = pool.acquire(50.0, 50.0, 2.0);
        assert_eq!(target.pixel_size(), Extent2D::new(128, 128));
        let (width, height) = target.logical_size();
        assert_relative_eq!(width, 64.0);
        assert_relative_eq!(height, 64.0);
        pool.release(target);

        let reused = pool.acquire(100.0, 100.0, 1.0);
        assert_eq!(reused.pixel_size(), Extent2D::new(128, 128));
        assert_relative_eq!(reused.resolution(), 1.0);
        assert_eq!(pool.created_count(), 1);
    }

    #[test]
    fn test_exact_pixel_request_is_not_rounded_up() {
        let mut pool = RenderTargetPool::new(false);
        let target = pool.acquire(64.0, 32.0, 1.0);
        assert_eq!(target.key(), PoolKey::Sized { width: 64, height: 32 });
    }

    #[test]
    fn test_full_screen_fast_path() {
        let mut pool = RenderTargetPool::new(true);
        pool.set_screen_size(Extent2D::new(800, 600));

        let screen = pool.acquire(400.0, 300.0, 2.0);
        assert_eq!(screen.key(), PoolKey::Screen);
        assert_eq!(screen.pixel_size(), Extent2D::new(800, 600));

        let other = pool.acquire(400.0, 300.0, 1.0);
        assert_eq!(other.key(), PoolKey::Sized { width: 512, height: 512 });
    }

    #[test]
    fn test_fast_path_can_be_disabled() {
        let mut pool = RenderTargetPool::new(false);
        pool.set_screen_size(Extent2D::new(800, 600));
        let target = pool.acquire(800.0, 600.0, 1.0);
        assert_eq!(target.key(), PoolKey::Sized { width: 1024, height: 1024 });
    }

    #[test]
    fn test_screen_resize_destroys_full_screen_targets() {
        let mut pool = RenderTargetPool::new(true);
        pool.set_screen_size(Extent2D::new(800, 600));
        let pooled = pool.acquire(800.0, 600.0, 1.0);
        let pooled_texture = pooled.texture().clone();
        let in_flight = pool.acquire(800.0, 600.0, 1.0);
        let in_flight_texture = in_flight.texture().clone();
        pool.release(pooled);
        assert_eq!(pool.free_count(PoolKey::Screen), 1);

        pool.set_screen_size(Extent2D::new(1024, 768));
        assert_eq!(pool.free_count(PoolKey::Screen), 0);
        assert!(pooled_texture.is_destroyed());

        pool.release(in_flight);
        assert!(in_flight_texture.is_destroyed());
        assert_eq!(pool.free_count(PoolKey::Screen), 0);
    }

    #[test]
    fn test_oversized_request_is_clamped_to_max_dimension() {
        let mut pool = RenderTargetPool::new(true);
        let huge = pool.acquire(3.0e9, 1.0, 1.0);
        assert_eq!(huge.key(), PoolKey::Sized { width: 8192, height: 1 });

        let mut pool = RenderTargetPool::new(true).with_max_dimension(5000);
        let target = pool.acquire(4500.0, 100.0, 1.0);
        assert_eq!(target.pixel_size(), Extent2D::new(5000, 128));
        let infinite = pool.acquire(f32::INFINITY, 1.0, 2.0);
        assert_eq!(infinite.pixel_size(), Extent2D::new(5000, 2));
    }

    #[test]
    fn test_acquire_for_matches_input() {
        let mut pool = RenderTargetPool::new(true);
        let input = pool.acquire(100.0, 100.0, 2.0);
        let output = pool.acquire_for(&input, None);
        assert_eq!(output.key(), input.key());
        assert_relative_eq!(output.resolution(), 2.0);
        assert!(!Rc::ptr_eq(output.texture(), input.texture()));
    }

    #[test]
    fn test_clear_with_destroy() {
        let mut pool = RenderTargetPool::new(true).with_stencil(true);
        let target = pool.acquire(10.0, 10.0, 1.0);
        assert!(target.texture().has_stencil());
        let texture = target.texture().clone();
        pool.release(target);

        pool.clear(false);
        assert!(!texture.is_destroyed());
        assert_eq!(pool.free_count(PoolKey::Sized { width: 16, height: 16 }), 0);

        let target = pool.acquire(10.0, 10.0, 1.0);
        let texture = target.texture().clone();
        pool.release(target);
        pool.clear(true);
        assert!(texture.is_destroyed());
    }
}
