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

use crate::math::{is_pow2, Extent2D};
use crate::renderer::api::{SamplerStyle, TextureFormat};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique, stable identifier for a [`TextureResource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureResourceId(u64);

impl TextureResourceId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A shared, single-threaded reference to a texture resource.
pub type TextureHandle = Rc<TextureResource>;

/// A GPU-uploadable pixel source.
///
/// Mutations go through `&self` and bump change counters: `dirty_id` when the
/// pixels or dimensions change, `dirty_style_id` when the sampler style changes.
/// GPU-side mirrors compare against these counters to know when a re-upload is
/// owed. Both counters start at 1 so a fresh mirror (at 0) is always stale.
#[derive(Debug)]
pub struct TextureResource {
    id: TextureResourceId,
    label: Option<String>,
    size: Cell<Extent2D>,
    format: TextureFormat,
    pixels: RefCell<Option<Vec<u8>>>,
    premultiply_alpha: Cell<bool>,
    style: Cell<SamplerStyle>,
    resolution: Cell<f32>,
    render_target: bool,
    stencil: Cell<bool>,
    dirty_id: Cell<u64>,
    dirty_style_id: Cell<u64>,
    touched: Cell<u64>,
    destroyed: Cell<bool>,
}

impl TextureResource {
    fn new(
        label: Option<String>,
        size: Extent2D,
        format: TextureFormat,
        pixels: Option<Vec<u8>>,
        render_target: bool,
    ) -> Self {
        Self {
            id: TextureResourceId::next(),
            label,
            size: Cell::new(size),
            format,
            pixels: RefCell::new(pixels),
            premultiply_alpha: Cell::new(true),
            style: Cell::new(SamplerStyle::default()),
            resolution: Cell::new(1.0),
            render_target,
            stencil: Cell::new(false),
            dirty_id: Cell::new(1),
            dirty_style_id: Cell::new(1),
            touched: Cell::new(0),
            destroyed: Cell::new(false),
        }
    }

    /// Creates a texture from decoded, tightly packed pixels.
    ///
    /// The texture is only [valid](Self::is_valid) if `pixels` holds exactly
    /// `width * height * bytes_per_pixel` bytes.
    pub fn from_pixels(size: Extent2D, format: TextureFormat, pixels: Vec<u8>) -> TextureHandle {
        Rc::new(Self::new(None, size, format, Some(pixels), false))
    }

    /// Creates a labelled texture from decoded pixels.
    pub fn from_pixels_labelled(
        label: impl Into<String>,
        size: Extent2D,
        format: TextureFormat,
        pixels: Vec<u8>,
    ) -> TextureHandle {
        Rc::new(Self::new(
            Some(label.into()),
            size,
            format,
            Some(pixels),
            false,
        ))
    }

    /// Creates a texture with no pixel data yet, e.g. while its image is loading.
    pub fn pending() -> TextureHandle {
        Rc::new(Self::new(
            None,
            Extent2D::new(0, 0),
            TextureFormat::Rgba8Unorm,
            None,
            false,
        ))
    }

    /// Creates an offscreen render target of `size` pixels.
    ///
    /// Render targets have no CPU-side pixels and are never collected by the
    /// texture garbage collector.
    pub fn render_target(size: Extent2D, resolution: f32, stencil: bool) -> TextureHandle {
        let texture = Self::new(None, size, TextureFormat::Rgba8Unorm, None, true);
        texture.resolution.set(resolution);
        texture.stencil.set(stencil);
        Rc::new(texture)
    }

    /// Returns the stable id of this resource.
    pub fn id(&self) -> TextureResourceId {
        self.id
    }

    /// Returns the debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the size in pixels.
    pub fn size(&self) -> Extent2D {
        self.size.get()
    }

    /// Returns the texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Borrows the CPU-side pixels, if the resource has any.
    pub fn pixels(&self) -> Option<Ref<'_, [u8]>> {
        Ref::filter_map(self.pixels.borrow(), |pixels| pixels.as_deref()).ok()
    }

    /// Replaces the pixels, keeping the current size.
    pub fn update_pixels(&self, pixels: Vec<u8>) {
        *self.pixels.borrow_mut() = Some(pixels);
        self.bump_dirty();
    }

    /// Changes the dimensions, optionally with new pixels.
    ///
    /// Render targets pass `None`; their storage is owned by the device.
    pub fn resize(&self, size: Extent2D, pixels: Option<Vec<u8>>) {
        self.size.set(size);
        if pixels.is_some() {
            *self.pixels.borrow_mut() = pixels;
        }
        self.bump_dirty();
    }

    /// Returns whether the pixels are premultiplied by alpha.
    pub fn premultiply_alpha(&self) -> bool {
        self.premultiply_alpha.get()
    }

    /// Sets whether the pixels are premultiplied by alpha. Forces a re-upload.
    pub fn set_premultiply_alpha(&self, premultiply_alpha: bool) {
        if self.premultiply_alpha.replace(premultiply_alpha) != premultiply_alpha {
            self.bump_dirty();
        }
    }

    /// Returns the requested sampler style.
    pub fn style(&self) -> SamplerStyle {
        self.style.get()
    }

    /// Changes the sampler style.
    pub fn set_style(&self, style: SamplerStyle) {
        if self.style.replace(style) != style {
            self.dirty_style_id.set(self.dirty_style_id.get() + 1);
        }
    }

    /// Returns the pixel density; logical size is pixel size divided by this.
    pub fn resolution(&self) -> f32 {
        self.resolution.get()
    }

    /// Sets the pixel density without touching storage.
    pub fn set_resolution(&self, resolution: f32) {
        self.resolution.set(resolution);
    }

    /// Returns the logical `(width, height)`.
    pub fn logical_size(&self) -> (f32, f32) {
        let size = self.size.get();
        let resolution = self.resolution.get();
        (
            size.width as f32 / resolution,
            size.height as f32 / resolution,
        )
    }

    /// Returns `true` for offscreen render targets.
    pub fn is_render_target(&self) -> bool {
        self.render_target
    }

    /// Returns `true` if a depth/stencil attachment accompanies the color storage.
    pub fn has_stencil(&self) -> bool {
        self.stencil.get()
    }

    /// Requests or drops a depth/stencil attachment.
    pub fn set_stencil(&self, stencil: bool) {
        if self.stencil.replace(stencil) != stencil {
            self.bump_dirty();
        }
    }

    /// Counter bumped on every pixel or size change.
    pub fn dirty_id(&self) -> u64 {
        self.dirty_id.get()
    }

    /// Counter bumped on every sampler style change.
    pub fn dirty_style_id(&self) -> u64 {
        self.dirty_style_id.get()
    }

    /// The garbage-collector tick at which the texture was last bound.
    pub fn touched(&self) -> u64 {
        self.touched.get()
    }

    /// Records the garbage-collector tick of a bind.
    pub fn set_touched(&self, tick: u64) {
        self.touched.set(tick);
    }

    /// Returns `true` if the texture has nonzero dimensions and, unless it is a
    /// render target, pixel data matching them.
    pub fn is_valid(&self) -> bool {
        if self.destroyed.get() {
            return false;
        }
        let size = self.size.get();
        if size.is_empty() {
            return false;
        }
        if self.render_target {
            return true;
        }
        let expected = size.area() * self.format.bytes_per_pixel() as u64;
        self.pixels
            .borrow()
            .as_ref()
            .is_some_and(|pixels| pixels.len() as u64 == expected)
    }

    /// Returns `true` if both dimensions are powers of two.
    pub fn is_power_of_two(&self) -> bool {
        let size = self.size.get();
        is_pow2(size.width) && is_pow2(size.height)
    }

    /// Marks the resource destroyed and drops its pixels.
    ///
    /// GPU-side mirrors are released on the binding cache's next sweep.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.pixels.borrow_mut().take();
        log::debug!(
            "TextureResource: Destroyed '{}' ({:?})",
            self.label.as_deref().unwrap_or("unlabelled"),
            self.id
        );
    }

    /// Returns `true` once [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn bump_dirty(&self) {
        self.dirty_id.set(self.dirty_id.get() + 1);
    }
}
