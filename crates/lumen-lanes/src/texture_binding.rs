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

//! GPU-side texture mirrors and texture-unit bookkeeping.
//!
//! The [`TextureBindingCache`] is the only component that changes which texture
//! occupies which unit. For every [`TextureResource`] it has bound it keeps a
//! [`GpuTextureShadow`] holding the device texture and the resource's change
//! counters as of the last upload. A bind compares those counters and re-uploads
//! pixels or re-applies sampler state only when the resource moved ahead.

use ahash::AHashMap;
use lumen_core::asset::{TextureHandle, TextureResource, TextureResourceId};
use lumen_core::math::{Extent2D, Extent3D, Origin3D};
use lumen_core::renderer::{
    DeviceLimits, GraphicsDevice, ResourceError, TextureDescriptor, TextureFormat, TextureId,
    TextureUsage,
};
use std::borrow::Cow;
use std::rc::{Rc, Weak};

/// The GPU mirror of a [`TextureResource`].
#[derive(Debug)]
pub struct GpuTextureShadow {
    handle: TextureId,
    stencil: Option<TextureId>,
    size: Extent2D,
    format: TextureFormat,
    dirty_id: u64,
    dirty_style_id: u64,
    render_target: bool,
    source: Weak<TextureResource>,
}

impl GpuTextureShadow {
    /// The device texture.
    pub fn handle(&self) -> TextureId {
        self.handle
    }

    /// The depth/stencil attachment of a render target, if requested.
    pub fn stencil(&self) -> Option<TextureId> {
        self.stencil
    }

    /// The size the device texture was allocated with.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// The texel format of the device texture.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The resource's `dirty_id` as of the last upload.
    pub fn dirty_id(&self) -> u64 {
        self.dirty_id
    }

    /// The resource's `dirty_style_id` as of the last sampler update.
    pub fn dirty_style_id(&self) -> u64 {
        self.dirty_style_id
    }

    /// Returns `true` if the mirrored resource is an offscreen render target.
    pub fn is_render_target(&self) -> bool {
        self.render_target
    }

    /// The mirrored resource, unless it has been dropped.
    pub fn source(&self) -> Option<TextureHandle> {
        self.source.upgrade()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitState {
    /// Something outside the cache may have changed the unit.
    Unknown,
    /// The placeholder texture is bound.
    Empty,
    Bound(TextureResourceId),
}

/// Tracks texture units and lazily mirrors textures onto the device.
#[derive(Debug)]
pub struct TextureBindingCache {
    shadows: AHashMap<TextureResourceId, GpuTextureShadow>,
    managed: Vec<TextureResourceId>,
    units: Vec<UnitState>,
    placeholder: Option<TextureId>,
    current_tick: u64,
    supports_npot_repeat: bool,
}

impl TextureBindingCache {
    /// Creates a cache for a device with the given limits. All units start unknown.
    pub fn new(limits: &DeviceLimits) -> Self {
        Self {
            shadows: AHashMap::new(),
            managed: Vec::new(),
            units: vec![UnitState::Unknown; limits.max_texture_units as usize],
            placeholder: None,
            current_tick: 0,
            supports_npot_repeat: limits.supports_npot_repeat,
        }
    }

    /// Sets the garbage-collector tick written into `touched` by binds.
    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    /// The tick written into `touched` by binds.
    pub fn tick(&self) -> u64 {
        self.current_tick
    }

    /// Number of texture units tracked.
    pub fn unit_count(&self) -> u32 {
        self.units.len() as u32
    }

    /// Ensures `texture` is resident and current on the device and bound to `unit`.
    ///
    /// Binding a texture that is not [valid](TextureResource::is_valid) does nothing.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `unit` is not a texture unit of the device.
    pub fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        texture: &TextureHandle,
        unit: u32,
    ) -> Result<(), ResourceError> {
        if unit as usize >= self.units.len() {
            return Err(ResourceError::OutOfBounds);
        }
        if !texture.is_valid() {
            return Ok(());
        }
        texture.set_touched(self.current_tick);

        let id = texture.id();
        if !self.shadows.contains_key(&id) {
            let shadow = Self::create_shadow(device, texture)?;
            self.shadows.insert(id, shadow);
            self.managed.push(id);
        }
        self.sync(device, texture)?;

        let handle = match self.shadows.get(&id) {
            Some(shadow) => shadow.handle,
            None => return Err(ResourceError::NotFound),
        };
        if self.units[unit as usize] != UnitState::Bound(id) {
            device.bind_texture(unit, Some(handle))?;
            self.units[unit as usize] = UnitState::Bound(id);
        }
        Ok(())
    }

    fn create_shadow(
        device: &dyn GraphicsDevice,
        texture: &TextureHandle,
    ) -> Result<GpuTextureShadow, ResourceError> {
        let size = texture.size();
        let (handle, stencil) = Self::allocate_storage(device, texture, size)?;
        log::debug!(
            "TextureBindingCache: Created GPU texture {:?} for {:?} ({}x{})",
            handle,
            texture.id(),
            size.width,
            size.height
        );

        Ok(GpuTextureShadow {
            handle,
            stencil,
            size,
            format: texture.format(),
            dirty_id: 0,
            dirty_style_id: 0,
            render_target: texture.is_render_target(),
            source: Rc::downgrade(texture),
        })
    }

    fn allocate_storage(
        device: &dyn GraphicsDevice,
        texture: &TextureResource,
        size: Extent2D,
    ) -> Result<(TextureId, Option<TextureId>), ResourceError> {
        let label = texture.label().map(Cow::Borrowed);
        let usage = if texture.is_render_target() {
            TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT
        } else {
            TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST
        };
        let handle = device.create_texture(&TextureDescriptor {
            label: label.clone(),
            size,
            format: texture.format(),
            usage,
            premultiply_alpha: texture.premultiply_alpha(),
        })?;

        let stencil = if texture.is_render_target() && texture.has_stencil() {
            let stencil = device.create_texture(&TextureDescriptor {
                label,
                size,
                format: TextureFormat::Depth24PlusStencil8,
                usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
                premultiply_alpha: false,
            });
            match stencil {
                Ok(id) => Some(id),
                Err(e) => {
                    Self::release(device, handle, None);
                    return Err(e);
                }
            }
        } else {
            None
        };
        Ok((handle, stencil))
    }

    fn sync(
        &mut self,
        device: &dyn GraphicsDevice,
        texture: &TextureResource,
    ) -> Result<(), ResourceError> {
        let id = texture.id();
        let shadow = self.shadows.get_mut(&id).ok_or(ResourceError::NotFound)?;

        if shadow.dirty_id != texture.dirty_id() {
            let size = texture.size();
            let stencil_changed = shadow.stencil.is_some() != texture.has_stencil();
            if size != shadow.size || (shadow.render_target && stencil_changed) {
                let (handle, stencil) = Self::allocate_storage(device, texture, size)?;
                Self::release(device, shadow.handle, shadow.stencil);
                shadow.handle = handle;
                shadow.stencil = stencil;
                shadow.size = size;
                shadow.dirty_style_id = 0;
                for unit in self.units.iter_mut() {
                    if *unit == UnitState::Bound(id) {
                        *unit = UnitState::Unknown;
                    }
                }
            }

            if let Some(pixels) = texture.pixels() {
                let bytes_per_row = size.width * texture.format().bytes_per_pixel();
                device.write_texture(
                    shadow.handle,
                    &pixels,
                    Some(bytes_per_row),
                    Origin3D::ZERO,
                    Extent3D::from(size),
                )?;
            }
            shadow.dirty_id = texture.dirty_id();
        }

        if shadow.dirty_style_id != texture.dirty_style_id() {
            let style = texture
                .style()
                .coerced_for(shadow.size, self.supports_npot_repeat);
            device.apply_sampler_state(shadow.handle, &style)?;
            shadow.dirty_style_id = texture.dirty_style_id();
        }
        Ok(())
    }

    fn release(device: &dyn GraphicsDevice, handle: TextureId, stencil: Option<TextureId>) {
        for id in std::iter::once(handle).chain(stencil) {
            if let Err(e) = device.destroy_texture(id) {
                log::warn!("TextureBindingCache: Failed to destroy texture {id:?}: {e:?}");
            }
        }
    }

    fn ensure_placeholder(&mut self, device: &dyn GraphicsDevice) -> Result<TextureId, ResourceError> {
        if let Some(id) = self.placeholder {
            return Ok(id);
        }
        let size = Extent2D::new(1, 1);
        let id = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Empty Texture")),
            size,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            premultiply_alpha: true,
        })?;
        device.write_texture(id, &[0, 0, 0, 0], Some(4), Origin3D::ZERO, Extent3D::from(size))?;
        self.placeholder = Some(id);
        Ok(id)
    }

    /// Replaces `texture` with the placeholder on every unit holding it.
    pub fn unbind(
        &mut self,
        device: &dyn GraphicsDevice,
        texture: TextureResourceId,
    ) -> Result<(), ResourceError> {
        if !self.units.contains(&UnitState::Bound(texture)) {
            return Ok(());
        }
        let placeholder = self.ensure_placeholder(device)?;
        for (unit, state) in self.units.iter_mut().enumerate() {
            if *state == UnitState::Bound(texture) {
                device.bind_texture(unit as u32, Some(placeholder))?;
                *state = UnitState::Empty;
            }
        }
        Ok(())
    }

    /// Marks every unit unknown so the next bind re-issues it.
    ///
    /// Call after anything other than this cache changed texture bindings.
    pub fn reset(&mut self) {
        self.units.fill(UnitState::Unknown);
    }

    /// The resource the cache believes is bound to each unit.
    ///
    /// Unknown and placeholder units read as `None`.
    pub fn bound_units_snapshot(&self) -> Vec<Option<TextureResourceId>> {
        self.units
            .iter()
            .map(|state| match state {
                UnitState::Bound(id) => Some(*id),
                UnitState::Unknown | UnitState::Empty => None,
            })
            .collect()
    }

    /// The resource bound to `unit`, if known.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureResourceId> {
        match self.units.get(unit as usize) {
            Some(UnitState::Bound(id)) => Some(*id),
            _ => None,
        }
    }

    /// The mirror of a resource, if resident.
    pub fn shadow(&self, texture: TextureResourceId) -> Option<&GpuTextureShadow> {
        self.shadows.get(&texture)
    }

    /// Number of resident textures.
    pub fn managed_count(&self) -> usize {
        self.managed.len()
    }

    /// Resident textures, in the order they became resident.
    pub fn managed(&self) -> &[TextureResourceId] {
        &self.managed
    }

    /// Frees the device storage of one texture. The resource itself is untouched
    /// and is uploaded again by its next bind.
    ///
    /// Returns `false` if the texture was not resident.
    pub fn destroy_texture(
        &mut self,
        device: &dyn GraphicsDevice,
        texture: TextureResourceId,
    ) -> bool {
        if !self.shadows.contains_key(&texture) {
            return false;
        }
        self.evict(device, texture);
        self.managed.retain(|id| *id != texture);
        true
    }

    fn evict(&mut self, device: &dyn GraphicsDevice, texture: TextureResourceId) {
        if let Err(e) = self.unbind(device, texture) {
            log::warn!("TextureBindingCache: Failed to unbind {texture:?}: {e:?}");
            for state in self.units.iter_mut() {
                if *state == UnitState::Bound(texture) {
                    *state = UnitState::Unknown;
                }
            }
        }
        if let Some(shadow) = self.shadows.remove(&texture) {
            Self::release(device, shadow.handle, shadow.stencil);
            log::debug!("TextureBindingCache: Evicted {texture:?}");
        }
    }

    /// Evicts every resident texture matching `predicate` and compacts the
    /// managed list. Returns the number evicted.
    pub fn evict_where(
        &mut self,
        device: &dyn GraphicsDevice,
        mut predicate: impl FnMut(&GpuTextureShadow) -> bool,
    ) -> usize {
        let doomed: Vec<TextureResourceId> = self
            .managed
            .iter()
            .copied()
            .filter(|id| self.shadows.get(id).is_some_and(&mut predicate))
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        for &id in &doomed {
            self.evict(device, id);
        }
        self.managed.retain(|id| self.shadows.contains_key(id));
        doomed.len()
    }

    /// Frees mirrors whose resource was destroyed or dropped.
    pub fn sweep_disposed(&mut self, device: &dyn GraphicsDevice) -> usize {
        self.evict_where(device, |shadow| {
            shadow
                .source()
                .map_or(true, |texture| texture.is_destroyed())
        })
    }

    /// Forgets all device state without calling the device, after the graphics
    /// context was lost. The next bind of each texture uploads it again.
    pub fn context_lost(&mut self) {
        self.shadows.clear();
        self.managed.clear();
        self.placeholder = None;
        self.reset();
    }

    /// Destroys every device texture owned by the cache.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for (_, shadow) in self.shadows.drain() {
            Self::release(device, shadow.handle, shadow.stencil);
        }
        if let Some(placeholder) = self.placeholder.take() {
            Self::release(device, placeholder, None);
        }
        self.managed.clear();
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::math::dimension;
    use lumen_core::renderer::{
        AddressMode, BlendMode, BufferDescriptor, BufferId, GraphicsAdapterInfo, IndexFormat,
        PrimitiveTopology, SamplerStyle, ShaderModuleDescriptor, ShaderModuleId,
    };
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(TextureId, Extent2D),
        Write(TextureId),
        Style(TextureId, SamplerStyle),
        Destroy(TextureId),
        Bind(u32, Option<TextureId>),
    }

    /// A mock graphics device recording texture traffic.
    #[derive(Debug)]
    struct MockGraphicsDevice {
        next_id: AtomicUsize,
        limits: DeviceLimits,
        calls: RefCell<Vec<Call>>,
    }

    impl MockGraphicsDevice {
        fn new(units: u32, supports_npot_repeat: bool) -> Self {
            Self {
                next_id: AtomicUsize::new(1),
                limits: DeviceLimits {
                    max_texture_units: units,
                    supports_npot_repeat,
                    ..Default::default()
                },
                calls: RefCell::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut self.calls.borrow_mut())
        }
    }

    impl GraphicsDevice for MockGraphicsDevice {
        fn create_buffer(&self, _d: &BufferDescriptor) -> Result<BufferId, ResourceError> {
            Ok(BufferId(self.next_id.fetch_add(1, Ordering::Relaxed)))
        }
        fn write_buffer(&self, _id: BufferId, _o: u64, _d: &[u8]) -> Result<(), ResourceError> {
            Ok(())
        }
        fn destroy_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_vertex_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_index_buffer(&self, _id: BufferId, _f: IndexFormat) -> Result<(), ResourceError> {
            Ok(())
        }
        fn create_texture(&self, d: &TextureDescriptor) -> Result<TextureId, ResourceError> {
            let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.calls.borrow_mut().push(Call::Create(id, d.size));
            Ok(id)
        }
        fn write_texture(
            &self,
            id: TextureId,
            _data: &[u8],
            _bpr: Option<u32>,
            _o: dimension::Origin3D,
            _s: dimension::Extent3D,
        ) -> Result<(), ResourceError> {
            self.calls.borrow_mut().push(Call::Write(id));
            Ok(())
        }
        fn apply_sampler_state(&self, id: TextureId, s: &SamplerStyle) -> Result<(), ResourceError> {
            self.calls.borrow_mut().push(Call::Style(id, *s));
            Ok(())
        }
        fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
            self.calls.borrow_mut().push(Call::Destroy(id));
            Ok(())
        }
        fn bind_texture(&self, unit: u32, t: Option<TextureId>) -> Result<(), ResourceError> {
            self.calls.borrow_mut().push(Call::Bind(unit, t));
            Ok(())
        }
        fn create_shader_module(
            &self,
            _d: &ShaderModuleDescriptor,
        ) -> Result<ShaderModuleId, ResourceError> {
            Ok(ShaderModuleId(self.next_id.fetch_add(1, Ordering::Relaxed)))
        }
        fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_shader(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn set_blend_mode(&self, _m: BlendMode) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_indexed(&self, _t: PrimitiveTopology, _c: u32, _f: u32) -> Result<(), ResourceError> {
            Ok(())
        }
        fn limits(&self) -> DeviceLimits {
            self.limits
        }
        fn adapter_info(&self) -> GraphicsAdapterInfo {
            GraphicsAdapterInfo::default()
        }
    }

    fn rgba(width: u32, height: u32) -> TextureHandle {
        TextureResource::from_pixels(
            Extent2D::new(width, height),
            TextureFormat::Rgba8Unorm,
            vec![0x80; (width * height * 4) as usize],
        )
    }

    #[test]
    fn test_first_bind_creates_uploads_and_binds() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(2, 2);

        cache.set_tick(7);
        cache.bind(&device, &texture, 1).unwrap();

        let handle = cache.shadow(texture.id()).unwrap().handle();
        assert_eq!(
            device.take(),
            vec![
                Call::Create(handle, Extent2D::new(2, 2)),
                Call::Write(handle),
                Call::Style(handle, SamplerStyle::default()),
                Call::Bind(1, Some(handle)),
            ]
        );
        assert_eq!(texture.touched(), 7);
        assert_eq!(cache.bound_texture(1), Some(texture.id()));
        assert_eq!(cache.managed_count(), 1);
    }

    #[test]
    fn test_rebind_same_unit_is_free() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(2, 2);

        cache.bind(&device, &texture, 0).unwrap();
        device.take();
        cache.bind(&device, &texture, 0).unwrap();
        assert!(device.take().is_empty());
    }

    #[test]
    fn test_dirty_texture_is_reuploaded() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(2, 2);
        cache.bind(&device, &texture, 0).unwrap();
        let handle = cache.shadow(texture.id()).unwrap().handle();
        device.take();

        texture.update_pixels(vec![0; 16]);
        cache.bind(&device, &texture, 0).unwrap();
        assert_eq!(device.take(), vec![Call::Write(handle)]);
        assert_eq!(
            cache.shadow(texture.id()).unwrap().dirty_id(),
            texture.dirty_id()
        );
    }

    #[test]
    fn test_resize_reallocates_and_rebinds() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(2, 2);
        cache.bind(&device, &texture, 0).unwrap();
        let old = cache.shadow(texture.id()).unwrap().handle();
        device.take();

        texture.resize(Extent2D::new(4, 4), Some(vec![0; 64]));
        cache.bind(&device, &texture, 0).unwrap();
        let new = cache.shadow(texture.id()).unwrap().handle();
        assert_ne!(old, new);
        assert_eq!(
            device.take(),
            vec![
                Call::Create(new, Extent2D::new(4, 4)),
                Call::Destroy(old),
                Call::Write(new),
                Call::Style(new, SamplerStyle::default()),
                Call::Bind(0, Some(new)),
            ]
        );
    }

    #[test]
    fn test_npot_style_is_coerced() {
        let device = MockGraphicsDevice::new(4, false);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(3, 2);
        texture.set_style(SamplerStyle {
            wrap: AddressMode::Repeat,
            mipmap: true,
            ..Default::default()
        });

        cache.bind(&device, &texture, 0).unwrap();
        let applied = device.take().into_iter().find_map(|call| match call {
            Call::Style(_, style) => Some(style),
            _ => None,
        });
        assert_eq!(applied.unwrap().wrap, AddressMode::ClampToEdge);
        assert!(!applied.unwrap().mipmap);
    }

    #[test]
    fn test_invalid_texture_bind_is_a_noop() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let pending = TextureResource::pending();

        cache.bind(&device, &pending, 0).unwrap();
        assert!(device.take().is_empty());
        assert_eq!(cache.managed_count(), 0);
    }

    #[test]
    fn test_unit_out_of_range() {
        let device = MockGraphicsDevice::new(2, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        assert!(matches!(
            cache.bind(&device, &rgba(1, 1), 2),
            Err(ResourceError::OutOfBounds)
        ));
    }

    #[test]
    fn test_unbind_substitutes_placeholder() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(1, 1);
        cache.bind(&device, &texture, 0).unwrap();
        cache.bind(&device, &texture, 2).unwrap();
        device.take();

        cache.unbind(&device, texture.id()).unwrap();
        let calls = device.take();
        let Call::Create(placeholder, size) = calls[0].clone() else {
            panic!("expected the placeholder to be created first, got {calls:?}");
        };
        assert_eq!(size, Extent2D::new(1, 1));
        assert!(calls.contains(&Call::Bind(0, Some(placeholder))));
        assert!(calls.contains(&Call::Bind(2, Some(placeholder))));
        assert_eq!(cache.bound_texture(0), None);
        assert_eq!(cache.bound_texture(2), None);
    }

    #[test]
    fn test_reset_forces_rebind() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(1, 1);
        cache.bind(&device, &texture, 0).unwrap();
        let handle = cache.shadow(texture.id()).unwrap().handle();
        device.take();

        cache.reset();
        assert_eq!(cache.bound_units_snapshot(), vec![None; 4]);
        cache.bind(&device, &texture, 0).unwrap();
        assert_eq!(device.take(), vec![Call::Bind(0, Some(handle))]);
    }

    #[test]
    fn test_destroyed_and_dropped_textures_are_swept() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let kept = rgba(1, 1);
        let destroyed = rgba(1, 1);
        let dropped = rgba(1, 1);
        for (unit, texture) in [&kept, &destroyed, &dropped].into_iter().enumerate() {
            cache.bind(&device, texture, unit as u32).unwrap();
        }

        destroyed.destroy();
        drop(dropped);
        assert_eq!(cache.sweep_disposed(&device), 2);
        assert_eq!(cache.managed(), &[kept.id()]);
        assert_eq!(cache.bound_texture(1), None);
    }

    #[test]
    fn test_destroy_texture_keeps_resource_reusable() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(1, 1);
        cache.bind(&device, &texture, 0).unwrap();

        assert!(cache.destroy_texture(&device, texture.id()));
        assert!(!cache.destroy_texture(&device, texture.id()));
        assert!(cache.shadow(texture.id()).is_none());

        device.take();
        cache.bind(&device, &texture, 0).unwrap();
        let calls = device.take();
        assert!(matches!(calls[0], Call::Create(..)));
        assert!(calls.iter().any(|call| matches!(call, Call::Write(_))));
    }

    #[test]
    fn test_render_target_with_stencil() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let target = TextureResource::render_target(Extent2D::new(64, 32), 1.0, true);

        cache.bind(&device, &target, 0).unwrap();
        let shadow = cache.shadow(target.id()).unwrap();
        assert!(shadow.is_render_target());
        assert!(shadow.stencil().is_some());
        assert!(!device
            .take()
            .iter()
            .any(|call| matches!(call, Call::Write(_))));
    }

    #[test]
    fn test_context_lost_forgets_without_device_calls() {
        let device = MockGraphicsDevice::new(4, true);
        let mut cache = TextureBindingCache::new(&device.limits());
        let texture = rgba(1, 1);
        cache.bind(&device, &texture, 0).unwrap();
        device.take();

        cache.context_lost();
        assert!(device.take().is_empty());
        assert_eq!(cache.managed_count(), 0);

        cache.bind(&device, &texture, 0).unwrap();
        assert!(matches!(device.take()[0], Call::Create(..)));
    }
}
