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

use ahash::AHashMap;
use lumen_core::math::dimension;
use lumen_core::math::Extent2D;
use lumen_core::renderer::{
    BlendMode, BufferDescriptor, BufferId, DeviceLimits, GraphicsAdapterInfo, GraphicsDevice,
    IndexFormat, PrimitiveTopology, RendererDeviceType, ResourceError, SamplerStyle,
    ShaderError, ShaderModuleDescriptor, ShaderModuleId, TextureDescriptor, TextureFormat,
    TextureId,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A command received by a [`HeadlessDevice`], in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// A buffer was created.
    CreateBuffer {
        /// The new buffer.
        id: BufferId,
        /// Its size in bytes.
        size: u64,
    },
    /// Bytes were written into a buffer.
    WriteBuffer {
        /// The destination buffer.
        id: BufferId,
        /// Destination offset in bytes.
        offset: u64,
        /// Number of bytes written.
        len: usize,
    },
    /// A buffer was destroyed.
    DestroyBuffer {
        /// The destroyed buffer.
        id: BufferId,
    },
    /// A vertex buffer was bound.
    BindVertexBuffer {
        /// The bound buffer.
        id: BufferId,
    },
    /// An index buffer was bound.
    BindIndexBuffer {
        /// The bound buffer.
        id: BufferId,
        /// The index type.
        format: IndexFormat,
    },
    /// A texture was created.
    CreateTexture {
        /// The new texture.
        id: TextureId,
        /// Its size in texels.
        size: Extent2D,
        /// Its texel format.
        format: TextureFormat,
    },
    /// Texels were uploaded.
    WriteTexture {
        /// The destination texture.
        id: TextureId,
        /// Number of bytes uploaded.
        len: usize,
    },
    /// Sampler parameters were applied to a texture.
    ApplySampler {
        /// The styled texture.
        id: TextureId,
        /// The applied style.
        style: SamplerStyle,
    },
    /// A texture was destroyed.
    DestroyTexture {
        /// The destroyed texture.
        id: TextureId,
    },
    /// A texture unit changed.
    BindTexture {
        /// The texture unit.
        unit: u32,
        /// The texture now bound there.
        texture: Option<TextureId>,
    },
    /// A shader module was compiled.
    CreateShader {
        /// The new module.
        id: ShaderModuleId,
        /// The number of sampler array elements it declares.
        sampler_count: usize,
    },
    /// A shader module was destroyed.
    DestroyShader {
        /// The destroyed module.
        id: ShaderModuleId,
    },
    /// A shader module was made current.
    BindShader {
        /// The bound module.
        id: ShaderModuleId,
    },
    /// The blend state changed.
    SetBlendMode {
        /// The new blend mode.
        mode: BlendMode,
    },
    /// An indexed draw was issued.
    DrawIndexed {
        /// The draw's snapshot of bound state.
        draw: DrawRecord,
    },
}

/// The state an indexed draw executed with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// How indices were assembled.
    pub topology: PrimitiveTopology,
    /// Number of indices drawn.
    pub index_count: u32,
    /// Offset, in indices, into the bound index buffer.
    pub first_index: u32,
    /// The blend mode in effect.
    pub blend_mode: BlendMode,
    /// The bound shader.
    pub shader: ShaderModuleId,
    /// The texture bound to each unit the shader samples, in sampler order.
    pub textures: Vec<Option<TextureId>>,
    /// The indices read by the draw.
    pub indices: Vec<u32>,
}

#[derive(Debug)]
struct HeadlessTexture {
    size: Extent2D,
    format: TextureFormat,
    data: Vec<u8>,
    style: SamplerStyle,
}

#[derive(Debug)]
struct HeadlessShader {
    sampler_units: Vec<u32>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: usize,
    buffers: AHashMap<BufferId, Vec<u8>>,
    textures: AHashMap<TextureId, HeadlessTexture>,
    shaders: AHashMap<ShaderModuleId, HeadlessShader>,
    units: Vec<Option<TextureId>>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<(BufferId, IndexFormat)>,
    shader: Option<ShaderModuleId>,
    blend_mode: BlendMode,
    allocated_bytes: u64,
    commands: Vec<DeviceCommand>,
}

impl HeadlessState {
    fn generate_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn reserve(&mut self, bytes: u64, budget: Option<u64>) -> Result<(), ResourceError> {
        if let Some(budget) = budget {
            if self.allocated_bytes + bytes > budget {
                log::warn!(
                    "HeadlessDevice: Allocation of {bytes} bytes exceeds the {budget} byte budget"
                );
                return Err(ResourceError::AllocationFailed {
                    requested_bytes: bytes,
                });
            }
        }
        self.allocated_bytes += bytes;
        Ok(())
    }

    fn read_indices(&self, first_index: u32, index_count: u32) -> Result<Vec<u32>, ResourceError> {
        let (id, format) = self.index_buffer.ok_or(ResourceError::InvalidHandle)?;
        let data = self.buffers.get(&id).ok_or(ResourceError::NotFound)?;
        let stride = format.size() as usize;
        let start = first_index as usize * stride;
        let end = start + index_count as usize * stride;
        let bytes = data.get(start..end).ok_or(ResourceError::OutOfBounds)?;

        Ok(bytes
            .chunks_exact(stride)
            .map(|chunk| match format {
                IndexFormat::Uint16 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
                IndexFormat::Uint32 => {
                    u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
                }
            })
            .collect())
    }
}

/// A [`GraphicsDevice`] that keeps every resource in CPU memory.
///
/// Nothing is rasterized. Buffers and textures hold the bytes written to them,
/// draws are validated against the bound state, and every call is appended to a
/// command log that callers can inspect with [`commands`](Self::commands).
#[derive(Debug)]
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
    limits: DeviceLimits,
    max_if_statements: Option<usize>,
    memory_budget: Option<u64>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device with default limits and no memory budget.
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    /// Creates a device reporting the given limits.
    pub fn with_limits(limits: DeviceLimits) -> Self {
        let state = HeadlessState {
            units: vec![None; limits.max_texture_units as usize],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            limits,
            max_if_statements: None,
            memory_budget: None,
        }
    }

    /// Rejects fragment stages containing more than `count` `if` statements,
    /// emulating drivers with a small branch budget.
    pub fn with_max_if_statements(mut self, count: usize) -> Self {
        self.max_if_statements = Some(count);
        self
    }

    /// Fails allocations once `bytes` of buffer and texture storage are live.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, HeadlessState>, ResourceError> {
        self.state
            .lock()
            .map_err(|_| ResourceError::BackendError("headless device state poisoned".into()))
    }

    fn inspect(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the command log.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.inspect().commands.clone()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.inspect().commands)
    }

    /// Returns every draw in the command log, in order.
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.inspect()
            .commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::DrawIndexed { draw } => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of draws in the command log.
    pub fn draw_calls(&self) -> usize {
        self.inspect()
            .commands
            .iter()
            .filter(|command| matches!(command, DeviceCommand::DrawIndexed { .. }))
            .count()
    }

    /// Returns the number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.inspect().buffers.len()
    }

    /// Returns the number of live textures.
    pub fn live_textures(&self) -> usize {
        self.inspect().textures.len()
    }

    /// Returns the number of live shader modules.
    pub fn live_shaders(&self) -> usize {
        self.inspect().shaders.len()
    }

    /// Returns the bytes currently allocated to buffers and textures.
    pub fn allocated_bytes(&self) -> u64 {
        self.inspect().allocated_bytes
    }

    /// Returns a copy of a buffer's contents.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.inspect().buffers.get(&id).cloned()
    }

    /// Returns a copy of a texture's texels.
    pub fn texture_contents(&self, id: TextureId) -> Option<Vec<u8>> {
        self.inspect().textures.get(&id).map(|t| t.data.clone())
    }

    /// Returns a texture's size.
    pub fn texture_size(&self, id: TextureId) -> Option<Extent2D> {
        self.inspect().textures.get(&id).map(|t| t.size)
    }

    /// Returns the last sampler style applied to a texture.
    pub fn texture_style(&self, id: TextureId) -> Option<SamplerStyle> {
        self.inspect().textures.get(&id).map(|t| t.style)
    }

    /// Returns the texture bound to a unit.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.inspect().units.get(unit as usize).copied().flatten()
    }

    /// Simulates another component changing texture bindings behind the
    /// renderer's back.
    pub fn clobber_texture_units(&self) {
        let mut state = self.inspect();
        state.units.iter_mut().for_each(|unit| *unit = None);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state()?;
        state.reserve(descriptor.size, self.memory_budget)?;
        let id = BufferId(state.generate_id());
        state.buffers.insert(id, vec![0; descriptor.size as usize]);
        state.commands.push(DeviceCommand::CreateBuffer {
            id,
            size: descriptor.size,
        });

        log::debug!(
            "HeadlessDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or("unlabelled"),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let buffer = state.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let start = offset as usize;
        let target = buffer
            .get_mut(start..start + data.len())
            .ok_or(ResourceError::OutOfBounds)?;
        target.copy_from_slice(data);
        state.commands.push(DeviceCommand::WriteBuffer {
            id,
            offset,
            len: data.len(),
        });
        log::trace!(
            "HeadlessDevice: Wrote {} bytes to buffer {id:?} at offset {offset}",
            data.len()
        );
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let buffer = state.buffers.remove(&id).ok_or(ResourceError::NotFound)?;
        state.allocated_bytes -= buffer.len() as u64;
        if state.vertex_buffer == Some(id) {
            state.vertex_buffer = None;
        }
        if state.index_buffer.is_some_and(|(index, _)| index == id) {
            state.index_buffer = None;
        }
        state.commands.push(DeviceCommand::DestroyBuffer { id });
        log::debug!("HeadlessDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn bind_vertex_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        if !state.buffers.contains_key(&id) {
            return Err(ResourceError::NotFound);
        }
        state.vertex_buffer = Some(id);
        state.commands.push(DeviceCommand::BindVertexBuffer { id });
        log::trace!("HeadlessDevice: Bound vertex buffer {id:?}");
        Ok(())
    }

    fn bind_index_buffer(&self, id: BufferId, format: IndexFormat) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        if !state.buffers.contains_key(&id) {
            return Err(ResourceError::NotFound);
        }
        state.index_buffer = Some((id, format));
        state
            .commands
            .push(DeviceCommand::BindIndexBuffer { id, format });
        log::trace!("HeadlessDevice: Bound index buffer {id:?} ({format:?})");
        Ok(())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let size = descriptor.size;
        let max = self.limits.max_texture_dimension_2d;
        if size.is_empty() || size.width > max || size.height > max {
            log::warn!(
                "HeadlessDevice: Rejected texture of {}x{} (limit {max})",
                size.width,
                size.height
            );
            return Err(ResourceError::BackendError(format!(
                "texture size {}x{} outside 1..={max}",
                size.width, size.height
            )));
        }

        let bytes = size.area() * descriptor.format.bytes_per_pixel() as u64;
        let mut state = self.state()?;
        state.reserve(bytes, self.memory_budget)?;
        let id = TextureId(state.generate_id());
        state.textures.insert(
            id,
            HeadlessTexture {
                size,
                format: descriptor.format,
                data: vec![0; bytes as usize],
                style: SamplerStyle::default(),
            },
        );
        state.commands.push(DeviceCommand::CreateTexture {
            id,
            size,
            format: descriptor.format,
        });

        log::debug!(
            "HeadlessDevice: Created texture '{}' with ID: {:?}, size: {}x{}",
            descriptor.label.as_deref().unwrap_or("unlabelled"),
            id,
            size.width,
            size.height
        );
        Ok(id)
    }

    fn write_texture(
        &self,
        texture_id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: dimension::Origin3D,
        size: dimension::Extent3D,
    ) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let texture = state
            .textures
            .get_mut(&texture_id)
            .ok_or(ResourceError::NotFound)?;

        if offset.x + size.width > texture.size.width
            || offset.y + size.height > texture.size.height
        {
            return Err(ResourceError::OutOfBounds);
        }

        let texel = texture.format.bytes_per_pixel() as usize;
        let row_len = size.width as usize * texel;
        let src_pitch = bytes_per_row.map_or(row_len, |pitch| pitch as usize);
        let dst_pitch = texture.size.width as usize * texel;
        for row in 0..size.height as usize {
            let src = data
                .get(row * src_pitch..row * src_pitch + row_len)
                .ok_or(ResourceError::OutOfBounds)?;
            let dst_start = (offset.y as usize + row) * dst_pitch + offset.x as usize * texel;
            texture.data[dst_start..dst_start + row_len].copy_from_slice(src);
        }

        state.commands.push(DeviceCommand::WriteTexture {
            id: texture_id,
            len: data.len(),
        });
        log::trace!(
            "HeadlessDevice: Wrote {}x{} texels to texture {texture_id:?}",
            size.width,
            size.height
        );
        Ok(())
    }

    fn apply_sampler_state(
        &self,
        texture_id: TextureId,
        style: &SamplerStyle,
    ) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let texture = state
            .textures
            .get_mut(&texture_id)
            .ok_or(ResourceError::NotFound)?;
        texture.style = *style;
        state.commands.push(DeviceCommand::ApplySampler {
            id: texture_id,
            style: *style,
        });
        log::trace!("HeadlessDevice: Applied {style:?} to texture {texture_id:?}");
        Ok(())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let texture = state.textures.remove(&id).ok_or(ResourceError::NotFound)?;
        state.allocated_bytes -= texture.data.len() as u64;
        for unit in state.units.iter_mut().filter(|unit| **unit == Some(id)) {
            *unit = None;
        }
        state.commands.push(DeviceCommand::DestroyTexture { id });
        log::debug!("HeadlessDevice: Destroyed texture with ID: {id:?}");
        Ok(())
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        if unit as usize >= state.units.len() {
            return Err(ResourceError::OutOfBounds);
        }
        if let Some(id) = texture {
            if !state.textures.contains_key(&id) {
                return Err(ResourceError::NotFound);
            }
        }
        state.units[unit as usize] = texture;
        state
            .commands
            .push(DeviceCommand::BindTexture { unit, texture });
        log::trace!("HeadlessDevice: Bound {texture:?} to unit {unit}");
        Ok(())
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label.unwrap_or("unlabelled").to_string();

        if let Some(max) = self.max_if_statements {
            let branches = descriptor.fragment_source.matches("if(").count();
            if branches > max {
                log::warn!(
                    "HeadlessDevice: Shader '{label}' uses {branches} if statements, limit is {max}"
                );
                return Err(ShaderError::CompilationError {
                    label,
                    details: format!("{branches} if statements exceed the limit of {max}"),
                }
                .into());
            }
        }
        if let Some(unit) = descriptor
            .sampler_units
            .iter()
            .find(|&&unit| unit >= self.limits.max_texture_units)
        {
            return Err(ShaderError::CompilationError {
                label,
                details: format!("sampler bound to missing texture unit {unit}"),
            }
            .into());
        }

        let mut state = self.state()?;
        let id = ShaderModuleId(state.generate_id());
        state.shaders.insert(
            id,
            HeadlessShader {
                sampler_units: descriptor.sampler_units.to_vec(),
            },
        );
        state.commands.push(DeviceCommand::CreateShader {
            id,
            sampler_count: descriptor.sampler_units.len(),
        });
        log::debug!("HeadlessDevice: Created shader module '{label}' with ID: {id:?}");
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        state
            .shaders
            .remove(&id)
            .ok_or(ShaderError::NotFound { id })?;
        if state.shader == Some(id) {
            state.shader = None;
        }
        state.commands.push(DeviceCommand::DestroyShader { id });
        log::debug!("HeadlessDevice: Destroyed shader module with ID: {id:?}");
        Ok(())
    }

    fn bind_shader(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        if !state.shaders.contains_key(&id) {
            return Err(ShaderError::NotFound { id }.into());
        }
        state.shader = Some(id);
        state.commands.push(DeviceCommand::BindShader { id });
        log::trace!("HeadlessDevice: Bound shader module {id:?}");
        Ok(())
    }

    fn set_blend_mode(&self, mode: BlendMode) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        state.blend_mode = mode;
        state.commands.push(DeviceCommand::SetBlendMode { mode });
        log::trace!("HeadlessDevice: Blend mode set to {mode:?}");
        Ok(())
    }

    fn draw_indexed(
        &self,
        topology: PrimitiveTopology,
        index_count: u32,
        first_index: u32,
    ) -> Result<(), ResourceError> {
        let mut state = self.state()?;
        let shader_id = state.shader.ok_or(ResourceError::InvalidHandle)?;
        let vertex_buffer = state.vertex_buffer.ok_or(ResourceError::InvalidHandle)?;
        if !state.buffers.contains_key(&vertex_buffer) {
            return Err(ResourceError::NotFound);
        }
        let indices = state.read_indices(first_index, index_count)?;

        let shader = state
            .shaders
            .get(&shader_id)
            .ok_or(ShaderError::NotFound { id: shader_id })?;
        let textures = shader
            .sampler_units
            .iter()
            .map(|&unit| state.units.get(unit as usize).copied().flatten())
            .collect();

        let draw = DrawRecord {
            topology,
            index_count,
            first_index,
            blend_mode: state.blend_mode,
            shader: shader_id,
            textures,
            indices,
        };
        log::trace!(
            "HeadlessDevice: Draw {} indices from {} with {:?}",
            index_count,
            first_index,
            draw.blend_mode
        );
        state.commands.push(DeviceCommand::DrawIndexed { draw });
        Ok(())
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: "Headless".to_string(),
            device_type: RendererDeviceType::Cpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::math::{Extent3D, Origin3D};
    use lumen_core::renderer::{BufferUsage, TextureUsage};
    use std::borrow::Cow;

    fn buffer(device: &HeadlessDevice, size: u64, usage: BufferUsage) -> BufferId {
        device
            .create_buffer(&BufferDescriptor {
                label: Some("test".into()),
                size,
                usage: usage | BufferUsage::COPY_DST,
            })
            .unwrap()
    }

    fn texture(device: &HeadlessDevice, width: u32, height: u32) -> TextureId {
        device
            .create_texture(&TextureDescriptor {
                label: None,
                size: Extent2D::new(width, height),
                format: TextureFormat::Rgba8Unorm,
                usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
                premultiply_alpha: true,
            })
            .unwrap()
    }

    fn shader(fragment: &str, units: &[u32]) -> ShaderModuleDescriptor<'static> {
        ShaderModuleDescriptor {
            label: Some("test"),
            vertex_source: Cow::Borrowed("void main() {}"),
            fragment_source: Cow::Owned(fragment.to_string()),
            sampler_units: Cow::Owned(units.to_vec()),
        }
    }

    #[test]
    fn test_buffer_write_bounds() {
        let device = HeadlessDevice::new();
        let id = buffer(&device, 8, BufferUsage::VERTEX);

        device.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_contents(id).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            device.write_buffer(id, 6, &[1, 2, 3]),
            Err(ResourceError::OutOfBounds)
        ));
    }

    #[test]
    fn test_resource_tables_track_creation_and_destruction() {
        crate::logging::init_test_logging();
        let device = HeadlessDevice::new();
        let vertex = buffer(&device, 16, BufferUsage::VERTEX);
        let image = texture(&device, 1, 1);
        let program = device.create_shader_module(&shader("", &[0])).unwrap();
        assert_eq!(
            (device.live_buffers(), device.live_textures(), device.live_shaders()),
            (1, 1, 1)
        );

        device.bind_texture(0, Some(image)).unwrap();
        device.destroy_texture(image).unwrap();
        device.destroy_buffer(vertex).unwrap();
        device.destroy_shader_module(program).unwrap();

        assert_eq!(
            (device.live_buffers(), device.live_textures(), device.live_shaders()),
            (0, 0, 0)
        );
        assert_eq!(device.bound_texture(0), None);
        assert!(matches!(
            device.destroy_texture(image),
            Err(ResourceError::NotFound)
        ));
    }

    #[test]
    fn test_memory_budget() {
        let device = HeadlessDevice::new().with_memory_budget(100);
        let first = buffer(&device, 64, BufferUsage::VERTEX);
        assert!(matches!(
            device.create_buffer(&BufferDescriptor {
                label: None,
                size: 64,
                usage: BufferUsage::INDEX,
            }),
            Err(ResourceError::AllocationFailed { requested_bytes: 64 })
        ));

        device.destroy_buffer(first).unwrap();
        assert_eq!(device.allocated_bytes(), 0);
        buffer(&device, 64, BufferUsage::INDEX);
    }

    #[test]
    fn test_texture_upload_and_unit_bounds() {
        let device = HeadlessDevice::with_limits(DeviceLimits {
            max_texture_units: 2,
            ..Default::default()
        });
        let id = texture(&device, 2, 1);
        device
            .write_texture(
                id,
                &[1, 2, 3, 4, 5, 6, 7, 8],
                Some(8),
                Origin3D::ZERO,
                Extent3D::from(Extent2D::new(2, 1)),
            )
            .unwrap();
        assert_eq!(
            device.texture_contents(id).unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );

        device.bind_texture(1, Some(id)).unwrap();
        assert_eq!(device.bound_texture(1), Some(id));
        assert!(matches!(
            device.bind_texture(2, Some(id)),
            Err(ResourceError::OutOfBounds)
        ));

        device.destroy_texture(id).unwrap();
        assert_eq!(device.bound_texture(1), None);
    }

    #[test]
    fn test_branch_budget_rejects_shader() {
        let device = HeadlessDevice::new().with_max_if_statements(2);
        assert!(device
            .create_shader_module(&shader("if(a){} else if(b){}", &[0]))
            .is_ok());

        let err = device
            .create_shader_module(&shader("if(a){} if(b){} if(c){}", &[0]))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Shader(ShaderError::CompilationError { .. })
        ));
    }

    #[test]
    fn test_draw_records_bound_state() {
        let device = HeadlessDevice::new();
        let vertices = buffer(&device, 64, BufferUsage::VERTEX);
        let indices = buffer(&device, 12, BufferUsage::INDEX);
        let index_bytes: Vec<u8> = [0u16, 1, 2, 0, 2, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        device.write_buffer(indices, 0, &index_bytes).unwrap();

        let tex = texture(&device, 1, 1);
        let program = device.create_shader_module(&shader("", &[0, 1])).unwrap();

        device.bind_vertex_buffer(vertices).unwrap();
        device.bind_index_buffer(indices, IndexFormat::Uint16).unwrap();
        device.bind_shader(program).unwrap();
        device.bind_texture(0, Some(tex)).unwrap();
        device.set_blend_mode(BlendMode::Add).unwrap();
        device
            .draw_indexed(PrimitiveTopology::TriangleList, 3, 3)
            .unwrap();

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].indices, vec![0, 2, 3]);
        assert_eq!(draws[0].textures, vec![Some(tex), None]);
        assert_eq!(draws[0].blend_mode, BlendMode::Add);

        assert!(matches!(
            device.draw_indexed(PrimitiveTopology::TriangleList, 6, 3),
            Err(ResourceError::OutOfBounds)
        ));
    }

    #[test]
    fn test_draw_without_shader_fails() {
        let device = HeadlessDevice::new();
        assert!(matches!(
            device.draw_indexed(PrimitiveTopology::TriangleList, 3, 0),
            Err(ResourceError::InvalidHandle)
        ));
    }
}
