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

use crate::math::dimension;
use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The immediate-mode device contract the 2D renderer is written against.
///
/// All calls take `&self`; implementations keep their state behind interior
/// mutability. Commands take effect in call order.
pub trait GraphicsDevice: Debug {
    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the device cannot provide the storage.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Writes data to a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `offset` - The offset in the buffer where the data will be written.
    /// * `data` - A slice of bytes containing the data to be written.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write does not fit in the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Destroys a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Binds a buffer as the vertex source for subsequent draws.
    fn bind_vertex_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Binds a buffer as the index source for subsequent draws.
    /// ## Arguments
    /// * `id` - The ID of the index buffer.
    /// * `format` - The data type of the indices stored in the buffer.
    fn bind_index_buffer(&self, id: BufferId, format: IndexFormat) -> Result<(), ResourceError>;

    /// Creates a new GPU texture.
    /// ## Arguments
    /// * `descriptor` - A reference to a `TextureDescriptor` containing the texture configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created texture or an error if the creation fails.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Writes data to a GPU texture.
    /// ## Arguments
    /// * `texture_id` - The ID of the texture to write to.
    /// * `data` - A slice of bytes containing the data to be written.
    /// * `bytes_per_row` - The number of bytes per row in the texture data.
    /// * `offset` - The offset in the texture where the data will be written.
    /// * `size` - The size of the written region.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn write_texture(
        &self,
        texture_id: TextureId,
        data: &[u8],
        bytes_per_row: Option<u32>,
        offset: dimension::Origin3D,
        size: dimension::Extent3D,
    ) -> Result<(), ResourceError>;

    /// Applies filtering, wrapping and mipmapping parameters to a texture.
    fn apply_sampler_state(
        &self,
        texture_id: TextureId,
        style: &SamplerStyle,
    ) -> Result<(), ResourceError>;

    /// Destroys a GPU texture.
    /// ## Arguments
    /// * `id` - The ID of the texture to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Binds a texture to a texture unit, or clears the unit when `texture` is `None`.
    /// ## Arguments
    /// * `unit` - The texture unit, in `0..limits().max_texture_units`.
    /// * `texture` - The texture to bind.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the unit does not exist on this device.
    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) -> Result<(), ResourceError>;

    /// Creates a shader module from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - A reference to a `ShaderModuleDescriptor` containing the shader source and other properties.
    /// ## Returns
    /// A `Result` containing the ID of the created shader module or an error if the creation fails.
    /// ## Errors
    /// * `ResourceError::Shader` - If the shader fails to compile or link.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    /// ## Arguments
    /// * `id` - The ID of the shader module to be destroyed.
    /// ## Returns
    /// A `Result` indicating success or failure of the operation.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Makes a shader module current for subsequent draws.
    fn bind_shader(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Sets the fixed-function blend state for subsequent draws.
    fn set_blend_mode(&self, mode: BlendMode) -> Result<(), ResourceError>;

    /// Issues an indexed draw using the currently bound buffers, shader and textures.
    /// ## Arguments
    /// * `topology` - How the indices assemble into primitives.
    /// * `index_count` - The number of indices to draw.
    /// * `first_index` - Offset, in indices, into the bound index buffer.
    fn draw_indexed(
        &self,
        topology: PrimitiveTopology,
        index_count: u32,
        first_index: u32,
    ) -> Result<(), ResourceError>;

    /// Returns the capability limits of the device.
    fn limits(&self) -> DeviceLimits;

    /// Returns information about the adapter backing this device.
    fn adapter_info(&self) -> GraphicsAdapterInfo;
}
