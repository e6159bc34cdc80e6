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

//! Information about the graphics adapter and the limits it imposes.

/// The type of a graphics device (GPU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererDeviceType {
    /// A GPU integrated into the CPU.
    IntegratedGpu,
    /// A discrete, dedicated GPU.
    DiscreteGpu,
    /// A software renderer or a device without real GPU storage.
    Cpu,
    /// The device type is unknown.
    #[default]
    Unknown,
}

/// Provides information about the graphics adapter.
#[derive(Debug, Clone, Default)]
pub struct GraphicsAdapterInfo {
    /// The name of the adapter (e.g., "NVIDIA GeForce RTX 3080").
    pub name: String,
    /// The type of the adapter.
    pub device_type: RendererDeviceType,
}

/// Hardware limits the batch renderer adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// The number of texture units a fragment shader can sample simultaneously.
    pub max_texture_units: u32,
    /// The largest width or height a 2D texture may have.
    pub max_texture_dimension_2d: u32,
    /// Whether non-power-of-two textures support repeat wrapping and mipmaps.
    pub supports_npot_repeat: bool,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_units: 16,
            max_texture_dimension_2d: 8192,
            supports_npot_repeat: true,
        }
    }
}
