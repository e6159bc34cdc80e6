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

//! The hot path of the lumen 2D renderer.
//!
//! Producers submit flattened [`RenderPrimitive`]s; the [`render_lane`] batches them
//! into as few indexed draw calls as the device's texture units allow. The other
//! modules manage the GPU resources those draws need:
//!
//! - [`buffer_pool`]: power-of-two scratch memory and double-buffered GPU geometry.
//! - [`shader_cache`]: one generated shader per simultaneously sampled texture count.
//! - [`texture_binding`]: GPU texture mirrors and texture-unit state.
//! - [`texture_gc`]: idle eviction of GPU texture storage.
//! - [`render_target_pool`]: reusable offscreen targets for filter chains.
//!
//! [`Renderer2D`] wires everything to a single [`GraphicsDevice`].
//!
//! [`RenderPrimitive`]: lumen_core::renderer::RenderPrimitive
//! [`GraphicsDevice`]: lumen_core::renderer::GraphicsDevice

#![warn(missing_docs)]

pub mod buffer_pool;
mod error;
pub mod render_lane;
pub mod render_target_pool;
mod renderer;
pub mod shader_cache;
pub mod texture_binding;
pub mod texture_gc;

pub use error::BatchError;
pub use render_lane::{BatchContext, BatchRenderer, BatchStats, DrawGroup, GpuContext, GroupTexture};
pub use render_target_pool::{PoolKey, RenderTarget, RenderTargetPool};
pub use renderer::Renderer2D;
pub use shader_cache::ShaderVariantCache;
pub use texture_binding::TextureBindingCache;
pub use texture_gc::TextureGc;
