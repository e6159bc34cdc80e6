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

//! Backend-agnostic rendering API.
//!
//! Organized into several logical sub-modules:
//!
//! - **[`adapter`]**: Device limits and adapter information.
//! - **[`buffer`]** / **[`texture`]** / **[`shader`]**: GPU handles and their descriptors.
//! - **[`blend`]**: Blend modes and the premultiplied-alpha lookup table.
//! - **[`command`]**: Draw-call level enums (topology, index format).
//! - **[`vertex`]**: Interleaved vertex layouts used by the batch shader variants.
//! - **[`primitive`]**: The renderable primitive producers hand to the batcher.
//! - **[`settings`]**: The renderer configuration surface.

pub mod adapter;
pub mod blend;
pub mod buffer;
pub mod command;
pub mod primitive;
pub mod settings;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use self::adapter::*;
pub use self::blend::*;
pub use self::buffer::*;
pub use self::command::*;
pub use self::primitive::*;
pub use self::settings::*;
pub use self::shader::*;
pub use self::texture::*;
pub use self::vertex::*;
