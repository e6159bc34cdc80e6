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

//! Concrete implementations of the contracts defined in `lumen-core`.
//!
//! - [`graphics::headless::HeadlessDevice`]: a CPU-side [`GraphicsDevice`] that
//!   stores resources in memory and records every command it receives. It backs
//!   tools, CI and the renderer's integration tests.
//! - [`logging`]: `env_logger` setup shared by binaries and tests.
//!
//! [`GraphicsDevice`]: lumen_core::renderer::GraphicsDevice

#![warn(missing_docs)]

#[cfg(feature = "graphics")]
pub mod graphics;
pub mod logging;

#[cfg(feature = "graphics")]
pub use graphics::headless::{DeviceCommand, DrawRecord, HeadlessDevice};
