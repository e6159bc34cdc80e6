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

//! Batch rendering lane - the hot path turning primitives into draw calls.
//!
//! [`BatchRenderer`] buffers primitives in submission order. On flush, the
//! [`BatchContext`] walks them once and splits them into [`DrawGroup`]s: a
//! group ends when the blend mode changes or when a new texture would exceed
//! the number of texture units a batch shader samples. Primitives are never
//! reordered.

mod batch_context;
mod batch_renderer;

pub use batch_context::*;
pub use batch_renderer::*;
