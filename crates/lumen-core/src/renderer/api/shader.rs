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

//! Defines data structures for shader modules.

use std::borrow::Cow;

/// An opaque handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModuleId(pub usize);

/// A descriptor used to create a [`ShaderModuleId`].
///
/// A module bundles both programmable stages; `sampler_units` lists the texture unit
/// assigned to each element of the fragment stage's sampler array.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label for the shader module.
    pub label: Option<&'a str>,
    /// The vertex stage source.
    pub vertex_source: Cow<'a, str>,
    /// The fragment stage source.
    pub fragment_source: Cow<'a, str>,
    /// Texture unit bound to each sampler array element, in order.
    pub sampler_units: Cow<'a, [u32]>,
}
