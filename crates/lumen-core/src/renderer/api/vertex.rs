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

//! Interleaved vertex layouts for batched geometry.
//!
//! The batch renderer writes one record per vertex into a scratch buffer. The record
//! shape is chosen once per renderer from the closed set of [`VertexLayout`]s; the
//! shader variant cache generates matching attribute declarations.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// The data format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// One 32-bit float.
    Float32,
    /// Four 8-bit unsigned normalized integers.
    Unorm8x4,
}

impl VertexFormat {
    /// Returns the size of the attribute in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32 | VertexFormat::Unorm8x4 => 4,
        }
    }

    /// Returns the shading-language type used to declare the attribute.
    pub const fn shader_type(&self) -> &'static str {
        match self {
            VertexFormat::Float32x2 => "vec2",
            VertexFormat::Float32 => "float",
            VertexFormat::Unorm8x4 => "vec4",
        }
    }
}

/// One attribute inside an interleaved vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// The attribute name used in generated shader source.
    pub name: &'static str,
    /// The data format of the attribute.
    pub format: VertexFormat,
    /// Byte offset of the attribute from the start of the record.
    pub offset: u32,
}

const TINTED_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute {
        name: "aVertexPosition",
        format: VertexFormat::Float32x2,
        offset: 0,
    },
    VertexAttribute {
        name: "aTextureCoord",
        format: VertexFormat::Float32x2,
        offset: 8,
    },
    VertexAttribute {
        name: "aColor",
        format: VertexFormat::Unorm8x4,
        offset: 16,
    },
    VertexAttribute {
        name: "aTextureId",
        format: VertexFormat::Float32,
        offset: 20,
    },
];

const UNTINTED_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        name: "aVertexPosition",
        format: VertexFormat::Float32x2,
        offset: 0,
    },
    VertexAttribute {
        name: "aTextureCoord",
        format: VertexFormat::Float32x2,
        offset: 8,
    },
    VertexAttribute {
        name: "aTextureId",
        format: VertexFormat::Float32,
        offset: 16,
    },
];

/// The closed set of vertex record shapes a batch renderer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VertexLayout {
    /// Position, UV, packed RGBA8 tint and texture slot ([`TintedVertex`]).
    #[default]
    Tinted,
    /// Position, UV and texture slot ([`UntintedVertex`]); tint is ignored.
    Untinted,
}

impl VertexLayout {
    /// Returns the size in bytes of one vertex record.
    pub const fn stride(&self) -> usize {
        match self {
            VertexLayout::Tinted => std::mem::size_of::<TintedVertex>(),
            VertexLayout::Untinted => std::mem::size_of::<UntintedVertex>(),
        }
    }

    /// Returns the attributes of one vertex record, in memory order.
    pub fn attributes(&self) -> &'static [VertexAttribute] {
        match self {
            VertexLayout::Tinted => &TINTED_ATTRIBUTES,
            VertexLayout::Untinted => &UNTINTED_ATTRIBUTES,
        }
    }

    /// Returns `true` if records carry a per-vertex tint.
    pub const fn has_color(&self) -> bool {
        matches!(self, VertexLayout::Tinted)
    }
}

/// A batched vertex carrying a tint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TintedVertex {
    /// Position in target space.
    pub position: [f32; 2],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// RGBA8 tint, little-endian `[r, g, b, a]`.
    pub color: u32,
    /// The texture slot the fragment stage samples from.
    pub texture_slot: f32,
}

/// A batched vertex without a tint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UntintedVertex {
    /// Position in target space.
    pub position: [f32; 2],
    /// Texture coordinates.
    pub uv: [f32; 2],
    /// The texture slot the fragment stage samples from.
    pub texture_slot: f32,
}
