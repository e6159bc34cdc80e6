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

//! Multi-texture batch shaders, generated and cached per texture count.
//!
//! A batch samples up to `N` textures in one draw call: every vertex carries the
//! slot of its texture and the fragment stage selects among `uSamplers[0..N]`
//! with an if/else chain. Each distinct `N` is a separate program. Because some
//! drivers fail to compile long branch chains, construction first probes the
//! largest chain the device accepts and clamps the texture count to it.

use ahash::AHashMap;
use lumen_core::renderer::{
    GraphicsDevice, RenderError, ResourceError, ShaderError, ShaderModuleDescriptor,
    ShaderModuleId, VertexLayout,
};
use std::borrow::Cow;
use std::fmt::Write;

const FRAGMENT_TEMPLATE: &str = "\
varying vec2 vTextureCoord;
varying vec4 vColor;
varying float vTextureId;
uniform sampler2D uSamplers[%count%];

void main(void){
    vec4 color;
    %forloop%
    gl_FragColor = color * vColor;
}
";

const PROBE_TEMPLATE: &str = "\
precision mediump float;
void main(void){
    float test = 0.1;
    %forloop%
    gl_FragColor = vec4(0.0);
}
";

fn branch_chain(count: u32, mut body: impl FnMut(&mut String, u32)) -> String {
    let mut src = String::new();
    for i in 0..count {
        if i > 0 {
            src.push_str("\n    else ");
        }
        if i + 1 < count {
            let _ = write!(src, "if(vTextureId < {i}.5)");
        }
        body(&mut src, i);
    }
    src
}

/// Generates the fragment stage sampling from `count` texture units.
pub fn generate_fragment_source(count: u32) -> String {
    let chain = branch_chain(count, |src, i| {
        let _ = write!(src, "\n    {{\n        color = texture2D(uSamplers[{i}], vTextureCoord);\n    }}");
    });
    FRAGMENT_TEMPLATE
        .replace("%count%", &count.to_string())
        .replace("%forloop%", &chain)
}

/// Generates a fragment stage with `count - 1` branches and no sampling, used
/// to find the longest chain the device compiles.
pub fn generate_probe_source(count: u32) -> String {
    let chain = branch_chain(count, |src, _| src.push_str("{}"))
        .replace("vTextureId", "test");
    PROBE_TEMPLATE.replace("%forloop%", &chain)
}

/// Generates the vertex stage declaring the attributes of `layout`.
pub fn generate_vertex_source(layout: VertexLayout) -> String {
    let mut src = String::new();
    for attribute in layout.attributes() {
        let _ = writeln!(
            src,
            "attribute {} {};",
            attribute.format.shader_type(),
            attribute.name
        );
    }
    src.push_str(
        "uniform mat3 projectionMatrix;\n\
         uniform mat3 translationMatrix;\n\
         uniform vec4 tint;\n\
         varying vec2 vTextureCoord;\n\
         varying vec4 vColor;\n\
         varying float vTextureId;\n\n\
         void main(void){\n    \
         gl_Position = vec4((projectionMatrix * translationMatrix * vec3(aVertexPosition, 1.0)).xy, 0.0, 1.0);\n    \
         vTextureCoord = aTextureCoord;\n    \
         vTextureId = aTextureId;\n",
    );
    if layout.has_color() {
        src.push_str("    vColor = aColor * tint;\n");
    } else {
        src.push_str("    vColor = tint;\n");
    }
    src.push_str("}\n");
    src
}

/// Caches one batch shader per texture count.
#[derive(Debug)]
pub struct ShaderVariantCache {
    layout: VertexLayout,
    vertex_source: String,
    max_textures: u32,
    variants: AHashMap<u32, ShaderModuleId>,
}

impl ShaderVariantCache {
    /// Determines how many textures a batch may sample and creates an empty cache.
    ///
    /// The count is the smallest of the device's texture units, `soft_cap` and the
    /// branch budget found by probing.
    ///
    /// ## Errors
    /// * `RenderError::CapabilityOverflow` - If the device cannot sample even one texture.
    pub fn new(
        device: &dyn GraphicsDevice,
        layout: VertexLayout,
        soft_cap: u32,
    ) -> Result<Self, RenderError> {
        let hardware = device.limits().max_texture_units;
        let requested = hardware.min(soft_cap);
        if requested == 0 {
            return Err(RenderError::CapabilityOverflow(format!(
                "batch shader needs at least one texture unit (device: {hardware}, cap: {soft_cap})"
            )));
        }

        let max_textures = Self::probe_max_branches(device, requested)?;
        log::info!(
            "ShaderVariantCache: Batches sample up to {max_textures} textures ({} units on '{}')",
            hardware,
            device.adapter_info().name
        );

        Ok(Self {
            layout,
            vertex_source: generate_vertex_source(layout),
            max_textures,
            variants: AHashMap::new(),
        })
    }

    /// Halves `max` until a probe shader with that many branches compiles.
    fn probe_max_branches(device: &dyn GraphicsDevice, mut max: u32) -> Result<u32, RenderError> {
        let vertex_source = "void main(void){ gl_Position = vec4(0.0); }";
        loop {
            let fragment_source = generate_probe_source(max);
            let descriptor = ShaderModuleDescriptor {
                label: Some("Batch Branch Probe"),
                vertex_source: Cow::Borrowed(vertex_source),
                fragment_source: Cow::Owned(fragment_source),
                sampler_units: Cow::Borrowed(&[]),
            };

            match device.create_shader_module(&descriptor) {
                Ok(probe) => {
                    if let Err(e) = device.destroy_shader_module(probe) {
                        log::warn!("ShaderVariantCache: Failed to destroy probe shader: {e:?}");
                    }
                    return Ok(max);
                }
                Err(ResourceError::Shader(ShaderError::CompilationError { details, .. })) => {
                    log::debug!(
                        "ShaderVariantCache: Probe with {max} branches rejected: {details}"
                    );
                    max /= 2;
                    if max == 0 {
                        return Err(RenderError::CapabilityOverflow(
                            "device cannot compile a single-texture batch shader".to_string(),
                        ));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The largest texture count a batch may use.
    pub fn max_textures(&self) -> u32 {
        self.max_textures
    }

    /// The vertex layout the generated shaders consume.
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Returns the shader sampling `count` textures, compiling it on first use.
    ///
    /// ## Errors
    /// * `ShaderError::InvalidTextureCount` - If `count` is zero or above [`max_textures`](Self::max_textures).
    pub fn get_shader(
        &mut self,
        device: &dyn GraphicsDevice,
        count: u32,
    ) -> Result<ShaderModuleId, ResourceError> {
        if count == 0 || count > self.max_textures {
            return Err(ShaderError::InvalidTextureCount {
                requested: count,
                max: self.max_textures,
            }
            .into());
        }
        if let Some(&id) = self.variants.get(&count) {
            return Ok(id);
        }

        let label = format!("Batch Shader x{count}");
        let sampler_units: Vec<u32> = (0..count).collect();
        let id = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some(label.as_str()),
            vertex_source: Cow::Borrowed(&self.vertex_source),
            fragment_source: Cow::Owned(generate_fragment_source(count)),
            sampler_units: Cow::Owned(sampler_units),
        })?;
        log::debug!("ShaderVariantCache: Compiled variant for {count} textures: {id:?}");

        self.variants.insert(count, id);
        Ok(id)
    }

    /// Number of compiled variants.
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Destroys every compiled variant.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for (count, id) in self.variants.drain() {
            if let Err(e) = device.destroy_shader_module(id) {
                log::warn!("ShaderVariantCache: Failed to destroy variant x{count}: {e:?}");
            }
        }
    }

    /// Forgets every compiled variant without touching the device.
    pub fn context_lost(&mut self) {
        self.variants.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_source_branches() {
        let src = generate_fragment_source(3);
        assert!(src.contains("uniform sampler2D uSamplers[3];"));
        assert_eq!(src.matches("if(").count(), 2);
        assert!(src.contains("if(vTextureId < 0.5)"));
        assert!(src.contains("if(vTextureId < 1.5)"));
        assert!(src.contains("uSamplers[2]"));
        assert!(!src.contains("%forloop%"));
    }

    #[test]
    fn test_single_texture_has_no_branch() {
        let src = generate_fragment_source(1);
        assert_eq!(src.matches("if(").count(), 0);
        assert!(src.contains("uSamplers[0]"));
    }

    #[test]
    fn test_probe_matches_variant_branch_count() {
        for count in [1, 2, 8, 16] {
            assert_eq!(
                generate_probe_source(count).matches("if(").count(),
                generate_fragment_source(count).matches("if(").count()
            );
        }
    }

    #[test]
    fn test_vertex_source_follows_layout() {
        let tinted = generate_vertex_source(VertexLayout::Tinted);
        assert!(tinted.contains("attribute vec4 aColor;"));
        assert!(tinted.contains("attribute float aTextureId;"));

        let untinted = generate_vertex_source(VertexLayout::Untinted);
        assert!(!untinted.contains("aColor"));
        assert!(untinted.contains("vColor = tint;"));
    }
}
