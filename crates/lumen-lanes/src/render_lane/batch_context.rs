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

//! Draw-call grouping and texture slot assignment.

use ahash::AHashMap;
use lumen_core::asset::{TextureHandle, TextureResourceId};
use lumen_core::renderer::BlendMode;

/// A texture sampled by a draw group, and the unit it must be bound to.
#[derive(Debug, Clone)]
pub struct GroupTexture {
    /// The texture unit, also the slot id written into the group's vertices.
    pub slot: u32,
    /// The texture.
    pub texture: TextureHandle,
}

/// A contiguous run of primitives drawn with one indexed draw call.
#[derive(Debug, Clone)]
pub struct DrawGroup {
    /// First index of the run in the flushed index buffer.
    pub start: u32,
    /// Number of indices in the run.
    pub size: u32,
    /// The resolved blend mode shared by the run.
    pub blend_mode: BlendMode,
    /// The distinct textures the run samples.
    pub textures: Vec<GroupTexture>,
    /// Position of the run's first primitive in the flushed batch.
    pub first_primitive: usize,
    /// Number of primitives in the run.
    pub primitive_count: usize,
}

impl DrawGroup {
    /// Returns `true` if the group samples `texture`.
    pub fn samples(&self, texture: TextureResourceId) -> bool {
        self.textures
            .iter()
            .any(|entry| entry.texture.id() == texture)
    }
}

/// State of the single-pass grouping algorithm.
///
/// A generation `tick` identifies the open group. A texture stamped with the
/// current tick in `last_seen` already has a slot in the open group; opening a
/// group advances the tick, which invalidates every stamp at once. The tick
/// only ever grows across flushes.
///
/// Slots are texture units. A texture already bound on the device keeps its
/// unit when that unit is still free in the open group, saving a rebind.
#[derive(Debug)]
pub struct BatchContext {
    max_textures: usize,
    tick: u64,
    last_seen: AHashMap<TextureResourceId, u64>,
    units: Vec<Option<TextureResourceId>>,
    location: AHashMap<TextureResourceId, u32>,
    claimed: Vec<u64>,
    cursor: usize,
    current_texture: Option<TextureResourceId>,
    current_blend: Option<BlendMode>,
    open: Option<DrawGroup>,
    groups: Vec<DrawGroup>,
    primitive_index: usize,
}

impl BatchContext {
    /// Creates a context for groups of at most `max_textures` textures.
    pub fn new(max_textures: u32) -> Self {
        let max_textures = max_textures.max(1) as usize;
        Self {
            max_textures,
            tick: 0,
            last_seen: AHashMap::new(),
            units: vec![None; max_textures],
            location: AHashMap::new(),
            claimed: vec![0; max_textures],
            cursor: 0,
            current_texture: None,
            current_blend: None,
            open: None,
            groups: Vec::new(),
            primitive_index: 0,
        }
    }

    /// The largest number of distinct textures in one group.
    pub fn max_textures(&self) -> u32 {
        self.max_textures as u32
    }

    /// The current generation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Starts grouping a batch.
    ///
    /// `bound` lists the texture currently bound to each unit.
    pub fn begin(&mut self, bound: &[Option<TextureResourceId>]) {
        self.tick += 1;
        self.last_seen.clear();
        self.location.clear();
        for (unit, slot) in self.units.iter_mut().enumerate() {
            *slot = bound.get(unit).copied().flatten();
            if let Some(id) = *slot {
                self.location.insert(id, unit as u32);
            }
        }
        self.cursor = 0;
        self.current_texture = None;
        self.current_blend = None;
        self.open = None;
        self.groups.clear();
        self.primitive_index = 0;
    }

    /// Places the next primitive, whose indices start at `index_offset`, and
    /// returns the slot its vertices sample from.
    pub fn assign(&mut self, texture: &TextureHandle, blend_mode: BlendMode, index_offset: u32) -> u32 {
        let id = texture.id();

        if self.current_blend != Some(blend_mode) {
            self.current_blend = Some(blend_mode);
            self.current_texture = None;
            self.open_group(blend_mode, index_offset);
        }

        if self.current_texture != Some(id) {
            self.current_texture = Some(id);
            if self.last_seen.get(&id) != Some(&self.tick) {
                let full = self
                    .open
                    .as_ref()
                    .is_some_and(|group| group.textures.len() >= self.max_textures);
                if full {
                    self.open_group(blend_mode, index_offset);
                }

                let slot = self.claim_unit(id);
                self.last_seen.insert(id, self.tick);
                if let Some(group) = self.open.as_mut() {
                    group.textures.push(GroupTexture {
                        slot,
                        texture: texture.clone(),
                    });
                }
            }
        }

        if let Some(group) = self.open.as_mut() {
            group.primitive_count += 1;
        }
        self.primitive_index += 1;
        self.location.get(&id).copied().unwrap_or(0)
    }

    /// Closes the open group at `index_end` and returns the groups of the batch.
    pub fn finish(&mut self, index_end: u32) -> Vec<DrawGroup> {
        self.close_group(index_end);
        self.current_texture = None;
        self.current_blend = None;
        std::mem::take(&mut self.groups)
    }

    fn open_group(&mut self, blend_mode: BlendMode, index_offset: u32) {
        self.close_group(index_offset);
        self.tick += 1;
        self.cursor = 0;
        self.open = Some(DrawGroup {
            start: index_offset,
            size: 0,
            blend_mode,
            textures: Vec::with_capacity(self.max_textures),
            first_primitive: self.primitive_index,
            primitive_count: 0,
        });
    }

    fn close_group(&mut self, index_end: u32) {
        if let Some(mut group) = self.open.take() {
            if group.primitive_count == 0 {
                return;
            }
            group.size = index_end - group.start;
            self.groups.push(group);
        }
    }

    fn claim_unit(&mut self, id: TextureResourceId) -> u32 {
        let tick = self.tick;

        if let Some(&unit) = self.location.get(&id) {
            let unit = unit as usize;
            if self.claimed[unit] != tick && self.units[unit] == Some(id) {
                self.claimed[unit] = tick;
                return unit as u32;
            }
        }

        let claimed = &self.claimed;
        let unit = (self.cursor..self.max_textures)
            .find(|&unit| claimed[unit] != tick)
            .or_else(|| (0..self.max_textures).find(|&unit| claimed[unit] != tick))
            .unwrap_or(0);
        self.cursor = unit + 1;

        if let Some(previous) = self.units[unit].replace(id) {
            if self.location.get(&previous) == Some(&(unit as u32)) {
                self.location.remove(&previous);
            }
        }
        self.location.insert(id, unit as u32);
        self.claimed[unit] = tick;
        unit as u32
    }
}
