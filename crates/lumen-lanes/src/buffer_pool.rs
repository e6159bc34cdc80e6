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

//! Scratch memory for batch packing and the GPU buffers it is uploaded into.
//!
//! CPU side, a [`SizeClassArena`] keeps at most one [`ScratchBuffer`] per
//! power-of-two size class:
//!
//! ```text
//! class k  ->  capacity = 2^k * granularity
//! request n -> k = log2(next_pow2(ceil(n / granularity)))
//! ```
//!
//! A class is allocated on first request and kept until [`SizeClassArena::clear`].
//! Steady-state batches of similar size therefore reuse the same memory flush
//! after flush.
//!
//! GPU side, a [`GeometryRing`] owns the vertex/index buffer pairs the scratch
//! data is uploaded into. When the driver allows re-uploading a buffer within a
//! frame, every flush reuses pair 0; otherwise each flush of a frame gets its
//! own pair, and the ring rewinds at frame start.

use bytemuck::{Pod, Zeroable};
use lumen_core::math::{log2_pow2, next_pow2};
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, IndexFormat, ResourceError,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

/// Vertex granularity of the attribute arena: two quads.
pub const VERTEX_GRANULARITY: usize = 8;
/// Index granularity of the index arena: two quads.
pub const INDEX_GRANULARITY: usize = 12;

static NEXT_SCRATCH_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A block of CPU memory holding `capacity` logical elements.
#[derive(Debug)]
pub struct ScratchBuffer<T> {
    serial: u64,
    capacity: usize,
    data: Vec<T>,
}

impl<T> ScratchBuffer<T> {
    /// A process-unique number identifying this allocation.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Number of logical elements (vertices or indices) the buffer holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The raw storage.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The raw storage, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Rounds `count` up to the arena capacity serving it and returns
/// `(size_class, capacity)`.
pub fn size_class(count: usize, granularity: usize) -> (usize, usize) {
    let groups = count.div_ceil(granularity).min(u32::MAX as usize) as u32;
    let rounded = next_pow2(groups);
    (log2_pow2(rounded) as usize, rounded as usize * granularity)
}

/// Scratch buffers indexed by power-of-two size class.
#[derive(Debug)]
pub struct SizeClassArena<T> {
    granularity: usize,
    element_width: usize,
    slots: Vec<Option<ScratchBuffer<T>>>,
    allocations: usize,
}

impl<T: Pod + Zeroable> SizeClassArena<T> {
    /// Creates an empty arena.
    ///
    /// One logical element occupies `element_width` values of `T`: the vertex
    /// stride for byte-addressed attribute data, 1 for indices.
    pub fn new(granularity: usize, element_width: usize) -> Self {
        Self {
            granularity: granularity.max(1),
            element_width: element_width.max(1),
            slots: Vec::new(),
            allocations: 0,
        }
    }

    /// Returns the smallest buffer whose capacity is at least `min_count`,
    /// allocating its size class if needed.
    ///
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the allocator cannot provide the storage.
    pub fn acquire(&mut self, min_count: usize) -> Result<&mut ScratchBuffer<T>, ResourceError> {
        let (class, capacity) = size_class(min_count, self.granularity);
        if self.slots.len() <= class {
            self.slots.resize_with(class + 1, || None);
        }

        let slot = &mut self.slots[class];
        if slot.is_none() {
            let len = capacity * self.element_width;
            let requested_bytes = (len * std::mem::size_of::<T>()) as u64;
            let mut data = Vec::new();
            data.try_reserve_exact(len)
                .map_err(|_| ResourceError::AllocationFailed { requested_bytes })?;
            data.resize(len, T::zeroed());

            log::debug!(
                "SizeClassArena: Allocated class {class} ({capacity} elements, {requested_bytes} bytes)"
            );
            self.allocations += 1;
            *slot = Some(ScratchBuffer {
                serial: NEXT_SCRATCH_SERIAL.fetch_add(1, Ordering::Relaxed),
                capacity,
                data,
            });
        }

        slot.as_mut()
            .ok_or(ResourceError::AllocationFailed { requested_bytes: 0 })
    }

    /// Total number of buffers allocated since creation or the last clear.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Number of size classes currently holding a buffer.
    pub fn resident_classes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Frees every buffer.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.allocations = 0;
    }
}

/// The attribute and index arenas used while packing a batch.
#[derive(Debug)]
pub struct BufferPool {
    attributes: SizeClassArena<u8>,
    indices: SizeClassArena<u16>,
}

impl BufferPool {
    /// Creates an empty pool for vertex records of `stride` bytes.
    pub fn new(stride: usize) -> Self {
        Self {
            attributes: SizeClassArena::new(VERTEX_GRANULARITY, stride),
            indices: SizeClassArena::new(INDEX_GRANULARITY, 1),
        }
    }

    /// Returns a byte buffer with room for at least `min_vertices` records.
    pub fn attribute_buffer(
        &mut self,
        min_vertices: usize,
    ) -> Result<&mut ScratchBuffer<u8>, ResourceError> {
        self.attributes.acquire(min_vertices)
    }

    /// Returns an index buffer with room for at least `min_indices` indices.
    pub fn index_buffer(
        &mut self,
        min_indices: usize,
    ) -> Result<&mut ScratchBuffer<u16>, ResourceError> {
        self.indices.acquire(min_indices)
    }

    /// Acquires both buffers of a flush at once.
    pub fn acquire_pair(
        &mut self,
        min_vertices: usize,
        min_indices: usize,
    ) -> Result<(&mut ScratchBuffer<u8>, &mut ScratchBuffer<u16>), ResourceError> {
        let attributes = self.attributes.acquire(min_vertices)?;
        let indices = self.indices.acquire(min_indices)?;
        Ok((attributes, indices))
    }

    /// Total allocations across both arenas.
    pub fn allocations(&self) -> usize {
        self.attributes.allocations() + self.indices.allocations()
    }

    /// Frees all scratch memory.
    pub fn clear(&mut self) {
        self.attributes.clear();
        self.indices.clear();
    }
}

#[derive(Debug, Clone, Copy)]
struct GpuBuffer {
    id: BufferId,
    size: u64,
}

/// A vertex/index buffer pair on the device, grown on demand.
#[derive(Debug, Default)]
pub struct PackedGeometry {
    vertex: Option<GpuBuffer>,
    index: Option<GpuBuffer>,
}

impl PackedGeometry {
    /// Uploads interleaved vertex data and 16-bit indices, recreating either
    /// buffer at the next power-of-two size if it is too small.
    pub fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        vertex_bytes: &[u8],
        indices: &[u16],
    ) -> Result<(), ResourceError> {
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let vertex = Self::ensure(
            device,
            &mut self.vertex,
            vertex_bytes.len() as u64,
            BufferUsage::VERTEX,
            "Batch Vertices",
        )?;
        let index = Self::ensure(
            device,
            &mut self.index,
            index_bytes.len() as u64,
            BufferUsage::INDEX,
            "Batch Indices",
        )?;

        device.write_buffer(vertex, 0, vertex_bytes)?;
        device.write_buffer(index, 0, index_bytes)
    }

    /// Binds the pair for subsequent draws.
    pub fn bind(&self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        let vertex = self.vertex.ok_or(ResourceError::InvalidHandle)?;
        let index = self.index.ok_or(ResourceError::InvalidHandle)?;
        device.bind_vertex_buffer(vertex.id)?;
        device.bind_index_buffer(index.id, IndexFormat::Uint16)
    }

    /// Returns the `(vertex, index)` buffer ids once allocated.
    pub fn buffers(&self) -> Option<(BufferId, BufferId)> {
        Some((self.vertex?.id, self.index?.id))
    }

    fn ensure(
        device: &dyn GraphicsDevice,
        slot: &mut Option<GpuBuffer>,
        min_size: u64,
        usage: BufferUsage,
        label: &'static str,
    ) -> Result<BufferId, ResourceError> {
        if let Some(buffer) = slot {
            if buffer.size >= min_size {
                return Ok(buffer.id);
            }
            if let Err(e) = device.destroy_buffer(buffer.id) {
                log::warn!("PackedGeometry({label}): Failed to destroy buffer: {e:?}");
            }
            *slot = None;
        }

        let size = min_size.max(4).next_power_of_two();
        let id = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: usage | BufferUsage::COPY_DST,
        })?;
        log::debug!("PackedGeometry({label}): Grew GPU buffer to {size} bytes");
        *slot = Some(GpuBuffer { id, size });
        Ok(id)
    }

    /// Destroys both buffers.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for buffer in [self.vertex.take(), self.index.take()].into_iter().flatten() {
            if let Err(e) = device.destroy_buffer(buffer.id) {
                log::warn!("PackedGeometry: Failed to destroy buffer: {e:?}");
            }
        }
    }
}

/// The per-flush GPU geometry ring.
#[derive(Debug)]
pub struct GeometryRing {
    reuse_within_frame: bool,
    geometries: Vec<PackedGeometry>,
    flush_id: usize,
}

impl GeometryRing {
    /// Creates an empty ring.
    ///
    /// With `reuse_within_frame` every flush uploads into the same buffer pair.
    pub fn new(reuse_within_frame: bool) -> Self {
        Self {
            reuse_within_frame,
            geometries: Vec::new(),
            flush_id: 0,
        }
    }

    /// Rewinds to the first buffer pair.
    pub fn begin_frame(&mut self) {
        self.flush_id = 0;
    }

    /// Uploads a batch into the next buffer pair and binds it.
    ///
    /// Returns the index of the pair used.
    pub fn upload_and_bind(
        &mut self,
        device: &dyn GraphicsDevice,
        vertex_bytes: &[u8],
        indices: &[u16],
    ) -> Result<usize, ResourceError> {
        let index = if self.reuse_within_frame {
            0
        } else {
            let index = self.flush_id;
            self.flush_id += 1;
            index
        };
        if self.geometries.len() <= index {
            self.geometries.resize_with(index + 1, PackedGeometry::default);
        }

        let geometry = &mut self.geometries[index];
        geometry.upload(device, vertex_bytes, indices)?;
        geometry.bind(device)?;
        Ok(index)
    }

    /// Number of buffer pairs created so far.
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// Returns `true` before the first upload.
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Returns the buffer pair at `index`.
    pub fn geometry(&self, index: usize) -> Option<&PackedGeometry> {
        self.geometries.get(index)
    }

    /// Destroys every buffer pair.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for geometry in &mut self.geometries {
            geometry.destroy(device);
        }
        self.geometries.clear();
        self.flush_id = 0;
    }

    /// Forgets every buffer pair without touching the device.
    pub fn context_lost(&mut self) {
        self.geometries.clear();
        self.flush_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::math::dimension;
    use lumen_core::renderer::{
        BlendMode, DeviceLimits, GraphicsAdapterInfo, PrimitiveTopology, SamplerStyle,
        ShaderModuleDescriptor, ShaderModuleId, TextureDescriptor, TextureId,
    };
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// A mock graphics device that produces unique resource IDs and logs buffer traffic.
    #[derive(Debug, Default)]
    struct MockGraphicsDevice {
        next_id: AtomicUsize,
        created: Mutex<Vec<(BufferId, u64)>>,
        destroyed: Mutex<Vec<BufferId>>,
    }

    impl MockGraphicsDevice {
        fn next(&self) -> usize {
            self.next_id.fetch_add(1, Ordering::Relaxed) + 1
        }
    }

    impl GraphicsDevice for MockGraphicsDevice {
        fn create_buffer(&self, d: &BufferDescriptor) -> Result<BufferId, ResourceError> {
            let id = BufferId(self.next());
            self.created.lock().unwrap().push((id, d.size));
            Ok(id)
        }
        fn write_buffer(&self, _id: BufferId, _o: u64, _d: &[u8]) -> Result<(), ResourceError> {
            Ok(())
        }
        fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
            self.destroyed.lock().unwrap().push(id);
            Ok(())
        }
        fn bind_vertex_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_index_buffer(&self, _id: BufferId, _f: IndexFormat) -> Result<(), ResourceError> {
            Ok(())
        }
        fn create_texture(&self, _d: &TextureDescriptor) -> Result<TextureId, ResourceError> {
            Ok(TextureId(self.next()))
        }
        fn write_texture(
            &self,
            _id: TextureId,
            _data: &[u8],
            _bpr: Option<u32>,
            _o: dimension::Origin3D,
            _s: dimension::Extent3D,
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn apply_sampler_state(&self, _id: TextureId, _s: &SamplerStyle) -> Result<(), ResourceError> {
            Ok(())
        }
        fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_texture(&self, _u: u32, _t: Option<TextureId>) -> Result<(), ResourceError> {
            Ok(())
        }
        fn create_shader_module(
            &self,
            _d: &ShaderModuleDescriptor,
        ) -> Result<ShaderModuleId, ResourceError> {
            Ok(ShaderModuleId(self.next()))
        }
        fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_shader(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn set_blend_mode(&self, _m: BlendMode) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_indexed(&self, _t: PrimitiveTopology, _c: u32, _f: u32) -> Result<(), ResourceError> {
            Ok(())
        }
        fn limits(&self) -> DeviceLimits {
            DeviceLimits::default()
        }
        fn adapter_info(&self) -> GraphicsAdapterInfo {
            GraphicsAdapterInfo::default()
        }
    }

    #[test]
    fn test_size_class_rounding() {
        assert_eq!(size_class(0, 8), (0, 8));
        assert_eq!(size_class(8, 8), (0, 8));
        assert_eq!(size_class(9, 8), (1, 16));
        assert_eq!(size_class(33, 8), (3, 64));
        assert_eq!(size_class(12, 12), (0, 12));
        assert_eq!(size_class(25, 12), (2, 48));
    }

    #[test]
    fn test_smaller_requests_reuse_the_class_buffer() {
        let mut arena = SizeClassArena::<u16>::new(12, 1);
        let serial = arena.acquire(40).unwrap().serial();
        assert_eq!(arena.acquire(40).unwrap().capacity(), 48);

        for request in [25, 30, 48] {
            let buffer = arena.acquire(request).unwrap();
            assert_eq!(buffer.serial(), serial);
            assert!(buffer.capacity() >= request);
        }
        assert_eq!(arena.allocations(), 1);
    }

    #[test]
    fn test_each_class_is_allocated_once() {
        let mut arena = SizeClassArena::<u8>::new(8, 24);
        let small = arena.acquire(4).unwrap().serial();
        let large = arena.acquire(100).unwrap();
        assert_eq!(large.capacity(), 128);
        assert_eq!(large.as_slice().len(), 128 * 24);
        let large = large.serial();

        assert_ne!(small, large);
        assert_eq!(arena.acquire(3).unwrap().serial(), small);
        assert_eq!(arena.acquire(120).unwrap().serial(), large);
        assert_eq!(arena.allocations(), 2);
        assert_eq!(arena.resident_classes(), 2);

        arena.clear();
        assert_eq!(arena.resident_classes(), 0);
    }

    #[test]
    fn test_pool_pair_sizes() {
        let mut pool = BufferPool::new(24);
        let (attributes, indices) = pool.acquire_pair(4, 6).unwrap();
        assert_eq!(attributes.capacity(), 8);
        assert_eq!(attributes.as_slice().len(), 8 * 24);
        assert_eq!(indices.capacity(), 12);
        assert_eq!(pool.allocations(), 2);
    }

    #[test]
    fn test_ring_reuses_pair_zero_when_allowed() {
        let device = MockGraphicsDevice::default();
        let mut ring = GeometryRing::new(true);

        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 0);
        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 0);
        assert_eq!(ring.len(), 1);
        assert_eq!(device.created.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_ring_ping_pongs_within_a_frame() {
        let device = MockGraphicsDevice::default();
        let mut ring = GeometryRing::new(false);

        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 0);
        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 1);
        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 2);
        ring.begin_frame();
        assert_eq!(ring.upload_and_bind(&device, &[0; 48], &[0; 6]).unwrap(), 0);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_geometry_grows_to_power_of_two() {
        let device = MockGraphicsDevice::default();
        let mut geometry = PackedGeometry::default();

        geometry.upload(&device, &[0; 48], &[0; 6]).unwrap();
        let (vertex, _) = geometry.buffers().unwrap();
        geometry.upload(&device, &[0; 40], &[0; 6]).unwrap();
        assert_eq!(geometry.buffers().unwrap().0, vertex);

        geometry.upload(&device, &[0; 100], &[0; 6]).unwrap();
        assert_ne!(geometry.buffers().unwrap().0, vertex);
        assert_eq!(*device.destroyed.lock().unwrap(), vec![vertex]);

        let created = device.created.lock().unwrap();
        assert_eq!(created.last().unwrap().1, 128);

        drop(created);
        geometry.destroy(&device);
        assert!(geometry.buffers().is_none());
    }
}
