use bytemuck::Pod;
use log::info;

use crate::Bindable;

/// Storage buffer that exists only in VRAM.
///
/// The host can overwrite (parts of) it, but never reads it back.
#[derive(Debug)]
pub struct StorageBuffer {
    buffer: wgpu::Buffer,
    size: usize,
}

impl StorageBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        Self::new_ex(device, label, size, wgpu::BufferUsages::empty())
    }

    /// Creates a buffer that can also hold arguments for indirect dispatches.
    pub fn new_indirect(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        Self::new_ex(device, label, size, wgpu::BufferUsages::INDIRECT)
    }

    fn new_ex(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let label = label.as_ref();
        let size = pad_size(size);

        info!("Allocating storage buffer `{label}`; size={size}");

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC
                | usage,
            size: size as _,
            mapped_at_creation: false,
        });

        Self { buffer, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Overwrites the buffer, starting at given offset (in bytes).
    pub fn write<T>(&self, queue: &wgpu::Queue, offset: usize, data: &[T])
    where
        T: Pod,
    {
        let data = bytemuck::cast_slice(data);

        assert!(
            offset + data.len() <= self.size,
            "Tried to write {} bytes at offset {offset} into a buffer of {} bytes",
            data.len(),
            self.size,
        );

        queue.write_buffer(&self.buffer, offset as _, data);
    }

    /// Zeroes given range (in bytes) of the buffer.
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        offset: usize,
        size: usize,
    ) {
        encoder.clear_buffer(
            &self.buffer,
            offset as _,
            wgpu::BufferSize::new(size as _),
        );
    }

    pub fn bind_readable(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: true,
        }
    }

    pub fn bind_writable(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: false,
        }
    }
}

pub struct StorageBufferBinder<'a> {
    parent: &'a StorageBuffer,
    read_only: bool,
}

impl Bindable for StorageBufferBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage {
                    read_only: self.read_only,
                },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let resource = self.parent.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}

/// Rounds given size up to a multiple of 16 bytes (and at least 16 bytes),
/// so that every buffer can be bound as an array of `Vec4`.
pub fn pad_size(size: usize) -> usize {
    ((size + 15) & !15).max(16)
}
