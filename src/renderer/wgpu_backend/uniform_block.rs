use std::cell::Cell;

/// A CPU side copy of a uniform block paired with the GPU buffer and bind
/// group that shaders read it through.
///
/// Change values with `values_mut()` and call `update_gpu()` to copy them to
/// the GPU. Buffers that were not touched since the last update are skipped.
#[derive(Debug)]
pub struct UniformBlock<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    values: T,
    gpu_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// True if `values` is potentially out of sync with the GPU buffer.
    is_dirty: Cell<bool>,
}

impl<T> UniformBlock<T>
where
    T: Clone + Copy + std::fmt::Debug + bytemuck::Pod + bytemuck::Zeroable,
{
    /// Create a new uniform block bound at binding 0 of `bind_group_layout`.
    pub fn new(
        device: &wgpu::Device,
        label: Option<&str>,
        values: T,
        bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let gpu_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label,
                contents: bytemuck::bytes_of(&values),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: gpu_buffer.as_entire_binding(),
            }],
        });

        Self {
            values,
            gpu_buffer,
            bind_group,
            is_dirty: Cell::new(false),
        }
    }

    /// Access the values with a mutable ref. This marks the block dirty even if
    /// nothing is changed.
    pub fn values_mut(&mut self) -> &mut T {
        self.is_dirty.set(true);
        &mut self.values
    }

    /// Copy the values to the GPU if they changed since the last copy.
    pub fn update_gpu(&self, queue: &wgpu::Queue) {
        if self.is_dirty.replace(false) {
            queue.write_buffer(&self.gpu_buffer, 0, bytemuck::bytes_of(&self.values));
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
