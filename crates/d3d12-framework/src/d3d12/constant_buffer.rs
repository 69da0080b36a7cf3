use std::marker::PhantomData;

use eyre::WrapErr;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Direct3D12::*;

use super::descriptor_heap::DescriptorHeap;
use super::upload_buffer::create_upload_buffer;

/// Constant buffer sizes must be multiples of 256 bytes.
pub const fn aligned_size<T>() -> u64 {
    let size = std::mem::size_of::<T>() as u64;
    (size + D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64 - 1)
        & !(D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u64 - 1)
}

/// A persistently mapped upload-heap buffer holding one `T`, with its view
/// written into a descriptor heap slot.
pub struct ConstantBufferView<T: Copy> {
    resource: ID3D12Resource,
    mapped: *mut T,
    pub desc: D3D12_CONSTANT_BUFFER_VIEW_DESC,
    pub cpu_handle: D3D12_CPU_DESCRIPTOR_HANDLE,
    pub gpu_handle: D3D12_GPU_DESCRIPTOR_HANDLE,
    _marker: PhantomData<T>,
}

impl<T: Copy> ConstantBufferView<T> {
    pub fn new(
        device: &ID3D12Device,
        heap: &DescriptorHeap,
        heap_index: u32,
        initial: T,
        name: PCWSTR,
    ) -> eyre::Result<Self> {
        let size = aligned_size::<T>();
        let resource = create_upload_buffer(device, size, name)?;

        let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
            BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
            SizeInBytes: size as u32,
        };
        let cpu_handle = heap.cpu(heap_index);
        let gpu_handle = heap.gpu(heap_index);
        unsafe { device.CreateConstantBufferView(Some(&desc), cpu_handle) };

        let mut data_ptr = std::ptr::null_mut();
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        unsafe { resource.Map(0, Some(&read_range), Some(&mut data_ptr)) }
            .wrap_err("map constant buffer")?;

        let mut view = Self {
            resource,
            mapped: data_ptr as *mut T,
            desc,
            cpu_handle,
            gpu_handle,
            _marker: PhantomData,
        };
        view.write(initial);
        Ok(view)
    }

    /// The GPU must not be reading this buffer; the frame pacer guarantees
    /// that for the current slot.
    pub fn write(&mut self, value: T) {
        unsafe { self.mapped.write(value) };
    }
}

impl<T: Copy> Drop for ConstantBufferView<T> {
    fn drop(&mut self) {
        unsafe { self.resource.Unmap(0, None) };
    }
}
