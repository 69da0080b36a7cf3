use eyre::WrapErr;
use windows::Win32::Graphics::Direct3D12::*;

/// A descriptor heap plus the handle increment for its type.
pub struct DescriptorHeap {
    pub heap: ID3D12DescriptorHeap,
    pub increment: u32,
    pub len: u32,
}

impl DescriptorHeap {
    pub fn new(
        device: &ID3D12Device,
        kind: D3D12_DESCRIPTOR_HEAP_TYPE,
        len: u32,
        shader_visible: bool,
    ) -> eyre::Result<Self> {
        let flags = if shader_visible {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };
        let heap: ID3D12DescriptorHeap = unsafe {
            device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                Type: kind,
                NumDescriptors: len,
                Flags: flags,
                ..Default::default()
            })
        }
        .wrap_err_with(|| format!("create descriptor heap {kind:?} x{len}"))?;
        let increment = unsafe { device.GetDescriptorHandleIncrementSize(kind) };
        Ok(Self {
            heap,
            increment,
            len,
        })
    }

    pub fn cpu(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        debug_assert!(index < self.len);
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: unsafe { self.heap.GetCPUDescriptorHandleForHeapStart() }.ptr
                + (index * self.increment) as usize,
        }
    }

    /// Only valid for shader-visible heaps.
    pub fn gpu(&self, index: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        debug_assert!(index < self.len);
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: unsafe { self.heap.GetGPUDescriptorHandleForHeapStart() }.ptr
                + (index * self.increment) as u64,
        }
    }
}
