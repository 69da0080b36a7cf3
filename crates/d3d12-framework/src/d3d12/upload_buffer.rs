use bytemuck::Pod;
use eyre::eyre;
use eyre::WrapErr;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

pub fn buffer_desc(width: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: width,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    }
}

/// Creates an upload-heap buffer of `size` bytes in the generic-read state.
pub fn create_upload_buffer(
    device: &ID3D12Device,
    size: u64,
    name: PCWSTR,
) -> eyre::Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_UPLOAD,
        ..Default::default()
    };

    let mut buffer: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &heap_props,
            D3D12_HEAP_FLAG_NONE,
            &buffer_desc(size),
            D3D12_RESOURCE_STATE_GENERIC_READ,
            None,
            &mut buffer,
        )
    }
    .wrap_err("create upload buffer")?;
    let buffer = buffer.ok_or_else(|| eyre!("CreateCommittedResource returned no buffer"))?;
    unsafe { buffer.SetName(name) }.ok();
    Ok(buffer)
}

/// Creates an upload-heap buffer holding a copy of `data`.
pub fn upload_slice<T: Pod>(
    device: &ID3D12Device,
    data: &[T],
    name: PCWSTR,
) -> eyre::Result<ID3D12Resource> {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    let buffer = create_upload_buffer(device, bytes.len() as u64, name)?;

    unsafe {
        let mut data_ptr = std::ptr::null_mut();
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        buffer
            .Map(0, Some(&read_range), Some(&mut data_ptr))
            .wrap_err("map upload buffer")?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr as *mut u8, bytes.len());
        buffer.Unmap(0, None);
    }

    Ok(buffer)
}

pub struct VertexBuffer {
    pub resource: ID3D12Resource,
    pub view: D3D12_VERTEX_BUFFER_VIEW,
}

impl VertexBuffer {
    pub fn new<T: Pod>(device: &ID3D12Device, vertices: &[T], name: PCWSTR) -> eyre::Result<Self> {
        let resource = upload_slice(device, vertices, name)?;
        let view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
            StrideInBytes: std::mem::size_of::<T>() as u32,
            SizeInBytes: std::mem::size_of_val(vertices) as u32,
        };
        Ok(Self { resource, view })
    }
}

pub struct IndexBuffer {
    pub resource: ID3D12Resource,
    pub view: D3D12_INDEX_BUFFER_VIEW,
    pub index_count: u32,
}

impl IndexBuffer {
    pub fn new(device: &ID3D12Device, indices: &[u32], name: PCWSTR) -> eyre::Result<Self> {
        let resource = upload_slice(device, indices, name)?;
        let view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
            SizeInBytes: std::mem::size_of_val(indices) as u32,
            Format: DXGI_FORMAT_R32_UINT,
        };
        Ok(Self {
            resource,
            view,
            index_count: indices.len() as u32,
        })
    }
}
