use std::path::Path;

use eyre::eyre;
use eyre::WrapErr;
use tracing::info;
use windows::core::w;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::descriptor_heap::DescriptorHeap;
use super::device_resources::DeviceResources;
use super::transition_barrier::transition_barrier;
use super::upload_buffer::create_upload_buffer;
use crate::texture_image::copy_rows;
use crate::texture_image::load_texture_image;

/// Sampled as sRGB so the shader sees linear color.
pub const TEXTURE_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM_SRGB;

/// Loads an image into a default-heap texture and writes its SRV into
/// `heap[heap_index]`.
///
/// The copy goes through a staging buffer on the shared command list and
/// blocks until the GPU has finished it.
pub fn upload_texture(
    device: &ID3D12Device,
    resources: &mut DeviceResources,
    path: &Path,
    heap: &DescriptorHeap,
    heap_index: u32,
) -> eyre::Result<ID3D12Resource> {
    let image = load_texture_image(path)?;

    let desc = D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        Alignment: 0,
        Width: image.width as u64,
        Height: image.height,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: TEXTURE_FORMAT,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        Flags: D3D12_RESOURCE_FLAG_NONE,
    };
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_DEFAULT,
        ..Default::default()
    };

    let mut texture: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &heap_props,
            D3D12_HEAP_FLAG_NONE,
            &desc,
            D3D12_RESOURCE_STATE_COPY_DEST,
            None,
            &mut texture,
        )
    }
    .wrap_err("create texture")?;
    let texture = texture.ok_or_else(|| eyre!("CreateCommittedResource returned no texture"))?;
    unsafe { texture.SetName(w!("Texture")) }.ok();

    let mut footprint = D3D12_PLACED_SUBRESOURCE_FOOTPRINT::default();
    let mut num_rows = 0u32;
    let mut row_size = 0u64;
    let mut total_bytes = 0u64;
    unsafe {
        device.GetCopyableFootprints(
            &desc,
            0,
            1,
            0,
            Some(&mut footprint),
            Some(&mut num_rows),
            Some(&mut row_size),
            Some(&mut total_bytes),
        )
    };

    let staging = create_upload_buffer(device, total_bytes, w!("TextureStaging"))?;
    unsafe {
        let mut data_ptr = std::ptr::null_mut();
        let read_range = D3D12_RANGE { Begin: 0, End: 0 };
        staging
            .Map(0, Some(&read_range), Some(&mut data_ptr))
            .wrap_err("map texture staging buffer")?;
        let dst = std::slice::from_raw_parts_mut(data_ptr as *mut u8, total_bytes as usize);
        let copied = copy_rows(
            &image.pixels,
            image.row_bytes(),
            dst,
            footprint.Footprint.RowPitch as usize,
        );
        staging.Unmap(0, None);
        copied?;
    }

    resources.begin_frame();
    let command_allocator = resources.current_command_allocator();
    let command_list = &resources.command_list;
    unsafe {
        command_allocator.Reset().wrap_err("reset command allocator")?;
        command_list
            .Reset(command_allocator, None::<&ID3D12PipelineState>)
            .wrap_err("reset command list")?;

        let dst_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: std::mem::transmute_copy(&texture),
            Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                SubresourceIndex: 0,
            },
        };
        let src_location = D3D12_TEXTURE_COPY_LOCATION {
            pResource: std::mem::transmute_copy(&staging),
            Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
            Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
                PlacedFootprint: footprint,
            },
        };
        command_list.CopyTextureRegion(&dst_location, 0, 0, 0, &src_location, None);

        command_list.ResourceBarrier(&[transition_barrier(
            &texture,
            D3D12_RESOURCE_STATE_COPY_DEST,
            D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE,
        )]);
        command_list.Close().wrap_err("close command list")?;
    }
    resources.execute_command_list()?;
    resources.wait_for_gpu()?;

    let srv_desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
        Format: TEXTURE_FORMAT,
        ViewDimension: D3D12_SRV_DIMENSION_TEXTURE2D,
        Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
        Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
            Texture2D: D3D12_TEX2D_SRV {
                MostDetailedMip: 0,
                MipLevels: 1,
                PlaneSlice: 0,
                ResourceMinLODClamp: 0.0,
            },
        },
    };
    unsafe { device.CreateShaderResourceView(&texture, Some(&srv_desc), heap.cpu(heap_index)) };

    info!(
        path = %path.display(),
        width = image.width,
        height = image.height,
        row_pitch = footprint.Footprint.RowPitch,
        "texture uploaded"
    );
    Ok(texture)
}
