pub mod adapter_utils;
pub mod constant_buffer;
pub mod create_device;
pub mod debug_messages;
pub mod descriptor_heap;
pub mod device_resources;
pub mod fence_timeline;
pub mod pipeline_state;
pub mod populate_command_list;
pub mod root_signature;
pub mod shader;
pub mod texture;
pub mod transition_barrier;
pub mod upload_buffer;

use windows::Win32::Graphics::Direct3D::ID3DBlob;

/// Views the contents of a blob as bytes.
///
/// # Safety
/// The slice borrows the blob's buffer and must not outlive it.
pub unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize())
    }
}

/// Compiler and serializer diagnostics come back as text in a blob.
pub fn blob_to_string(blob: &ID3DBlob) -> String {
    let bytes = unsafe { blob_bytes(blob) };
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}
