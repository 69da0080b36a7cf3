use eyre::eyre;
use tracing::debug;
use tracing::info;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::D3D12CreateDevice;
use windows::Win32::Graphics::Direct3D12::ID3D12Device;
use windows::Win32::Graphics::Dxgi::*;

/// Minimum feature level the sample asks the device for.
pub const MIN_FEATURE_LEVEL: D3D_FEATURE_LEVEL = D3D_FEATURE_LEVEL_11_0;

/// Returns the first hardware adapter that can create a Direct3D 12 device.
///
/// Software adapters are skipped; pass `-warp` to use WARP explicitly.
pub fn get_hardware_adapter(factory: &IDXGIFactory4) -> eyre::Result<IDXGIAdapter1> {
    for i in 0.. {
        let adapter = match unsafe { factory.EnumAdapters1(i) } {
            Ok(a) => a,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => return Err(e.into()),
        };

        let desc = unsafe { adapter.GetDesc1()? };
        let adapter_name = String::from_utf16_lossy(&desc.Description)
            .trim_end_matches('\0')
            .to_string();

        if (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE)
            != DXGI_ADAPTER_FLAG_NONE
        {
            debug!(index = i, %adapter_name, "skipping software adapter");
            continue;
        }

        let supported = unsafe {
            D3D12CreateDevice(
                &adapter,
                MIN_FEATURE_LEVEL,
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
        }
        .is_ok();
        if supported {
            info!(index = i, %adapter_name, "selected adapter");
            return Ok(adapter);
        }
        debug!(index = i, %adapter_name, "adapter lacks feature level 11.0");
    }

    Err(eyre!("no hardware adapter supports Direct3D 12 at feature level 11.0"))
}
