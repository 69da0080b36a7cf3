use eyre::eyre;
use eyre::WrapErr;
use tracing::info;
use tracing::warn;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;

use super::adapter_utils::get_hardware_adapter;
use super::adapter_utils::MIN_FEATURE_LEVEL;
use crate::config::SampleCommandLine;

pub struct CreatedDevice {
    pub dxgi_factory: IDXGIFactory4,
    pub device: ID3D12Device,
    /// Only present in debug builds with the SDK layers installed.
    pub info_queue: Option<IDXGIInfoQueue>,
}

/// Enables the debug layer in debug builds, then creates the factory and a
/// device on the chosen adapter.
pub fn create_device(command_line: &SampleCommandLine) -> eyre::Result<CreatedDevice> {
    let mut factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
    let mut info_queue = None;

    if cfg!(debug_assertions) && enable_debug_layer() {
        factory_flags |= DXGI_CREATE_FACTORY_DEBUG;
        match unsafe { DXGIGetDebugInterface1::<IDXGIInfoQueue>(0) } {
            Ok(queue) => {
                info!("DXGI info queue obtained");
                info_queue = Some(queue);
            }
            Err(e) => warn!("failed to get DXGI info queue: {e}"),
        }
    }

    let dxgi_factory: IDXGIFactory4 =
        unsafe { CreateDXGIFactory2(factory_flags) }.wrap_err("create DXGI factory")?;

    let adapter = if command_line.use_warp_device {
        info!("using WARP adapter");
        unsafe { dxgi_factory.EnumWarpAdapter()? }
    } else {
        get_hardware_adapter(&dxgi_factory)?
    };

    let mut device: Option<ID3D12Device> = None;
    unsafe { D3D12CreateDevice(&adapter, MIN_FEATURE_LEVEL, &mut device) }
        .wrap_err("create D3D12 device")?;
    let device = device.ok_or_else(|| eyre!("D3D12CreateDevice returned no device"))?;

    Ok(CreatedDevice {
        dxgi_factory,
        device,
        info_queue,
    })
}

fn enable_debug_layer() -> bool {
    unsafe {
        let mut debug1: Option<ID3D12Debug1> = None;
        if D3D12GetDebugInterface(&mut debug1).is_ok() {
            if let Some(debug1) = debug1 {
                debug1.EnableDebugLayer();
                debug1.SetEnableGPUBasedValidation(true);
                info!("D3D12 debug layer enabled with GPU-based validation");
                return true;
            }
        }

        let mut debug: Option<ID3D12Debug> = None;
        if D3D12GetDebugInterface(&mut debug).is_ok() {
            if let Some(debug) = debug {
                debug.EnableDebugLayer();
                info!("D3D12 debug layer enabled");
                return true;
            }
        }
    }
    warn!("D3D12 debug layer unavailable");
    false
}
