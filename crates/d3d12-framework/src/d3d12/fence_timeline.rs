use eyre::WrapErr;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::*;

use crate::frame_pacer::GpuTimeline;
use crate::frame_pacer::Presenter;

/// Command queue, fence and wait event: the GPU timeline the frame pacer
/// drives.
pub struct FenceTimeline {
    command_queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    fence_event: HANDLE,
}

impl FenceTimeline {
    pub fn new(
        device: &ID3D12Device,
        command_queue: &ID3D12CommandQueue,
        initial_value: u64,
    ) -> eyre::Result<Self> {
        let fence: ID3D12Fence =
            unsafe { device.CreateFence(initial_value, D3D12_FENCE_FLAG_NONE) }
                .wrap_err("create fence")?;
        let fence_event = unsafe { CreateEventA(None, false, false, None) }
            .wrap_err("create fence event")?;
        Ok(Self {
            command_queue: command_queue.clone(),
            fence,
            fence_event,
        })
    }
}

impl GpuTimeline for FenceTimeline {
    fn signal(&mut self, value: u64) -> eyre::Result<()> {
        // Queued behind all work executed so far, not set from the CPU.
        unsafe { self.command_queue.Signal(&self.fence, value) }.wrap_err("signal fence")
    }

    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for_value(&mut self, value: u64) -> eyre::Result<()> {
        // The event fires once the fence reaches `value`; an already reached
        // value fires it immediately.
        unsafe {
            self.fence
                .SetEventOnCompletion(value, self.fence_event)
                .wrap_err("set fence completion event")?;
            WaitForSingleObjectEx(self.fence_event, INFINITE, false);
        }
        Ok(())
    }
}

impl Drop for FenceTimeline {
    fn drop(&mut self) {
        if !self.fence_event.is_invalid() {
            unsafe { CloseHandle(self.fence_event) }.ok();
        }
    }
}

impl Presenter for IDXGISwapChain3 {
    fn present(&mut self, sync_interval: u32) -> eyre::Result<()> {
        unsafe { self.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .wrap_err("present")
    }

    fn current_back_buffer_index(&self) -> u32 {
        unsafe { self.GetCurrentBackBufferIndex() }
    }
}
