use eyre::WrapErr;
use windows::Win32::Graphics::Direct3D12::*;

use super::device_resources::DeviceResources;
use super::device_resources::CLEAR_COLOR;
use super::device_resources::CLEAR_DEPTH;
use super::transition_barrier::transition_barrier;

/// Records one frame into the shared command list: targets bound and
/// cleared, then `record_draws` for the demo's own commands, then the
/// back buffer handed back for presentation. Leaves the list closed.
pub fn populate_command_list<F>(
    resources: &mut DeviceResources,
    pipeline_state: &ID3D12PipelineState,
    record_draws: F,
) -> eyre::Result<()>
where
    F: FnOnce(&ID3D12GraphicsCommandList, usize) -> eyre::Result<()>,
{
    let frame_index = resources.begin_frame();

    let command_allocator = resources.current_command_allocator();
    unsafe { command_allocator.Reset() }.wrap_err("reset command allocator")?;

    let command_list = &resources.command_list;
    unsafe { command_list.Reset(command_allocator, pipeline_state) }
        .wrap_err("reset command list")?;

    unsafe {
        command_list.RSSetViewports(&[resources.viewport]);
        command_list.RSSetScissorRects(&[resources.scissor_rect]);
    }

    let render_target = resources.current_render_target();
    let barrier_rt = transition_barrier(
        render_target,
        D3D12_RESOURCE_STATE_PRESENT,
        D3D12_RESOURCE_STATE_RENDER_TARGET,
    );
    unsafe { command_list.ResourceBarrier(&[barrier_rt]) };

    let rtv_handle = resources.rtv_handle();
    let dsv_handle = resources.dsv_handle();
    unsafe {
        command_list.OMSetRenderTargets(1, Some(&rtv_handle), false, Some(&dsv_handle));
        command_list.ClearRenderTargetView(rtv_handle, &CLEAR_COLOR, None);
        command_list.ClearDepthStencilView(dsv_handle, D3D12_CLEAR_FLAG_DEPTH, CLEAR_DEPTH, 0, None);
    }

    record_draws(command_list, frame_index)?;

    let barrier_present = transition_barrier(
        render_target,
        D3D12_RESOURCE_STATE_RENDER_TARGET,
        D3D12_RESOURCE_STATE_PRESENT,
    );
    unsafe { command_list.ResourceBarrier(&[barrier_present]) };

    unsafe { command_list.Close() }.wrap_err("close command list")
}
