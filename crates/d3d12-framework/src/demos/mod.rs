pub mod mesh_shader;
pub mod multi_draw;
pub mod textured_quad;

use bevy_math::Mat4;
use windows::Win32::Graphics::Direct3D12::*;

use crate::config::DemoKind;
use crate::config::SampleCommandLine;
use crate::config::FRAME_COUNT;
use crate::d3d12::constant_buffer::ConstantBufferView;
use crate::d3d12::descriptor_heap::DescriptorHeap;
use crate::d3d12::device_resources::DeviceResources;
use crate::transform::Transform;

/// The per-demo part of a frame: resources, pipeline and draw calls.
pub trait Demo {
    /// Pipeline the command list is reset with each frame.
    fn pipeline_state(&self) -> &ID3D12PipelineState;

    /// Writes the constants for `frame_index`. Only called once the frame
    /// pacer has retired that slot.
    fn update(&mut self, frame_index: usize, world: Mat4);

    /// Records the demo's draws after targets are bound and cleared.
    fn record(
        &self,
        command_list: &ID3D12GraphicsCommandList,
        frame_index: usize,
    ) -> eyre::Result<()>;
}

pub fn create_demo(
    device: &ID3D12Device,
    resources: &mut DeviceResources,
    command_line: &SampleCommandLine,
) -> eyre::Result<Box<dyn Demo>> {
    Ok(match command_line.demo {
        DemoKind::TexturedQuad => Box::new(textured_quad::TexturedQuad::new(
            device,
            resources,
            command_line,
        )?),
        DemoKind::MultiDraw => Box::new(multi_draw::MultiDraw::new(device, command_line)?),
        DemoKind::MeshShader => Box::new(mesh_shader::MeshShader::new(device, command_line)?),
    })
}

/// One transform constant buffer per frame slot, views at heap slots
/// `0..FRAME_COUNT`.
pub(crate) fn frame_constants(
    device: &ID3D12Device,
    heap: &DescriptorHeap,
    aspect_ratio: f32,
) -> eyre::Result<[ConstantBufferView<Transform>; FRAME_COUNT]> {
    let initial = Transform::new(aspect_ratio);
    array_init::try_array_init(|i: usize| {
        ConstantBufferView::new(
            device,
            heap,
            i as u32,
            initial,
            windows::core::w!("TransformConstants"),
        )
    })
}

/// Writes `world` into the slot's transform, keeping view and projection.
pub(crate) fn write_world(
    constants: &mut [ConstantBufferView<Transform>; FRAME_COUNT],
    base: &Transform,
    frame_index: usize,
    world: Mat4,
) {
    constants[frame_index].write(Transform { world, ..*base });
}
