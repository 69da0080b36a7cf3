use bevy_math::Mat4;
use eyre::bail;
use eyre::WrapErr;
use tracing::info;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::*;

use super::frame_constants;
use super::write_world;
use super::Demo;
use crate::config::SampleCommandLine;
use crate::config::FRAME_COUNT;
use crate::d3d12::constant_buffer::ConstantBufferView;
use crate::d3d12::descriptor_heap::DescriptorHeap;
use crate::d3d12::pipeline_state::create_mesh_shader_pipeline;
use crate::d3d12::root_signature::create_root_signature;
use crate::d3d12::root_signature::descriptor_range;
use crate::d3d12::root_signature::root_table;
use crate::d3d12::shader::load_compiled_shader;
use crate::transform::Transform;

/// A quad emitted entirely by a mesh shader; no vertex or index buffers.
pub struct MeshShader {
    root_signature: ID3D12RootSignature,
    pipeline_state: ID3D12PipelineState,
    cbv_heap: DescriptorHeap,
    constants: [ConstantBufferView<Transform>; FRAME_COUNT],
    base_transform: Transform,
}

fn check_mesh_shader_support(device: &ID3D12Device) -> eyre::Result<()> {
    let mut options7 = D3D12_FEATURE_DATA_D3D12_OPTIONS7::default();
    unsafe {
        device.CheckFeatureSupport(
            D3D12_FEATURE_D3D12_OPTIONS7,
            &mut options7 as *mut _ as *mut _,
            std::mem::size_of::<D3D12_FEATURE_DATA_D3D12_OPTIONS7>() as u32,
        )
    }
    .wrap_err("query D3D12_OPTIONS7")?;

    if options7.MeshShaderTier == D3D12_MESH_SHADER_TIER_NOT_SUPPORTED {
        bail!("device does not support mesh shaders");
    }
    info!(tier = options7.MeshShaderTier.0, "mesh shaders supported");
    Ok(())
}

impl MeshShader {
    pub fn new(device: &ID3D12Device, command_line: &SampleCommandLine) -> eyre::Result<Self> {
        check_mesh_shader_support(device)?;

        let cbv_ranges = [descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 0)];
        let parameters = [root_table(&cbv_ranges, D3D12_SHADER_VISIBILITY_MESH)];
        let root_signature = create_root_signature(
            device,
            &D3D12_ROOT_SIGNATURE_DESC {
                NumParameters: parameters.len() as u32,
                pParameters: parameters.as_ptr(),
                Flags: D3D12_ROOT_SIGNATURE_FLAG_NONE,
                ..Default::default()
            },
        )?;

        // Shader model 6.5 is out of reach of the legacy compiler.
        let mesh_shader = load_compiled_shader("SimpleMS")?;
        let pixel_shader = load_compiled_shader("SimpleMSPS")?;
        let pipeline_state =
            create_mesh_shader_pipeline(device, &root_signature, &mesh_shader, &pixel_shader)?;

        let cbv_heap = DescriptorHeap::new(
            device,
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            FRAME_COUNT as u32,
            true,
        )?;
        let aspect_ratio = command_line.aspect_ratio();
        let constants = frame_constants(device, &cbv_heap, aspect_ratio)?;

        info!("mesh shader pipeline ready");
        Ok(Self {
            root_signature,
            pipeline_state,
            cbv_heap,
            constants,
            base_transform: Transform::new(aspect_ratio),
        })
    }
}

impl Demo for MeshShader {
    fn pipeline_state(&self) -> &ID3D12PipelineState {
        &self.pipeline_state
    }

    fn update(&mut self, frame_index: usize, world: Mat4) {
        write_world(&mut self.constants, &self.base_transform, frame_index, world);
    }

    fn record(
        &self,
        command_list: &ID3D12GraphicsCommandList,
        frame_index: usize,
    ) -> eyre::Result<()> {
        let mesh_list: ID3D12GraphicsCommandList6 = command_list
            .cast()
            .wrap_err("query ID3D12GraphicsCommandList6")?;
        unsafe {
            mesh_list.SetGraphicsRootSignature(&self.root_signature);
            mesh_list.SetDescriptorHeaps(&[Some(self.cbv_heap.heap.clone())]);
            mesh_list.SetGraphicsRootDescriptorTable(0, self.constants[frame_index].gpu_handle);
            mesh_list.DispatchMesh(1, 1, 1);
        }
        Ok(())
    }
}
