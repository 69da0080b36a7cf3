use bevy_math::Mat4;
use eyre::eyre;
use tracing::info;
use windows::core::s;
use windows::core::w;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::frame_constants;
use super::write_world;
use super::Demo;
use crate::config::SampleCommandLine;
use crate::config::FRAME_COUNT;
use crate::d3d12::constant_buffer::ConstantBufferView;
use crate::d3d12::descriptor_heap::DescriptorHeap;
use crate::d3d12::device_resources::DeviceResources;
use crate::d3d12::pipeline_state::GraphicsPipeline;
use crate::d3d12::root_signature::create_root_signature;
use crate::d3d12::root_signature::descriptor_range;
use crate::d3d12::root_signature::linear_clamp_sampler;
use crate::d3d12::root_signature::root_table;
use crate::d3d12::shader::load_shader;
use crate::d3d12::texture::upload_texture;
use crate::d3d12::upload_buffer::IndexBuffer;
use crate::d3d12::upload_buffer::VertexBuffer;
use crate::file_util::search_file_path;
use crate::geometry::QUAD_INDICES;
use crate::geometry::QUAD_VERTICES;
use crate::transform::Transform;

const TEXTURE_FILE: &str = "SampleTexture.png";
/// The SRV sits after the per-frame CBVs.
const SRV_HEAP_INDEX: u32 = FRAME_COUNT as u32;

pub struct TexturedQuad {
    root_signature: ID3D12RootSignature,
    pipeline_state: ID3D12PipelineState,
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    cbv_srv_heap: DescriptorHeap,
    constants: [ConstantBufferView<Transform>; FRAME_COUNT],
    base_transform: Transform,
    _texture: ID3D12Resource,
}

impl TexturedQuad {
    pub fn new(
        device: &ID3D12Device,
        resources: &mut DeviceResources,
        command_line: &SampleCommandLine,
    ) -> eyre::Result<Self> {
        let cbv_ranges = [descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 0)];
        let srv_ranges = [descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_SRV, 0)];
        let parameters = [
            root_table(&cbv_ranges, D3D12_SHADER_VISIBILITY_VERTEX),
            root_table(&srv_ranges, D3D12_SHADER_VISIBILITY_PIXEL),
        ];
        let samplers = [linear_clamp_sampler(0)];
        let root_signature = create_root_signature(
            device,
            &D3D12_ROOT_SIGNATURE_DESC {
                NumParameters: parameters.len() as u32,
                pParameters: parameters.as_ptr(),
                NumStaticSamplers: samplers.len() as u32,
                pStaticSamplers: samplers.as_ptr(),
                Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
            },
        )?;

        let vertex_shader = load_shader("SimpleTexVS", s!("main"), s!("vs_5_0"))?;
        let pixel_shader = load_shader("SimpleTexPS", s!("main"), s!("ps_5_0"))?;

        let input_layout = [
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("POSITION"),
                Format: DXGI_FORMAT_R32G32B32_FLOAT,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("TEXCOORD"),
                Format: DXGI_FORMAT_R32G32_FLOAT,
                AlignedByteOffset: 12,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
        ];

        let pipeline_state = GraphicsPipeline {
            root_signature: &root_signature,
            vertex_shader: &vertex_shader,
            pixel_shader: &pixel_shader,
            input_layout: &input_layout,
            alpha_blend: false,
        }
        .create(device)?;

        let vertex_buffer = VertexBuffer::new(device, &QUAD_VERTICES, w!("QuadVertices"))?;
        let index_buffer = IndexBuffer::new(device, &QUAD_INDICES, w!("QuadIndices"))?;

        let cbv_srv_heap = DescriptorHeap::new(
            device,
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            FRAME_COUNT as u32 + 1,
            true,
        )?;
        let aspect_ratio = command_line.aspect_ratio();
        let constants = frame_constants(device, &cbv_srv_heap, aspect_ratio)?;

        let texture_path = search_file_path(TEXTURE_FILE)
            .ok_or_else(|| eyre!("search for {TEXTURE_FILE}: not found"))?;
        let texture = upload_texture(device, resources, &texture_path, &cbv_srv_heap, SRV_HEAP_INDEX)?;

        info!("textured quad ready");
        Ok(Self {
            root_signature,
            pipeline_state,
            vertex_buffer,
            index_buffer,
            cbv_srv_heap,
            constants,
            base_transform: Transform::new(aspect_ratio),
            _texture: texture,
        })
    }
}

impl Demo for TexturedQuad {
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
        unsafe {
            command_list.SetGraphicsRootSignature(&self.root_signature);
            command_list.SetDescriptorHeaps(&[Some(self.cbv_srv_heap.heap.clone())]);
            command_list.SetGraphicsRootDescriptorTable(0, self.constants[frame_index].gpu_handle);
            command_list.SetGraphicsRootDescriptorTable(1, self.cbv_srv_heap.gpu(SRV_HEAP_INDEX));
            command_list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            command_list.IASetVertexBuffers(0, Some(&[self.vertex_buffer.view]));
            command_list.IASetIndexBuffer(Some(&self.index_buffer.view));
            command_list.DrawIndexedInstanced(self.index_buffer.index_count, 1, 0, 0, 0);
        }
        Ok(())
    }
}
