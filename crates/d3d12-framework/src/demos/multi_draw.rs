use bevy_math::Mat4;
use eyre::eyre;
use eyre::WrapErr;
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
use crate::d3d12::pipeline_state::GraphicsPipeline;
use crate::d3d12::root_signature::create_root_signature;
use crate::d3d12::root_signature::descriptor_range;
use crate::d3d12::root_signature::root_constants;
use crate::d3d12::root_signature::root_table;
use crate::d3d12::shader::load_shader;
use crate::d3d12::upload_buffer::IndexBuffer;
use crate::d3d12::upload_buffer::VertexBuffer;
use crate::file_util::search_file_path;
use crate::mesh::load_mesh;
use crate::mesh::Material;
use crate::transform::Transform;

/// Root parameter holding the material color constants.
const MATERIAL_PARAMETER: u32 = 1;

struct DrawItem {
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    color: [f32; 4],
}

/// Draws every sub-mesh of a loaded model with its own indexed draw call.
pub struct MultiDraw {
    root_signature: ID3D12RootSignature,
    pipeline_state: ID3D12PipelineState,
    draws: Vec<DrawItem>,
    cbv_heap: DescriptorHeap,
    constants: [ConstantBufferView<Transform>; FRAME_COUNT],
    base_transform: Transform,
}

fn material_color(material: &Material) -> [f32; 4] {
    let [r, g, b] = material.diffuse;
    [r, g, b, material.alpha]
}

impl MultiDraw {
    pub fn new(device: &ID3D12Device, command_line: &SampleCommandLine) -> eyre::Result<Self> {
        let model_path = search_file_path(&command_line.model_path).ok_or_else(|| {
            eyre!("search for model {}: not found", command_line.model_path.display())
        })?;
        let (meshes, materials) =
            load_mesh(&model_path).wrap_err_with(|| format!("load {}", model_path.display()))?;

        let draws = meshes
            .iter()
            .map(|mesh| {
                let color = materials
                    .get(mesh.material_id)
                    .map(material_color)
                    .unwrap_or_else(|| material_color(&Material::default()));
                Ok(DrawItem {
                    vertex_buffer: VertexBuffer::new(device, &mesh.vertices, w!("MeshVertices"))?,
                    index_buffer: IndexBuffer::new(device, &mesh.indices, w!("MeshIndices"))?,
                    color,
                })
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        let cbv_ranges = [descriptor_range(D3D12_DESCRIPTOR_RANGE_TYPE_CBV, 0)];
        let parameters = [
            root_table(&cbv_ranges, D3D12_SHADER_VISIBILITY_VERTEX),
            root_constants(1, 4, D3D12_SHADER_VISIBILITY_PIXEL),
        ];
        let root_signature = create_root_signature(
            device,
            &D3D12_ROOT_SIGNATURE_DESC {
                NumParameters: parameters.len() as u32,
                pParameters: parameters.as_ptr(),
                Flags: D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT,
                ..Default::default()
            },
        )?;

        let vertex_shader = load_shader("MeshVS", s!("main"), s!("vs_5_0"))?;
        let pixel_shader = load_shader("MeshPS", s!("main"), s!("ps_5_0"))?;

        let input_layout = [
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("POSITION"),
                Format: DXGI_FORMAT_R32G32B32_FLOAT,
                AlignedByteOffset: 0,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("NORMAL"),
                Format: DXGI_FORMAT_R32G32B32_FLOAT,
                AlignedByteOffset: 12,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("TEXCOORD"),
                Format: DXGI_FORMAT_R32G32_FLOAT,
                AlignedByteOffset: 24,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
            D3D12_INPUT_ELEMENT_DESC {
                SemanticName: s!("TANGENT"),
                Format: DXGI_FORMAT_R32G32B32_FLOAT,
                AlignedByteOffset: 32,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                ..Default::default()
            },
        ];

        let pipeline_state = GraphicsPipeline {
            root_signature: &root_signature,
            vertex_shader: &vertex_shader,
            pixel_shader: &pixel_shader,
            input_layout: &input_layout,
            alpha_blend: true,
        }
        .create(device)?;

        let cbv_heap = DescriptorHeap::new(
            device,
            D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            FRAME_COUNT as u32,
            true,
        )?;
        let aspect_ratio = command_line.aspect_ratio();
        let constants = frame_constants(device, &cbv_heap, aspect_ratio)?;

        info!(
            path = %model_path.display(),
            draws = draws.len(),
            materials = materials.len(),
            "multi-draw model ready"
        );
        Ok(Self {
            root_signature,
            pipeline_state,
            draws,
            cbv_heap,
            constants,
            base_transform: Transform::new(aspect_ratio),
        })
    }
}

impl Demo for MultiDraw {
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
            command_list.SetDescriptorHeaps(&[Some(self.cbv_heap.heap.clone())]);
            command_list.SetGraphicsRootDescriptorTable(0, self.constants[frame_index].gpu_handle);
            command_list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
        for draw in &self.draws {
            unsafe {
                command_list.SetGraphicsRoot32BitConstants(
                    MATERIAL_PARAMETER,
                    draw.color.len() as u32,
                    draw.color.as_ptr() as *const _,
                    0,
                );
                command_list.IASetVertexBuffers(0, Some(&[draw.vertex_buffer.view]));
                command_list.IASetIndexBuffer(Some(&draw.index_buffer.view));
                command_list.DrawIndexedInstanced(draw.index_buffer.index_count, 1, 0, 0, 0);
            }
        }
        Ok(())
    }
}
