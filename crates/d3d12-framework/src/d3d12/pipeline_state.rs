use std::mem::ManuallyDrop;

use eyre::WrapErr;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::ID3DBlob;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::device_resources::DEPTH_FORMAT;
use super::device_resources::RENDER_TARGET_FORMAT;
use super::shader::bytecode;

pub fn rasterizer_desc() -> D3D12_RASTERIZER_DESC {
    D3D12_RASTERIZER_DESC {
        FillMode: D3D12_FILL_MODE_SOLID,
        // The rotating models show both faces.
        CullMode: D3D12_CULL_MODE_NONE,
        DepthClipEnable: true.into(),
        ..Default::default()
    }
}

pub fn blend_desc(alpha_blend: bool) -> D3D12_BLEND_DESC {
    let (src, dest) = if alpha_blend {
        (D3D12_BLEND_SRC_ALPHA, D3D12_BLEND_INV_SRC_ALPHA)
    } else {
        (D3D12_BLEND_ONE, D3D12_BLEND_ZERO)
    };
    D3D12_BLEND_DESC {
        AlphaToCoverageEnable: false.into(),
        IndependentBlendEnable: false.into(),
        RenderTarget: [D3D12_RENDER_TARGET_BLEND_DESC {
            BlendEnable: alpha_blend.into(),
            LogicOpEnable: false.into(),
            SrcBlend: src,
            DestBlend: dest,
            BlendOp: D3D12_BLEND_OP_ADD,
            SrcBlendAlpha: D3D12_BLEND_ONE,
            DestBlendAlpha: D3D12_BLEND_ZERO,
            BlendOpAlpha: D3D12_BLEND_OP_ADD,
            LogicOp: D3D12_LOGIC_OP_NOOP,
            RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
        }; 8],
    }
}

pub fn depth_stencil_desc() -> D3D12_DEPTH_STENCIL_DESC {
    D3D12_DEPTH_STENCIL_DESC {
        DepthEnable: true.into(),
        DepthWriteMask: D3D12_DEPTH_WRITE_MASK_ALL,
        DepthFunc: D3D12_COMPARISON_FUNC_LESS,
        StencilEnable: false.into(),
        ..Default::default()
    }
}

fn rtv_formats() -> [DXGI_FORMAT; 8] {
    let mut formats = [DXGI_FORMAT_UNKNOWN; 8];
    formats[0] = RENDER_TARGET_FORMAT;
    formats
}

const NO_MSAA: DXGI_SAMPLE_DESC = DXGI_SAMPLE_DESC {
    Count: 1,
    Quality: 0,
};

pub struct GraphicsPipeline<'a> {
    pub root_signature: &'a ID3D12RootSignature,
    pub vertex_shader: &'a ID3DBlob,
    pub pixel_shader: &'a ID3DBlob,
    pub input_layout: &'a [D3D12_INPUT_ELEMENT_DESC],
    pub alpha_blend: bool,
}

impl GraphicsPipeline<'_> {
    /// Depth-tested triangle-list pipeline drawing into the swap chain.
    pub fn create(&self, device: &ID3D12Device) -> eyre::Result<ID3D12PipelineState> {
        let pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            pRootSignature: unsafe { std::mem::transmute_copy(self.root_signature) },
            VS: bytecode(self.vertex_shader),
            PS: bytecode(self.pixel_shader),
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: self.input_layout.as_ptr(),
                NumElements: self.input_layout.len() as u32,
            },
            RasterizerState: rasterizer_desc(),
            BlendState: blend_desc(self.alpha_blend),
            DepthStencilState: depth_stencil_desc(),
            SampleMask: u32::MAX,
            PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            NumRenderTargets: 1,
            RTVFormats: rtv_formats(),
            DSVFormat: DEPTH_FORMAT,
            SampleDesc: NO_MSAA,
            ..Default::default()
        };

        unsafe { device.CreateGraphicsPipelineState(&pso_desc) }
            .wrap_err("create graphics pipeline state")
    }
}

/// One entry of a pipeline state stream: the subobject type tag followed by
/// its payload, aligned to pointer size.
#[repr(C, align(8))]
#[allow(dead_code)]
struct Subobject<T> {
    kind: D3D12_PIPELINE_STATE_SUBOBJECT_TYPE,
    inner: T,
}

impl<T> Subobject<T> {
    fn new(kind: D3D12_PIPELINE_STATE_SUBOBJECT_TYPE, inner: T) -> Self {
        Self { kind, inner }
    }
}

#[repr(C)]
#[allow(dead_code)]
struct MeshShaderPipelineStream {
    root_signature: Subobject<ManuallyDrop<Option<ID3D12RootSignature>>>,
    mesh_shader: Subobject<D3D12_SHADER_BYTECODE>,
    pixel_shader: Subobject<D3D12_SHADER_BYTECODE>,
    blend: Subobject<D3D12_BLEND_DESC>,
    sample_mask: Subobject<u32>,
    rasterizer: Subobject<D3D12_RASTERIZER_DESC>,
    depth_stencil: Subobject<D3D12_DEPTH_STENCIL_DESC>,
    rtv_formats: Subobject<D3D12_RT_FORMAT_ARRAY>,
    dsv_format: Subobject<DXGI_FORMAT>,
    sample_desc: Subobject<DXGI_SAMPLE_DESC>,
}

/// Mesh-shader pipelines can only be described as a pipeline state stream.
pub fn create_mesh_shader_pipeline(
    device: &ID3D12Device,
    root_signature: &ID3D12RootSignature,
    mesh_shader: &ID3DBlob,
    pixel_shader: &ID3DBlob,
) -> eyre::Result<ID3D12PipelineState> {
    let device2: ID3D12Device2 = device.cast().wrap_err("query ID3D12Device2")?;

    let mut stream = MeshShaderPipelineStream {
        root_signature: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_ROOT_SIGNATURE,
            unsafe { std::mem::transmute_copy(root_signature) },
        ),
        mesh_shader: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_MS,
            bytecode(mesh_shader),
        ),
        pixel_shader: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_PS,
            bytecode(pixel_shader),
        ),
        blend: Subobject::new(D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_BLEND, blend_desc(false)),
        sample_mask: Subobject::new(D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_SAMPLE_MASK, u32::MAX),
        rasterizer: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_RASTERIZER,
            rasterizer_desc(),
        ),
        depth_stencil: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_DEPTH_STENCIL,
            depth_stencil_desc(),
        ),
        rtv_formats: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_RENDER_TARGET_FORMATS,
            D3D12_RT_FORMAT_ARRAY {
                RTFormats: rtv_formats(),
                NumRenderTargets: 1,
            },
        ),
        dsv_format: Subobject::new(
            D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_DEPTH_STENCIL_FORMAT,
            DEPTH_FORMAT,
        ),
        sample_desc: Subobject::new(D3D12_PIPELINE_STATE_SUBOBJECT_TYPE_SAMPLE_DESC, NO_MSAA),
    };

    let stream_desc = D3D12_PIPELINE_STATE_STREAM_DESC {
        SizeInBytes: std::mem::size_of::<MeshShaderPipelineStream>(),
        pPipelineStateSubobjectStream: &mut stream as *mut _ as *mut _,
    };

    unsafe { device2.CreatePipelineState(&stream_desc) }
        .wrap_err("create mesh shader pipeline state")
}
