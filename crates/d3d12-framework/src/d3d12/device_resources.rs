use eyre::eyre;
use eyre::WrapErr;
use tracing::info;
use windows::core::Interface;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use super::descriptor_heap::DescriptorHeap;
use super::fence_timeline::FenceTimeline;
use crate::config::SampleCommandLine;
use crate::config::FRAME_COUNT;
use crate::frame_pacer::FramePacer;

pub const SWAP_CHAIN_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;
/// Back buffers are viewed as sRGB so shader output is gamma-encoded on write.
pub const RENDER_TARGET_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM_SRGB;
pub const DEPTH_FORMAT: DXGI_FORMAT = DXGI_FORMAT_D32_FLOAT;
pub const CLEAR_COLOR: [f32; 4] = [0.25, 0.25, 0.25, 1.0];
pub const CLEAR_DEPTH: f32 = 1.0;

/// Everything bound to the window: queue, swap chain, per-slot targets and
/// allocators, the depth buffer, the command list and the frame pacer.
pub struct DeviceResources {
    pub command_queue: ID3D12CommandQueue,
    pub swap_chain: IDXGISwapChain3,
    pub render_targets: [ID3D12Resource; FRAME_COUNT],
    pub rtv_heap: DescriptorHeap,
    pub depth_buffer: ID3D12Resource,
    pub dsv_heap: DescriptorHeap,
    pub command_allocators: [ID3D12CommandAllocator; FRAME_COUNT],
    pub command_list: ID3D12GraphicsCommandList,
    pub viewport: D3D12_VIEWPORT,
    pub scissor_rect: RECT,
    pub sync_interval: u32,
    timeline: FenceTimeline,
    pacer: FramePacer<FRAME_COUNT>,
}

impl DeviceResources {
    pub fn new(
        device: &ID3D12Device,
        dxgi_factory: &IDXGIFactory4,
        hwnd: HWND,
        command_line: &SampleCommandLine,
    ) -> eyre::Result<Self> {
        let command_queue: ID3D12CommandQueue = unsafe {
            device.CreateCommandQueue(&D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                ..Default::default()
            })
        }
        .wrap_err("create command queue")?;

        let (width, height) = (command_line.width, command_line.height);
        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            BufferCount: FRAME_COUNT as u32,
            Width: width,
            Height: height,
            Format: SWAP_CHAIN_FORMAT,
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            ..Default::default()
        };

        let swap_chain: IDXGISwapChain3 = unsafe {
            dxgi_factory.CreateSwapChainForHwnd(&command_queue, hwnd, &swap_chain_desc, None, None)
        }
        .wrap_err("create swap chain")?
        .cast()
        .wrap_err("query IDXGISwapChain3")?;

        // Fullscreen transitions are not handled.
        unsafe { dxgi_factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER) }
            .wrap_err("disable alt+enter")?;

        let frame_index = unsafe { swap_chain.GetCurrentBackBufferIndex() };

        let rtv_heap = DescriptorHeap::new(
            device,
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            FRAME_COUNT as u32,
            false,
        )?;
        let render_targets: [ID3D12Resource; FRAME_COUNT] =
            array_init::try_array_init(|i: usize| -> eyre::Result<ID3D12Resource> {
                let render_target: ID3D12Resource = unsafe { swap_chain.GetBuffer(i as u32) }
                    .wrap_err_with(|| format!("get back buffer {i}"))?;
                let rtv_desc = D3D12_RENDER_TARGET_VIEW_DESC {
                    Format: RENDER_TARGET_FORMAT,
                    ViewDimension: D3D12_RTV_DIMENSION_TEXTURE2D,
                    Anonymous: D3D12_RENDER_TARGET_VIEW_DESC_0 {
                        Texture2D: D3D12_TEX2D_RTV {
                            MipSlice: 0,
                            PlaneSlice: 0,
                        },
                    },
                };
                unsafe {
                    device.CreateRenderTargetView(
                        &render_target,
                        Some(&rtv_desc),
                        rtv_heap.cpu(i as u32),
                    )
                };
                Ok(render_target)
            })?;

        let dsv_heap = DescriptorHeap::new(device, D3D12_DESCRIPTOR_HEAP_TYPE_DSV, 1, false)?;
        let depth_buffer = create_depth_buffer(device, width, height)?;
        let dsv_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
            Format: DEPTH_FORMAT,
            ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
            Flags: D3D12_DSV_FLAG_NONE,
            Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                Texture2D: D3D12_TEX2D_DSV { MipSlice: 0 },
            },
        };
        unsafe { device.CreateDepthStencilView(&depth_buffer, Some(&dsv_desc), dsv_heap.cpu(0)) };

        let command_allocators: [ID3D12CommandAllocator; FRAME_COUNT] =
            array_init::try_array_init(|i: usize| -> eyre::Result<ID3D12CommandAllocator> {
                unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }
                    .wrap_err_with(|| format!("create command allocator {i}"))
            })?;

        let command_list: ID3D12GraphicsCommandList = unsafe {
            device.CreateCommandList(
                0,
                D3D12_COMMAND_LIST_TYPE_DIRECT,
                &command_allocators[frame_index as usize],
                None::<&ID3D12PipelineState>,
            )
        }
        .wrap_err("create command list")?;
        // Command lists are created open; the first frame resets it.
        unsafe { command_list.Close() }.wrap_err("close command list")?;

        let timeline = FenceTimeline::new(
            device,
            &command_queue,
            FramePacer::<FRAME_COUNT>::INITIAL_FENCE_VALUE,
        )?;
        let pacer = FramePacer::new(frame_index)?;

        let viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: D3D12_MIN_DEPTH,
            MaxDepth: D3D12_MAX_DEPTH,
        };
        let scissor_rect = RECT {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        };

        info!(width, height, frame_index, "device resources bound to window");

        Ok(Self {
            command_queue,
            swap_chain,
            render_targets,
            rtv_heap,
            depth_buffer,
            dsv_heap,
            command_allocators,
            command_list,
            viewport,
            scissor_rect,
            sync_interval: command_line.sync_interval,
            timeline,
            pacer,
        })
    }

    pub fn frame_index(&self) -> usize {
        self.pacer.frame_index()
    }

    pub fn current_render_target(&self) -> &ID3D12Resource {
        &self.render_targets[self.frame_index()]
    }

    pub fn current_command_allocator(&self) -> &ID3D12CommandAllocator {
        &self.command_allocators[self.frame_index()]
    }

    pub fn rtv_handle(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        self.rtv_heap.cpu(self.frame_index() as u32)
    }

    pub fn dsv_handle(&self) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        self.dsv_heap.cpu(0)
    }

    /// Marks the current slot as recording; its allocator may be reset.
    pub fn begin_frame(&mut self) -> usize {
        self.pacer.begin_recording()
    }

    /// Submits the (closed) command list.
    pub fn execute_command_list(&mut self) -> eyre::Result<()> {
        let command_lists = [Some(
            self.command_list
                .cast::<ID3D12CommandList>()
                .wrap_err("query ID3D12CommandList")?,
        )];
        unsafe { self.command_queue.ExecuteCommandLists(&command_lists) };
        self.pacer.mark_submitted();
        Ok(())
    }

    pub fn present(&mut self) -> eyre::Result<()> {
        self.pacer
            .present(&mut self.swap_chain, &mut self.timeline, self.sync_interval)
    }

    pub fn wait_for_gpu(&mut self) -> eyre::Result<()> {
        self.pacer.wait_for_gpu(&mut self.timeline)
    }
}

fn create_depth_buffer(device: &ID3D12Device, width: u32, height: u32) -> eyre::Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_DEFAULT,
        ..Default::default()
    };
    let desc = D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        Alignment: 0,
        Width: width as u64,
        Height: height,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DEPTH_FORMAT,
        SampleDesc: DXGI_SAMPLE_DESC {
            Count: 1,
            Quality: 0,
        },
        Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
    };
    let clear_value = D3D12_CLEAR_VALUE {
        Format: DEPTH_FORMAT,
        Anonymous: D3D12_CLEAR_VALUE_0 {
            DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                Depth: CLEAR_DEPTH,
                Stencil: 0,
            },
        },
    };

    let mut depth_buffer: Option<ID3D12Resource> = None;
    unsafe {
        device.CreateCommittedResource(
            &heap_props,
            D3D12_HEAP_FLAG_NONE,
            &desc,
            D3D12_RESOURCE_STATE_DEPTH_WRITE,
            Some(&clear_value),
            &mut depth_buffer,
        )
    }
    .wrap_err("create depth buffer")?;
    let depth_buffer = depth_buffer.ok_or_else(|| eyre!("CreateCommittedResource returned no depth buffer"))?;
    unsafe { depth_buffer.SetName(windows::core::w!("DepthBuffer")) }.ok();
    Ok(depth_buffer)
}
