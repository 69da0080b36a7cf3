use eyre::eyre;
use tracing::info;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D12::ID3D12Device;
use windows::Win32::Graphics::Dxgi::*;

use crate::config::SampleCommandLine;
use crate::d3d12::create_device::create_device;
use crate::d3d12::create_device::CreatedDevice;
use crate::d3d12::device_resources::DeviceResources;
use crate::d3d12::populate_command_list::populate_command_list;
use crate::demos::create_demo;
use crate::demos::Demo;
use crate::dx_sample::DXSample;
use crate::transform::Rotation;

struct Bound {
    // Declared first so the demo's resources go before the queue.
    demo: Box<dyn Demo>,
    resources: DeviceResources,
}

pub struct Sample {
    command_line: SampleCommandLine,
    dxgi_factory: IDXGIFactory4,
    device: ID3D12Device,
    info_queue: Option<IDXGIInfoQueue>,
    bound: Option<Bound>,
    rotation: Rotation,
    frames_rendered: u64,
}

impl DXSample for Sample {
    fn new(command_line: &SampleCommandLine) -> eyre::Result<Self> {
        let CreatedDevice {
            dxgi_factory,
            device,
            info_queue,
        } = create_device(command_line)?;

        Ok(Self {
            command_line: command_line.clone(),
            dxgi_factory,
            device,
            info_queue,
            bound: None,
            rotation: Rotation::default(),
            frames_rendered: 0,
        })
    }

    fn bind_to_window(&mut self, hwnd: HWND) -> eyre::Result<()> {
        let mut resources =
            DeviceResources::new(&self.device, &self.dxgi_factory, hwnd, &self.command_line)?;
        let demo = create_demo(&self.device, &mut resources, &self.command_line)?;
        info!(demo = %self.command_line.demo, "sample bound to window");
        self.bound = Some(Bound { demo, resources });
        Ok(())
    }

    fn on_destroy(&mut self) -> eyre::Result<()> {
        if let Some(bound) = &mut self.bound {
            bound.resources.wait_for_gpu()?;
        }
        info!(frames = self.frames_rendered, "sample destroyed");
        Ok(())
    }

    fn render(&mut self) -> eyre::Result<()> {
        let Some(Bound { demo, resources }) = &mut self.bound else {
            return Err(eyre!("render called before bind_to_window"));
        };

        // The pacer has already retired this slot, so its constants are free.
        let world = self.rotation.advance();
        demo.update(resources.frame_index(), world);

        let demo = &**demo;
        populate_command_list(resources, demo.pipeline_state(), |command_list, frame_index| {
            demo.record(command_list, frame_index)
        })?;
        resources.execute_command_list()?;
        resources.present()?;

        self.frames_rendered += 1;
        Ok(())
    }

    fn title(&self) -> String {
        let mut title = self.command_line.demo.title().to_string();
        if self.command_line.use_warp_device {
            title.push_str(" (WARP)");
        }
        title
    }

    fn window_size(&self) -> (u32, u32) {
        (self.command_line.width, self.command_line.height)
    }

    fn info_queue(&self) -> Option<&IDXGIInfoQueue> {
        self.info_queue.as_ref()
    }
}
