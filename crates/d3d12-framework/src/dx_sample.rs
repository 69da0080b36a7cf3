use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Dxgi::IDXGIInfoQueue;

use crate::config::SampleCommandLine;

/// A sample driven by [`crate::sample_runner::run_sample`]: created before
/// the window, bound to it once it exists, then rendered whenever the
/// message queue is empty.
pub trait DXSample {
    fn new(command_line: &SampleCommandLine) -> eyre::Result<Self>
    where
        Self: Sized;

    fn bind_to_window(&mut self, hwnd: HWND) -> eyre::Result<()>;

    /// Drains the GPU before resources are released.
    fn on_destroy(&mut self) -> eyre::Result<()>;

    fn render(&mut self) -> eyre::Result<()>;

    fn on_key_down(&mut self, _key: u8) {}

    fn on_key_up(&mut self, _key: u8) {}

    fn title(&self) -> String;

    fn window_size(&self) -> (u32, u32);

    /// Debug-layer messages are dumped from here when something fails.
    fn info_queue(&self) -> Option<&IDXGIInfoQueue> {
        None
    }
}
