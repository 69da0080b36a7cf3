#![cfg_attr(not(windows), allow(dead_code))]
pub mod config;
pub mod file_util;
pub mod frame_pacer;
pub mod geometry;
pub mod mesh;
pub mod texture_image;
pub mod transform;

#[cfg(windows)]
pub mod d3d12;
#[cfg(windows)]
pub mod demos;
#[cfg(windows)]
pub mod dx_sample;
#[cfg(windows)]
pub mod sample;
#[cfg(windows)]
pub mod sample_runner;

use config::build_command_line;
use tracing::info;

pub fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_target(false)
        .init();

    let command_line = build_command_line(std::env::args().skip(1))?;
    info!(
        demo = %command_line.demo,
        warp = command_line.use_warp_device,
        width = command_line.width,
        height = command_line.height,
        "starting"
    );

    run(&command_line)
}

#[cfg(windows)]
fn run(command_line: &config::SampleCommandLine) -> eyre::Result<()> {
    sample_runner::run_sample::<sample::Sample>(command_line)
}

#[cfg(not(windows))]
fn run(_command_line: &config::SampleCommandLine) -> eyre::Result<()> {
    eyre::bail!("Direct3D 12 is only available on Windows")
}
