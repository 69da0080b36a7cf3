use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use eyre::bail;
use eyre::eyre;

/// Number of swap-chain buffers, and therefore of frame slots.
pub const FRAME_COUNT: usize = 2;

pub const DEFAULT_WIDTH: u32 = 960;
pub const DEFAULT_HEIGHT: u32 = 540;

/// Which demo the sample binds to the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DemoKind {
    #[default]
    TexturedQuad,
    MultiDraw,
    MeshShader,
}

impl DemoKind {
    pub fn title(self) -> &'static str {
        match self {
            DemoKind::TexturedQuad => "D3D12 Textured Quad",
            DemoKind::MultiDraw => "D3D12 Multiple Draws",
            DemoKind::MeshShader => "D3D12 Mesh Shader",
        }
    }
}

impl FromStr for DemoKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quad" | "textured-quad" => Ok(DemoKind::TexturedQuad),
            "multi" | "multi-draw" | "mesh-file" => Ok(DemoKind::MultiDraw),
            "mesh" | "mesh-shader" => Ok(DemoKind::MeshShader),
            other => Err(eyre!("unknown demo {other:?}, expected quad, multi or mesh")),
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Settings the sample is started with.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleCommandLine {
    pub use_warp_device: bool,
    pub demo: DemoKind,
    pub model_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub sync_interval: u32,
}

impl Default for SampleCommandLine {
    fn default() -> Self {
        Self {
            use_warp_device: false,
            demo: DemoKind::default(),
            model_path: PathBuf::from("res/cube.obj"),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            sync_interval: 1,
        }
    }
}

impl SampleCommandLine {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

fn is_switch(arg: &str, name: &str) -> bool {
    arg.strip_prefix('-')
        .or_else(|| arg.strip_prefix('/'))
        .is_some_and(|rest| rest.eq_ignore_ascii_case(name))
}

/// Builds a `SampleCommandLine` from the process arguments.
///
/// Switches are case-insensitive and accept either a `-` or `/` prefix.
/// Unrecognised arguments are ignored.
pub fn build_command_line<I>(args: I) -> eyre::Result<SampleCommandLine>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut command_line = SampleCommandLine::default();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        if is_switch(&arg, "warp") {
            command_line.use_warp_device = true;
        } else if is_switch(&arg, "demo") {
            let Some(value) = args.next() else {
                bail!("-demo expects a value");
            };
            command_line.demo = value.parse()?;
        } else if is_switch(&arg, "model") {
            let Some(value) = args.next() else {
                bail!("-model expects a path");
            };
            command_line.model_path = PathBuf::from(value);
        } else if is_switch(&arg, "novsync") {
            command_line.sync_interval = 0;
        }
    }

    Ok(command_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_960x540_quad() {
        let command_line = build_command_line(["sample.exe"]).unwrap();
        assert_eq!(command_line, SampleCommandLine::default());
        assert_eq!((command_line.width, command_line.height), (960, 540));
        assert_eq!(command_line.sync_interval, 1);
        assert!(!command_line.use_warp_device);
    }

    #[test]
    fn warp_switch_accepts_both_prefixes() {
        assert!(build_command_line(["-warp"]).unwrap().use_warp_device);
        assert!(build_command_line(["/WARP"]).unwrap().use_warp_device);
        assert!(!build_command_line(["warp"]).unwrap().use_warp_device);
    }

    #[test]
    fn demo_and_model_take_values() {
        let command_line =
            build_command_line(["app", "-demo", "Multi", "/model", "res/teapot.obj"]).unwrap();
        assert_eq!(command_line.demo, DemoKind::MultiDraw);
        assert_eq!(command_line.model_path, PathBuf::from("res/teapot.obj"));

        let command_line = build_command_line(["-demo", "mesh-shader", "-novsync"]).unwrap();
        assert_eq!(command_line.demo, DemoKind::MeshShader);
        assert_eq!(command_line.sync_interval, 0);
    }

    #[test]
    fn missing_or_bad_values_fail() {
        assert!(build_command_line(["-demo"]).is_err());
        assert!(build_command_line(["-model"]).is_err());
        assert!(build_command_line(["-demo", "triangle"]).is_err());
    }

    #[test]
    fn aspect_ratio_uses_client_size() {
        let command_line = SampleCommandLine::default();
        assert!((command_line.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }
}
