//! CPU side of texture loading: decoding and row-pitch aware copies.

use std::path::Path;

use eyre::bail;
use eyre::WrapErr;
use tracing::debug;

/// Decoded RGBA8 pixels, tightly packed rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn row_bytes(&self) -> usize {
        self.width as usize * Self::BYTES_PER_PIXEL
    }
}

pub fn load_texture_image(path: &Path) -> eyre::Result<TextureImage> {
    let image = image::open(path)
        .wrap_err_with(|| format!("decode texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    debug!(path = %path.display(), width, height, "texture decoded");
    Ok(TextureImage {
        width,
        height,
        pixels: image.into_raw(),
    })
}

/// Copies tightly packed rows into `dst`, whose rows start every
/// `row_pitch` bytes as the GPU upload layout requires.
pub fn copy_rows(src: &[u8], row_bytes: usize, dst: &mut [u8], row_pitch: usize) -> eyre::Result<()> {
    if row_bytes == 0 {
        return Ok(());
    }
    if row_pitch < row_bytes {
        bail!("row pitch {row_pitch} smaller than row size {row_bytes}");
    }
    let rows = src.len() / row_bytes;
    let needed = rows.saturating_sub(1) * row_pitch + row_bytes;
    if rows > 0 && dst.len() < needed {
        bail!("staging buffer holds {} bytes, {needed} needed", dst.len());
    }
    for (row, chunk) in src.chunks_exact(row_bytes).enumerate() {
        let start = row * row_pitch;
        dst[start..start + row_bytes].copy_from_slice(chunk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_util::search_file_path;

    #[test]
    fn rows_land_on_pitch_boundaries() {
        let src = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 12];
        copy_rows(&src, 4, &mut dst, 8).unwrap();
        assert_eq!(dst, [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8]);
    }

    #[test]
    fn short_destination_is_an_error() {
        let src = [0u8; 8];
        let mut dst = [0u8; 10];
        assert!(copy_rows(&src, 4, &mut dst, 8).is_err());
    }

    #[test]
    fn pitch_smaller_than_row_is_an_error() {
        let src = [0u8; 8];
        let mut dst = [0u8; 8];
        assert!(copy_rows(&src, 4, &mut dst, 2).is_err());
    }

    #[test]
    fn bundled_texture_decodes_to_rgba8() {
        let path = search_file_path("SampleTexture.png").expect("bundled texture");
        let image = load_texture_image(&path).unwrap();
        assert_eq!((image.width, image.height), (64, 64));
        assert_eq!(image.pixels.len(), image.row_bytes() * image.height as usize);
    }

    #[test]
    fn missing_texture_reports_path() {
        let err = load_texture_image(Path::new("no/such/texture.png")).unwrap_err();
        assert!(format!("{err:?}").contains("texture.png"));
    }
}
