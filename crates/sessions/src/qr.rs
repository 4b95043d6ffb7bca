//! QR challenge rendering.
//!
//! Encodes the backend's one-time login URL as a scannable PNG. Module size
//! and quiet zone are cosmetic; any conformant reader works.

use {
    image::{GrayImage, Luma},
    qrcode::{Color, QrCode},
};

use tgrelay_common::{Error, Result};

/// Pixels per QR module.
const MODULE_PX: u32 = 10;
/// Quiet-zone border, in modules.
const QUIET_ZONE: u32 = 5;

/// Render `url` as a PNG image.
pub fn encode_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| Error::unexpected(anyhow::anyhow!("QR encode failed: {e}")))?;

    let width = code.width() as u32;
    let colors = code.to_colors();
    let size = (width + QUIET_ZONE * 2) * MODULE_PX;
    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));

    for y in 0..width {
        for x in 0..width {
            if colors[(y * width + x) as usize] == Color::Dark {
                let px = (x + QUIET_ZONE) * MODULE_PX;
                let py = (y + QUIET_ZONE) * MODULE_PX;
                for dy in 0..MODULE_PX {
                    for dx in 0..MODULE_PX {
                        img.put_pixel(px + dx, py + dy, Luma([0u8]));
                    }
                }
            }
        }
    }

    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        size,
        size,
        image::ExtendedColorType::L8,
    )
    .map_err(|e| Error::unexpected(anyhow::anyhow!("PNG encode failed: {e}")))?;

    Ok(buf)
}
