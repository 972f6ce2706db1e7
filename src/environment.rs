use anyhow::{Context, Result};

/// The showroom backdrop every viewer reflects. Fetched fresh per viewer;
/// the loader chain stalls (and keeps the overlay up) if this never resolves.
pub const ENVIRONMENT_URL: &str =
    "https://res.cloudinary.com/dutzpli8z/raw/upload/v1715801358/cbtu0qentrhp1i87fkyd.hdr";

/// Equirectangular radiance image, linear RGBA, one f32 per channel.
pub struct EnvironmentImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

pub fn fetch(url: &str) -> Result<EnvironmentImage> {
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch environment map from {url}"))?
        .error_for_status()
        .context("Environment map request was rejected")?;
    let bytes = response
        .bytes()
        .context("Failed to read environment map body")?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<EnvironmentImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)
        .context("Failed to decode Radiance HDR data")?;
    let rgba = decoded.to_rgba32f();
    let (width, height) = (rgba.width(), rgba.height());

    Ok(EnvironmentImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal Radiance file: one pixel with value (1, 1, 1).
    fn one_pixel_hdr() -> Vec<u8> {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 1\n".to_vec();
        // RGBE (128, 128, 128, 129) decodes to 0.5 * 2^(129 - 128) = 1.0.
        bytes.extend_from_slice(&[128, 128, 128, 129]);
        bytes
    }

    #[test]
    fn decodes_radiance_data() {
        let image = decode(&one_pixel_hdr()).expect("decode should succeed");
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.pixels.len(), 4);
        for channel in &image.pixels[0..3] {
            assert!((channel - 1.0).abs() < 1e-6);
        }
        assert_eq!(image.pixels[3], 1.0);
    }

    #[test]
    fn rejects_non_hdr_data() {
        assert!(decode(b"definitely not a radiance file").is_err());
    }
}
