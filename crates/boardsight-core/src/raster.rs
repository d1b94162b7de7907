use image::{DynamicImage, GrayImage, ImageBuffer, Pixel};

/// Channel value at integer coordinates, zero outside the image.
#[inline]
fn channel_at<P>(src: &ImageBuffer<P, Vec<u8>>, x: i64, y: i64, c: usize) -> f32
where
    P: Pixel<Subpixel = u8>,
{
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return 0.0;
    }
    src.get_pixel(x as u32, y as u32).channels()[c] as f32
}

/// Bilinear sample of channel `c` at a sub-pixel position.
///
/// Samples outside the image read as zero, so warps get a black border.
#[inline]
pub fn sample_bilinear<P>(src: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32, c: usize) -> f32
where
    P: Pixel<Subpixel = u8>,
{
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = channel_at(src, x0, y0, c);
    let p10 = channel_at(src, x0 + 1, y0, c);
    let p01 = channel_at(src, x0, y0 + 1, c);
    let p11 = channel_at(src, x0 + 1, y0 + 1, c);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Bilinear sample of a full pixel, rounded back to `u8` channels.
#[inline]
pub fn sample_pixel<P>(src: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32) -> P
where
    P: Pixel<Subpixel = u8>,
{
    let zeros = [0u8; 4];
    let mut out = *P::from_slice(&zeros[..P::CHANNEL_COUNT as usize]);
    for (c, v) in out.channels_mut().iter_mut().enumerate() {
        *v = sample_bilinear(src, x, y, c).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Grayscale view of any decoded frame.
pub fn to_gray(frame: &DynamicImage) -> GrayImage {
    match frame {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([200]));
        assert!((sample_bilinear(&img, 0.5, 0.0, 0) - 100.0).abs() < 1e-4);
        assert_eq!(sample_pixel(&img, 0.25, 0.0), Luma([50]));
    }

    #[test]
    fn outside_reads_as_black() {
        let img = RgbImage::from_pixel(4, 4, Rgb([90, 120, 250]));
        assert_eq!(sample_pixel(&img, -5.0, 1.0), Rgb([0, 0, 0]));
        assert_eq!(sample_pixel(&img, 1.0, 1.0), Rgb([90, 120, 250]));
    }
}
