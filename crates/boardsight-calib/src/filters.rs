//! Thin wrappers over `imageproc` with the kernel conventions used by the
//! board and grid detectors.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::{edges, filter, morphology};

/// Gaussian sigma equivalent to an odd `ksize` box when no sigma is given.
pub(crate) fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// 5x5 Gaussian smoothing.
pub(crate) fn blur5(gray: &GrayImage) -> GrayImage {
    filter::gaussian_blur_f32(gray, sigma_for_kernel(5))
}

/// Blur + Canny edge map (edges are 255).
pub(crate) fn edge_map(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    edges::canny(&blur5(gray), low, high)
}

/// Dilate with a 3x3 square element, `iterations` times.
pub(crate) fn dilate3(img: &GrayImage, iterations: u8) -> GrayImage {
    morphology::dilate(img, Norm::LInf, iterations)
}

/// Closing with a 3x3 square element repeated `iterations` times.
pub(crate) fn close3(img: &GrayImage, iterations: u8) -> GrayImage {
    morphology::close(img, Norm::LInf, iterations)
}

/// Opening with a 3x3 square element repeated `iterations` times.
pub(crate) fn open3(img: &GrayImage, iterations: u8) -> GrayImage {
    morphology::open(img, Norm::LInf, iterations)
}

/// Inverted Gaussian adaptive threshold.
///
/// A pixel becomes foreground (255) when it is at least `c` darker than
/// the Gaussian-weighted mean of its `block_size` neighbourhood; everything
/// else is 0. Uniform regions are background regardless of their level.
pub(crate) fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let local_mean = filter::gaussian_blur_f32(gray, sigma_for_kernel(block_size));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0] as f32;
        let m = local_mean.get_pixel(x, y)[0] as f32;
        if v > m - c {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}
