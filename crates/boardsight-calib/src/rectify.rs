//! Perspective rectification of the board into a canonical top-down view.

use crate::params::OutputSize;
use boardsight_core::{order_corners, quad_extent, warp_perspective, Homography, Quad};
use image::{ImageBuffer, Pixel};
use log::debug;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Rectified board image plus the transform that produced it.
#[derive(Clone, Debug)]
pub struct RectifiedBoard<P: Pixel<Subpixel = u8>> {
    pub image: ImageBuffer<P, Vec<u8>>,
    /// Source frame -> canonical image.
    pub homography: Homography,
    /// Board corners in the source frame, ordered `[TL, TR, BR, BL]`.
    pub corners: Quad,
}

impl<P: Pixel<Subpixel = u8>> RectifiedBoard<P> {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Canonical destination corners of a `width x height` image.
pub fn canonical_corners(width: u32, height: u32) -> Quad {
    let (w, h) = (width as f32 - 1.0, height as f32 - 1.0);
    [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ]
}

/// Pixel size of the rectified image for an ordered corner set.
pub fn resolve_output_size(ordered: &Quad, size: OutputSize) -> (u32, u32) {
    match size {
        OutputSize::Fixed { width, height } => (width, height),
        OutputSize::Auto => {
            let (w, h) = quad_extent(ordered);
            (w as u32, h as u32)
        }
    }
}

/// Order `corners`, solve the homography onto the canonical rectangle and
/// warp the whole frame.
///
/// Returns `None` when the corners are degenerate or the output would be
/// empty.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(frame, corners), fields(width = frame.width(), height = frame.height()))
)]
pub fn rectify_board<P>(
    frame: &ImageBuffer<P, Vec<u8>>,
    corners: &Quad,
    size: OutputSize,
) -> Option<RectifiedBoard<P>>
where
    P: Pixel<Subpixel = u8>,
{
    let ordered = order_corners(corners);
    let (width, height) = resolve_output_size(&ordered, size);
    if width < 2 || height < 2 {
        debug!("rectified size {width}x{height} too small");
        return None;
    }

    let homography = Homography::from_quads(&ordered, &canonical_corners(width, height))?;
    let image = warp_with(frame, &homography, width, height)?;
    Some(RectifiedBoard {
        image,
        homography,
        corners: ordered,
    })
}

/// Re-apply a stored source-to-canonical homography to a new frame.
pub fn warp_with<P>(
    frame: &ImageBuffer<P, Vec<u8>>,
    homography: &Homography,
    width: u32,
    height: u32,
) -> Option<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let back = homography.inverse()?;
    Some(warp_perspective(frame, &back, width, height))
}
