/*!
    CPU pixel filters on the luma plane.

    All filters operate on 8-bit planar YUV 4:2:0 frames and are silent
    pass-throughs for any other layout. Blur and sharpen leave the
    1-pixel frame border untouched.
*/

use media_types::{PixelFormat, VideoFrame};

/// Neutral chroma value; a plane filled with it carries no color.
const CHROMA_NEUTRAL: u8 = 128;

/**
    Overwrite both chroma planes with the neutral value, leaving only the
    luma signal. Applying it twice is a no-op.
*/
pub fn apply_grayscale(frame: &mut VideoFrame) {
    if frame.format != PixelFormat::Yuv420p {
        return;
    }
    frame.u_plane_mut().fill(CHROMA_NEUTRAL);
    frame.v_plane_mut().fill(CHROMA_NEUTRAL);
}

/**
    Adjust contrast about the mid level, then scale brightness:
    `y' = clamp(((y - 128) * contrast + 128) * brightness, 0, 255)`.
*/
pub fn apply_brightness_contrast(frame: &mut VideoFrame, brightness: f32, contrast: f32) {
    if frame.format != PixelFormat::Yuv420p {
        return;
    }
    for y in frame.y_plane_mut() {
        let mut pixel = (*y as f32 - 128.0) * contrast + 128.0;
        pixel *= brightness;
        *y = pixel.clamp(0.0, 255.0) as u8;
    }
}

/**
    3x3 box blur on the luma plane.
*/
pub fn apply_blur(frame: &mut VideoFrame) {
    if frame.format != PixelFormat::Yuv420p {
        return;
    }
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width < 3 || height < 3 {
        return;
    }

    let luma = frame.y_plane_mut();
    let source = luma.to_vec();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sum = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    sum += source[(y + dy - 1) * width + (x + dx - 1)] as u32;
                }
            }
            luma[y * width + x] = (sum / 9) as u8;
        }
    }
}

/**
    Laplacian sharpen on the luma plane:
    `y' = clamp(5*center - up - down - left - right, 0, 255)`.
*/
pub fn apply_sharpen(frame: &mut VideoFrame) {
    if frame.format != PixelFormat::Yuv420p {
        return;
    }
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width < 3 || height < 3 {
        return;
    }

    let luma = frame.y_plane_mut();
    let source = luma.to_vec();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let sharpened = 5 * source[y * width + x] as i32
                - source[(y - 1) * width + x] as i32
                - source[(y + 1) * width + x] as i32
                - source[y * width + (x - 1)] as i32
                - source[y * width + (x + 1)] as i32;
            luma[y * width + x] = sharpened.clamp(0, 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_luma(width: u32, height: u32, luma: u8) -> VideoFrame {
        let mut frame = VideoFrame::alloc_yuv420p(width, height);
        frame.y_plane_mut().fill(luma);
        frame.u_plane_mut().fill(90);
        frame.v_plane_mut().fill(200);
        frame
    }

    #[test]
    fn grayscale_neutralizes_chroma() {
        let mut frame = frame_with_luma(16, 16, 77);
        apply_grayscale(&mut frame);

        assert!(frame.u_plane().iter().all(|&u| u == 128));
        assert!(frame.v_plane().iter().all(|&v| v == 128));
        assert!(frame.y_plane().iter().all(|&y| y == 77));
    }

    #[test]
    fn grayscale_is_idempotent() {
        let mut frame = frame_with_luma(16, 16, 77);
        apply_grayscale(&mut frame);
        let once = frame.clone();
        apply_grayscale(&mut frame);

        assert_eq!(frame.data, once.data);
    }

    #[test]
    fn brightness_contrast_identity() {
        let mut frame = frame_with_luma(8, 8, 100);
        apply_brightness_contrast(&mut frame, 1.0, 1.0);

        assert!(frame.y_plane().iter().all(|&y| y == 100));
    }

    #[test]
    fn brightness_contrast_formula() {
        let mut frame = frame_with_luma(8, 8, 100);
        apply_brightness_contrast(&mut frame, 1.2, 1.3);

        // ((100 - 128) * 1.3 + 128) * 1.2 = 109.92
        assert!(frame.y_plane().iter().all(|&y| y == 109));
    }

    #[test]
    fn brightness_contrast_clamps() {
        let mut bright = frame_with_luma(8, 8, 250);
        apply_brightness_contrast(&mut bright, 2.0, 2.0);
        assert!(bright.y_plane().iter().all(|&y| y == 255));

        let mut dark = frame_with_luma(8, 8, 5);
        apply_brightness_contrast(&mut dark, 0.5, 2.0);
        assert!(dark.y_plane().iter().all(|&y| y == 0));
    }

    #[test]
    fn brightness_then_inverse_approximates_identity() {
        let mut frame = frame_with_luma(8, 8, 120);
        apply_brightness_contrast(&mut frame, 1.25, 1.0);
        apply_brightness_contrast(&mut frame, 0.8, 1.0);

        // rounding through u8 twice costs at most a couple of levels
        for &y in frame.y_plane() {
            assert!((y as i32 - 120).abs() <= 2, "luma drifted to {y}");
        }
    }

    #[test]
    fn blur_preserves_uniform_regions_and_border() {
        let mut frame = frame_with_luma(16, 16, 50);
        frame.y_plane_mut()[0] = 250;
        apply_blur(&mut frame);

        // the corner is on the border and stays untouched
        assert_eq!(frame.y_plane()[0], 250);
        // interior pixels away from the bright corner stay uniform
        assert_eq!(frame.y_plane()[8 * 16 + 8], 50);
    }

    #[test]
    fn blur_averages_neighborhood() {
        let mut frame = frame_with_luma(5, 5, 0);
        frame.y_plane_mut()[2 * 5 + 2] = 90;
        apply_blur(&mut frame);

        // the 90 spreads as 90/9 = 10 over its 3x3 neighborhood
        assert_eq!(frame.y_plane()[2 * 5 + 2], 10);
        assert_eq!(frame.y_plane()[1 * 5 + 1], 10);
    }

    #[test]
    fn sharpen_preserves_uniform_regions_and_border() {
        let mut frame = frame_with_luma(16, 16, 80);
        apply_sharpen(&mut frame);

        // 5*80 - 4*80 = 80 everywhere in a flat image
        assert!(frame.y_plane().iter().all(|&y| y == 80));
    }

    #[test]
    fn sharpen_amplifies_edges_and_clamps() {
        let mut frame = frame_with_luma(5, 5, 10);
        frame.y_plane_mut()[2 * 5 + 2] = 200;
        apply_sharpen(&mut frame);

        // 5*200 - 4*10 = 960, clamped
        assert_eq!(frame.y_plane()[2 * 5 + 2], 255);
        // 5*10 - (3*10 + 200) = -180, clamped
        assert_eq!(frame.y_plane()[2 * 5 + 1], 0);
    }

    #[test]
    fn filters_pass_through_non_planar_frames() {
        let data = vec![7u8; 4 * 4 * 3];
        let mut frame = VideoFrame::new(data.clone(), 4, 4, PixelFormat::Rgb24, None);

        apply_grayscale(&mut frame);
        apply_brightness_contrast(&mut frame, 1.5, 1.5);
        apply_blur(&mut frame);
        apply_sharpen(&mut frame);

        assert_eq!(frame.data, data);
    }
}
