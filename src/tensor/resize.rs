use super::{Element, ImageTensor};
use crate::error::{Error, Result};

/// Bilinear resize to `new_width` x `new_height`.
///
/// With `proportional` both axes share one scale factor (the larger one when
/// shrinking, the smaller one when enlarging) so the content keeps its aspect
/// ratio; samples past the source edge repeat the edge pixels. The output
/// always has the requested shape and the input's channel count.
pub fn resize<T: Element>(
    tensor: &ImageTensor<T>,
    new_width: usize,
    new_height: usize,
    proportional: bool,
) -> Result<ImageTensor<T>> {
    let _span = tracing::debug_span!("resize").entered();

    let (src_height, src_width, channels) = tensor.shape();
    if new_width == 0 || new_height == 0 {
        return Err(Error::InvalidDimensions(format!(
            "resize target {new_width}x{new_height} must be non-zero"
        )));
    }
    if src_width == 0 || src_height == 0 {
        return Err(Error::InvalidDimensions(format!(
            "cannot resize an empty {src_width}x{src_height} tensor"
        )));
    }

    let (scale_x, scale_y) = scales(src_width, src_height, new_width, new_height, proportional);
    let max_x = (src_width - 1) as f32;
    let max_y = (src_height - 1) as f32;

    let mut out = ImageTensor::zeros(new_height, new_width, channels);
    for y in 0..new_height {
        let src_y = (y as f32 * scale_y).min(max_y);
        let y1 = src_y.floor() as usize;
        let y2 = (src_y.ceil() as usize).min(src_height - 1);
        let dy = src_y - y1 as f32;

        for x in 0..new_width {
            let src_x = (x as f32 * scale_x).min(max_x);
            let x1 = src_x.floor() as usize;
            let x2 = (src_x.ceil() as usize).min(src_width - 1);
            let dx = src_x - x1 as f32;

            for c in 0..channels {
                let p1 = tensor.get(y1, x1, c).to_f32();
                let p2 = tensor.get(y1, x2, c).to_f32();
                let p3 = tensor.get(y2, x1, c).to_f32();
                let p4 = tensor.get(y2, x2, c).to_f32();

                let value = (1.0 - dx) * (1.0 - dy) * p1
                    + dx * (1.0 - dy) * p2
                    + (1.0 - dx) * dy * p3
                    + dx * dy * p4;

                out.set(y, x, c, T::from_f32(value));
            }
        }
    }

    Ok(out)
}

fn scales(
    src_width: usize,
    src_height: usize,
    new_width: usize,
    new_height: usize,
    proportional: bool,
) -> (f32, f32) {
    let scale_x = src_width as f32 / new_width as f32;
    let scale_y = src_height as f32 / new_height as f32;
    if !proportional {
        return (scale_x, scale_y);
    }
    let enlarging = scale_x <= 1.0 && scale_y <= 1.0;
    let scale = if enlarging {
        scale_x.min(scale_y)
    } else {
        scale_x.max(scale_y)
    };
    (scale, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> ImageTensor<u8> {
        ImageTensor::from_vec(
            2,
            2,
            4,
            vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
        )
        .unwrap()
    }

    fn pixel(t: &ImageTensor<u8>, y: usize, x: usize) -> Vec<u8> {
        (0..t.channels()).map(|c| t.get(y, x, c)).collect()
    }

    #[test]
    fn upscale_keeps_corner_pixels() {
        let src = quad();
        let out = resize(&src, 4, 4, false).unwrap();
        assert_eq!(out.shape(), (4, 4, 4));
        assert_eq!(pixel(&out, 0, 0), pixel(&src, 0, 0));
        assert_eq!(pixel(&out, 0, 3), pixel(&src, 0, 1));
        assert_eq!(pixel(&out, 3, 0), pixel(&src, 1, 0));
        assert_eq!(pixel(&out, 3, 3), pixel(&src, 1, 1));
    }

    #[test]
    fn interpolates_between_neighbours() {
        let src = ImageTensor::from_vec(1, 2, 1, vec![0u8, 100]).unwrap();
        let out = resize(&src, 4, 1, false).unwrap();
        // src_x = 0, 0.5, 1, 1.5 (clamped to 1)
        assert_eq!(out.data(), &[0, 50, 100, 100]);
    }

    #[test]
    fn output_shape_matches_request() {
        let src = quad();
        for (w, h) in [(1, 1), (3, 5), (7, 2), (16, 16)] {
            let out = resize(&src, w, h, false).unwrap();
            assert_eq!(out.shape(), (h, w, 4));
            let back = resize(&out, 2, 2, false).unwrap();
            assert_eq!(back.shape(), src.shape());
        }
    }

    #[test]
    fn f32_tensors_are_not_rounded() {
        let src = ImageTensor::from_vec(1, 2, 1, vec![0.0f32, 1.0]).unwrap();
        let out = resize(&src, 4, 1, false).unwrap();
        assert_eq!(out.data(), &[0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn zero_target_is_rejected() {
        let src = quad();
        assert!(matches!(resize(&src, 0, 4, false), Err(Error::InvalidDimensions(_))));
        assert!(matches!(resize(&src, 4, 0, true), Err(Error::InvalidDimensions(_))));
    }

    #[test]
    fn proportional_uses_a_single_scale() {
        assert_eq!(scales(200, 100, 50, 50, true), (4.0, 4.0));
        assert_eq!(scales(50, 25, 100, 100, true), (0.25, 0.25));
        assert_eq!(scales(200, 100, 50, 50, false), (4.0, 2.0));
    }

    #[test]
    fn proportional_repeats_edge_pixels() {
        // 1 wide, 2 tall column into a 4x4 box: scale 0.25 on both axes, so
        // columns past x = 0 repeat the single source column.
        let src = ImageTensor::from_vec(2, 1, 1, vec![10u8, 20]).unwrap();
        let out = resize(&src, 4, 4, true).unwrap();
        assert_eq!(out.shape(), (4, 4, 1));
        assert_eq!(out.get(0, 3, 0), 10);
        // y = 3 samples src_y = 0.75
        assert_eq!(out.get(3, 0, 0), 18);
        assert_eq!(out.get(3, 3, 0), 18);
    }
}
