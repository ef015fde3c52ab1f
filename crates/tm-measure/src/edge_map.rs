//! 2D sub-pixel edge map for visual feedback.

use log::debug;
use serde::Serialize;
use tm_core::ImageBuffer;
use tm_edge::{
    RefinedEdgePoint, gaussian_blur, luminance_image, refine_edges, sobel, suppress, threshold,
};

use crate::error::Result;
use crate::measure::check_image;
use crate::params::EdgeMapParams;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMap {
    pub width: usize,
    pub height: usize,
    pub points: Vec<RefinedEdgePoint>,
    pub major_count: usize,
    pub minor_count: usize,
}

impl EdgeMap {
    pub fn majors(&self) -> impl Iterator<Item = &RefinedEdgePoint> {
        self.points.iter().filter(|p| p.is_major)
    }
}

/// Luminance, optional blur and threshold, Sobel, NMS, then refinement.
pub fn edge_map<B: ImageBuffer + ?Sized>(image: &B, params: &EdgeMapParams) -> Result<EdgeMap> {
    params.validate()?;
    check_image(image)?;

    let mut luma = luminance_image(image);
    if params.sigma > 0.0 {
        let border = params.binarize.as_ref().map(|b| b.border).unwrap_or_default();
        luma = gaussian_blur(&luma.as_view(), params.sigma, border);
    }
    if let Some(cfg) = &params.binarize {
        luma = threshold(&luma, cfg.threshold).map(|&v| f32::from(v));
    }

    let field = sobel(&luma);
    let thin = suppress(&field, &params.nms);
    let points: Vec<_> = refine_edges(&thin, &field, &luma, &params.refine).collect();
    let major_count = points.iter().filter(|p| p.is_major).count();

    debug!(
        "edge map {}x{}: {major_count} major, {} minor",
        image.width(),
        image.height(),
        points.len() - major_count
    );
    Ok(EdgeMap {
        width: image.width(),
        height: image.height(),
        minor_count: points.len() - major_count,
        major_count,
        points,
    })
}

#[cfg(test)]
mod tests {
    use tm_core::Image;
    use tm_edge::BinarizeConfig;

    use super::edge_map;
    use crate::{EdgeMapParams, MeasureError};

    fn step_image() -> Image<[u8; 4]> {
        Image::from_fn(40, 20, |x, _| if x < 20 { [20, 20, 20, 255] } else { [230, 230, 230, 255] })
    }

    #[test]
    fn vertical_step_yields_one_column_of_majors() {
        let map = edge_map(&step_image(), &EdgeMapParams::default()).expect("edge map");
        assert_eq!((map.width, map.height), (40, 20));
        assert!(map.major_count > 0);
        assert_eq!(map.minor_count, 0);
        for p in map.majors() {
            assert!((p.subpixel_x - 19.5).abs() <= 1.0, "x = {}", p.subpixel_x);
            assert!(p.quality > 10.0);
        }
    }

    #[test]
    fn flat_image_is_empty() {
        let img = Image::new_fill(16, 16, 128u8);
        let map = edge_map(&img, &EdgeMapParams::default()).expect("edge map");
        assert!(map.points.is_empty());
    }

    #[test]
    fn binarized_path_matches_step() {
        let params = EdgeMapParams {
            sigma: 0.0,
            binarize: Some(BinarizeConfig::default()),
            ..EdgeMapParams::default()
        };
        let map = edge_map(&step_image(), &params).expect("edge map");
        assert!(map.majors().all(|p| (p.subpixel_x - 19.5).abs() <= 1.0));
        assert!(map.major_count > 0);
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let params = EdgeMapParams {
            sigma: -1.0,
            ..EdgeMapParams::default()
        };
        assert!(matches!(
            edge_map(&step_image(), &params),
            Err(MeasureError::InvalidParameter { .. })
        ));
    }
}
