//! Rasterized pages and the rasterizer boundary.
//!
//! Rendering a document page to pixels is done by an external collaborator
//! behind the [`Rasterizer`] trait. The engine only ever reads the resulting
//! luminance grid.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use crate::error::{Result, SizingError};
use crate::geometry::NormBox;

/// One rendered page as an 8-bit luminance grid, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRaster {
    width: u32,
    height: u32,
    dpi: u32,
    luminance: Vec<u8>,
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl PageRaster {
    /// Wraps a luminance buffer. Zero-sized pages and buffers that do not
    /// match the dimensions are invalid.
    pub fn new(width: u32, height: u32, dpi: u32, luminance: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SizingError::InvalidRaster {
                page: 0,
                reason: format!("zero-dimension image {width}x{height}"),
            });
        }
        if dpi == 0 {
            return Err(SizingError::InvalidRaster {
                page: 0,
                reason: "dpi must be positive".into(),
            });
        }
        let expected = width as usize * height as usize;
        if luminance.len() != expected {
            return Err(SizingError::InvalidRaster {
                page: 0,
                reason: format!(
                    "buffer holds {} pixels, expected {expected}",
                    luminance.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            dpi,
            luminance,
        })
    }

    /// A blank (all white) page.
    pub fn blank(width: u32, height: u32, dpi: u32) -> Result<Self> {
        Self::new(width, height, dpi, vec![255; width as usize * height as usize])
    }

    pub fn from_gray_image(image: GrayImage, dpi: u32) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, dpi, image.into_raw())
    }

    pub fn from_dynamic_image(image: &DynamicImage, dpi: u32) -> Result<Self> {
        Self::from_gray_image(image.to_luma8(), dpi)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn luminance(&self) -> &[u8] {
        &self.luminance
    }

    /// Luminance at `(x, y)`. Callers stay inside the page.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.luminance[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn is_dark(&self, x: u32, y: u32, threshold: u8) -> bool {
        self.luma(x, y) < threshold
    }

    /// One pixel row.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.luminance[start..start + self.width as usize]
    }

    /// Paints a rectangle with a luminance value, clipped to the page.
    pub fn fill_rect(&mut self, rect: PixelRect, value: u8) {
        let x1 = rect.x1.min(self.width);
        let y1 = rect.y1.min(self.height);
        for y in rect.y0.min(y1)..y1 {
            let start = y as usize * self.width as usize;
            self.luminance[start + rect.x0.min(x1) as usize..start + x1 as usize].fill(value);
        }
    }

    /// Converts a normalized box to the pixels it covers, clipped to the page.
    pub fn px_rect(&self, b: &NormBox) -> PixelRect {
        PixelRect {
            x0: self.px_x(b.left),
            y0: self.px_y(b.top),
            x1: self.px_x(b.right()),
            y1: self.px_y(b.bottom()),
        }
    }

    /// Column index for a horizontal page fraction.
    pub fn px_x(&self, v: f64) -> u32 {
        to_px(v, self.width)
    }

    /// Row index for a vertical page fraction.
    pub fn px_y(&self, v: f64) -> u32 {
        to_px(v, self.height)
    }

    /// Horizontal pixel distance as a page fraction.
    pub fn norm_x(&self, px: f64) -> f64 {
        px / f64::from(self.width)
    }

    /// Vertical pixel distance as a page fraction.
    pub fn norm_y(&self, px: f64) -> f64 {
        px / f64::from(self.height)
    }
}

fn to_px(v: f64, extent: u32) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    let px = (v * f64::from(extent)).round();
    if px >= f64::from(extent) {
        extent
    } else {
        px as u32
    }
}

/// Renders document pages to pixels.
///
/// Implementations are shared across worker threads, one page per worker.
pub trait Rasterizer: Sync {
    /// Number of pages in the source document.
    fn page_count(&self) -> usize;

    /// Renders the 1-indexed `page` at `dpi`.
    fn render(&self, page: u32, dpi: u32) -> Result<PageRaster>;
}

/// Pages that were rasterized before sizing started.
#[derive(Clone, Debug, Default)]
pub struct PreRendered {
    pages: Vec<Option<PageRaster>>,
    failures: Vec<(u32, String)>,
}

impl PreRendered {
    pub fn new(pages: Vec<PageRaster>) -> Self {
        Self {
            pages: pages.into_iter().map(Some).collect(),
            failures: Vec::new(),
        }
    }

    /// Loads one image file per page, page 1 first.
    ///
    /// A file that cannot be decoded does not abort the load: that page
    /// reports the failure when rendered.
    pub fn from_image_files<P: AsRef<Path>>(paths: &[P], dpi: u32) -> Self {
        let mut pages = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for (idx, path) in paths.iter().enumerate() {
            let page = idx as u32 + 1;
            let loaded = image::open(path.as_ref())
                .map_err(SizingError::from)
                .and_then(|img| PageRaster::from_dynamic_image(&img, dpi));
            match loaded {
                Ok(raster) => pages.push(Some(raster)),
                Err(e) => {
                    tracing::warn!(
                        page,
                        path = %path.as_ref().display(),
                        "cannot load page image: {e}"
                    );
                    failures.push((page, e.to_string()));
                    pages.push(None);
                }
            }
        }
        Self { pages, failures }
    }
}

impl Rasterizer for PreRendered {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render(&self, page: u32, _dpi: u32) -> Result<PageRaster> {
        let idx = (page as usize).checked_sub(1);
        match idx.and_then(|i| self.pages.get(i)) {
            Some(Some(raster)) => Ok(raster.clone()),
            Some(None) => {
                let reason = self
                    .failures
                    .iter()
                    .find(|(p, _)| *p == page)
                    .map(|(_, r)| r.clone())
                    .unwrap_or_else(|| "page image unavailable".into());
                Err(SizingError::Rasterize { page, reason })
            }
            None => Err(SizingError::Rasterize {
                page,
                reason: format!("document has {} pages", self.pages.len()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PageRaster, PixelRect, PreRendered, Rasterizer};
    use crate::error::SizingError;
    use crate::geometry::NormBox;

    #[test]
    fn zero_dimension_raster_is_invalid() {
        assert!(matches!(
            PageRaster::new(0, 10, 300, Vec::new()),
            Err(SizingError::InvalidRaster { .. })
        ));
    }

    #[test]
    fn buffer_length_must_match() {
        assert!(PageRaster::new(4, 4, 300, vec![255; 15]).is_err());
        assert!(PageRaster::new(4, 4, 300, vec![255; 16]).is_ok());
    }

    #[test]
    fn px_rect_rounds_and_clips() {
        let raster = PageRaster::blank(100, 200, 300).unwrap();
        let rect = raster.px_rect(&NormBox::new(0.1, 0.25, 0.5, 0.9));
        assert_eq!(
            rect,
            PixelRect {
                x0: 10,
                y0: 50,
                x1: 60,
                y1: 200
            }
        );
    }

    #[test]
    fn fill_rect_marks_ink() {
        let mut raster = PageRaster::blank(10, 10, 300).unwrap();
        raster.fill_rect(
            PixelRect {
                x0: 2,
                y0: 3,
                x1: 5,
                y1: 4,
            },
            0,
        );
        assert!(raster.is_dark(2, 3, 128));
        assert!(raster.is_dark(4, 3, 128));
        assert!(!raster.is_dark(5, 3, 128));
        assert!(!raster.is_dark(2, 4, 128));
    }

    #[test]
    fn pre_rendered_reports_missing_pages() {
        let pages = PreRendered::new(vec![PageRaster::blank(4, 4, 300).unwrap()]);
        assert_eq!(pages.page_count(), 1);
        assert!(pages.render(1, 300).is_ok());
        assert!(matches!(
            pages.render(2, 300),
            Err(SizingError::Rasterize { page: 2, .. })
        ));
        assert!(pages.render(0, 300).is_err());
    }
}
