//! Sizing parameters.
//!
//! Contains the [`SizingConfig`] struct threaded through every stage of the
//! engine. Pixel quantities are expressed at 300 dpi and rescaled to the
//! resolution of the raster being analyzed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SizingError};

/// Resolution at which the pixel-valued parameters are specified.
pub const REFERENCE_DPI: u32 = 300;

/// Parameters for field sizing.
///
/// Exact threshold values are empirically tuned; treat them as knobs, not
/// contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Rasterization resolution requested from the rasterizer.
    pub dpi: u32,

    /// Luminance strictly below this value counts as ink.
    pub darkness_threshold: u8,

    /// Floor for width and height of any sized box, in page fractions.
    pub min_field_size: f64,

    /// Multiplier from text height to single-line box height. Must exceed 1.
    pub padding_factor: f64,

    /// Height of the underline search band, relative to the anchor height.
    pub underline_band_factor: f64,

    /// Minimum underline run length, relative to the anchor width.
    pub underline_min_run_fraction: f64,

    /// Maximum width of a single-line field sized from white space alone,
    /// as a fraction of page width.
    pub max_inline_width: f64,

    /// Page margin that capped and translated boxes stay inside.
    pub page_margin: f64,

    /// Minimum textarea height in padded text lines.
    pub textarea_min_lines: f64,

    /// Minimum signature width as a fraction of page width.
    pub signature_min_width: f64,

    /// Signature height in padded text lines.
    pub signature_height_lines: f64,

    /// Average glyph width relative to text height, for dropdown floors.
    pub char_width_factor: f64,

    /// Width of the text-height sampling band, relative to the anchor width.
    pub text_band_fraction: f64,

    /// Dark runs shorter than this (pixels at 300 dpi) are noise.
    pub noise_floor_px: f64,

    /// Text height assumed when no runs are found (pixels at 300 dpi).
    pub default_text_height_px: f64,

    /// Worker threads for page-level parallelism. None uses all cores.
    pub threads: Option<usize>,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            dpi: REFERENCE_DPI,
            darkness_threshold: 128,
            min_field_size: 0.01,
            padding_factor: 1.5,
            underline_band_factor: 1.5,
            underline_min_run_fraction: 0.5,
            max_inline_width: 0.5,
            page_margin: 0.02,
            textarea_min_lines: 3.0,
            signature_min_width: 0.2,
            signature_height_lines: 2.0,
            char_width_factor: 0.6,
            text_band_fraction: 0.25,
            noise_floor_px: 3.0,
            default_text_height_px: 12.0,
            threads: None,
        }
    }
}

impl SizingConfig {
    /// Loads a config file, JSON or YAML chosen by extension. Missing keys
    /// take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let config: Self = if is_yaml {
            serde_yaml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every parameter is inside its usable range.
    pub fn validate(&self) -> Result<()> {
        fn fraction(name: &str, v: f64, allow_zero: bool) -> Result<()> {
            let lower_ok = if allow_zero { v >= 0.0 } else { v > 0.0 };
            if v.is_finite() && lower_ok && v < 1.0 {
                Ok(())
            } else {
                Err(SizingError::InvalidConfig(format!(
                    "{name} must be a page fraction below 1, got {v}"
                )))
            }
        }
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SizingError::InvalidConfig(format!(
                    "{name} must be positive, got {v}"
                )))
            }
        }

        if self.dpi == 0 {
            return Err(SizingError::InvalidConfig("dpi must be positive".into()));
        }
        if self.darkness_threshold == 0 {
            return Err(SizingError::InvalidConfig(
                "darkness_threshold of 0 classifies nothing as ink".into(),
            ));
        }
        if !(self.padding_factor.is_finite() && self.padding_factor > 1.0) {
            return Err(SizingError::InvalidConfig(format!(
                "padding_factor must be greater than 1, got {}",
                self.padding_factor
            )));
        }
        fraction("min_field_size", self.min_field_size, false)?;
        fraction("max_inline_width", self.max_inline_width, false)?;
        fraction("page_margin", self.page_margin, true)?;
        fraction("signature_min_width", self.signature_min_width, false)?;
        fraction("text_band_fraction", self.text_band_fraction, false)?;
        fraction(
            "underline_min_run_fraction",
            self.underline_min_run_fraction,
            false,
        )?;
        positive("underline_band_factor", self.underline_band_factor)?;
        positive("textarea_min_lines", self.textarea_min_lines)?;
        positive("signature_height_lines", self.signature_height_lines)?;
        positive("char_width_factor", self.char_width_factor)?;
        positive("noise_floor_px", self.noise_floor_px)?;
        positive("default_text_height_px", self.default_text_height_px)?;
        if self.threads == Some(0) {
            return Err(SizingError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Rescales a pixel quantity given at [`REFERENCE_DPI`] to `dpi`.
    pub(crate) fn scale_px(&self, px_at_reference: f64, dpi: u32) -> f64 {
        px_at_reference * f64::from(dpi) / f64::from(REFERENCE_DPI)
    }
}

#[cfg(test)]
mod tests {
    use super::SizingConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(SizingConfig::default().validate().is_ok());
    }

    #[test]
    fn padding_factor_must_exceed_one() {
        let config = SizingConfig {
            padding_factor: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: SizingConfig =
            serde_json::from_str(r#"{"dpi": 150, "padding_factor": 1.3}"#).unwrap();
        assert_eq!(config.dpi, 150);
        assert_eq!(config.padding_factor, 1.3);
        assert_eq!(config.darkness_threshold, 128);
    }

    #[test]
    fn pixel_constants_rescale_with_dpi() {
        let config = SizingConfig::default();
        assert_eq!(config.scale_px(12.0, 150), 6.0);
        assert_eq!(config.scale_px(12.0, 300), 12.0);
    }

    #[test]
    fn zero_threads_rejected() {
        let config = SizingConfig {
            threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
