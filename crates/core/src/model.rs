//! Field records flowing through the sizing pipeline.
//!
//! Records are immutable values: every stage builds a new record from the
//! previous one instead of mutating it in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::geometry::NormBox;

/// Kind of interactive widget a field becomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Email,
    Phone,
    Checkbox,
    Radio,
    Dropdown,
    Signature,
}

impl FieldType {
    pub const ALL: [FieldType; 10] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Date,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Dropdown,
        FieldType::Signature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Dropdown => "dropdown",
            FieldType::Signature => "signature",
        }
    }

    /// Square toggle widgets.
    pub fn is_toggle(self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| InputError::UnknownFieldType(s.to_string()))
    }
}

/// Coarse field location handed in by upstream detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub label: String,
    pub field_type: FieldType,
    /// 1-indexed page number.
    pub page: u32,
    /// Approximate label or value region; a hint, not ground truth.
    pub anchor_box: NormBox,
    /// Upstream confidence in [0, 100]. Informational only.
    pub confidence: f64,
    /// Choices offered by a dropdown.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldCandidate {
    pub fn new(
        label: impl Into<String>,
        field_type: FieldType,
        page: u32,
        anchor_box: NormBox,
    ) -> Self {
        Self {
            label: label.into(),
            field_type,
            page,
            anchor_box,
            confidence: 100.0,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Checks the candidate against the document it belongs to.
    pub fn validate(&self, page_count: usize) -> Result<(), InputError> {
        if self.label.trim().is_empty() {
            return Err(InputError::EmptyLabel);
        }
        if self.page == 0 || self.page as usize > page_count {
            return Err(InputError::PageOutOfRange {
                page: self.page,
                page_count,
            });
        }
        let b = &self.anchor_box;
        if !b.is_non_degenerate() {
            return Err(InputError::DegenerateAnchor);
        }
        if [b.left, b.top, b.width, b.height]
            .iter()
            .any(|v| !(0.0..=1.0).contains(v))
        {
            return Err(InputError::AnchorOutOfRange);
        }
        if !(0.0..=100.0).contains(&self.confidence) {
            return Err(InputError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }
}

/// Weak-evidence markers attached to a sized field for manual review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// No underline and no white-space boundary backed the box.
    NoPixelEvidence,
    /// The computed box left the page and was clamped to it.
    ClampedToPage,
    /// The computed width or height was not positive and was replaced by the floor.
    CollapsedSize,
}

/// Output record: a candidate plus its finalized box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizedField {
    #[serde(flatten)]
    pub candidate: FieldCandidate,
    #[serde(rename = "bounding_box")]
    pub bbox: NormBox,
    /// The overlap resolver changed the solver's box or could not fully
    /// separate it from a neighbour.
    pub adjusted: bool,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    /// Intersection area left with earlier fields after resolution.
    #[serde(default)]
    pub residual_overlap: f64,
}

impl SizedField {
    pub fn degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn page(&self) -> u32 {
        self.candidate.page
    }

    /// Copy of this record with a new box, as produced by the overlap resolver.
    pub(crate) fn with_resolution(&self, bbox: NormBox, residual_overlap: f64) -> SizedField {
        SizedField {
            candidate: self.candidate.clone(),
            adjusted: bbox != self.bbox || residual_overlap > 0.0 || self.adjusted,
            bbox,
            degradations: self.degradations.clone(),
            residual_overlap,
        }
    }
}

/// A candidate refused before sizing, reported back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Position of the candidate in the caller's input.
    pub index: usize,
    pub label: String,
    pub page: u32,
    pub error: InputError,
}

#[cfg(test)]
mod tests {
    use super::{FieldCandidate, FieldType};
    use crate::error::InputError;
    use crate::geometry::NormBox;

    fn candidate(anchor: NormBox) -> FieldCandidate {
        FieldCandidate::new("Name", FieldType::Text, 1, anchor)
    }

    #[test]
    fn field_type_parses_case_insensitively() {
        assert_eq!("Checkbox".parse::<FieldType>(), Ok(FieldType::Checkbox));
        assert_eq!(" signature ".parse::<FieldType>(), Ok(FieldType::Signature));
        assert_eq!(
            "slider".parse::<FieldType>(),
            Err(InputError::UnknownFieldType("slider".into()))
        );
    }

    #[test]
    fn zero_area_anchor_rejected() {
        let c = candidate(NormBox::new(0.1, 0.1, 0.0, 0.02));
        assert_eq!(c.validate(1), Err(InputError::DegenerateAnchor));
    }

    #[test]
    fn page_out_of_range_rejected() {
        let mut c = candidate(NormBox::new(0.1, 0.1, 0.1, 0.02));
        c.page = 3;
        assert_eq!(
            c.validate(2),
            Err(InputError::PageOutOfRange {
                page: 3,
                page_count: 2
            })
        );
        c.page = 0;
        assert!(c.validate(2).is_err());
    }

    #[test]
    fn anchor_components_must_be_fractions() {
        let c = candidate(NormBox::new(1.2, 0.1, 0.1, 0.02));
        assert_eq!(c.validate(1), Err(InputError::AnchorOutOfRange));
    }

    #[test]
    fn blank_label_rejected() {
        let mut c = candidate(NormBox::new(0.1, 0.1, 0.1, 0.02));
        c.label = "   ".into();
        assert_eq!(c.validate(1), Err(InputError::EmptyLabel));
    }

    #[test]
    fn valid_candidate_passes() {
        let c = candidate(NormBox::new(0.1, 0.1, 0.1, 0.02)).with_confidence(87.5);
        assert!(c.validate(1).is_ok());
    }
}
