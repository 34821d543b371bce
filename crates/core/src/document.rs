//! Reading field documents and writing sized ones.
//!
//! A fields document is the JSON produced by the upstream detection stage:
//! an object with a `validated_fields` (or `fields`) array. Sizing keeps every
//! other top-level key and every unknown per-field key, replaces each field's
//! `bounding_box` with the sized box and adds the sizing metadata.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::engine::{FieldSizer, PageFailure, SizingStats};
use crate::error::{InputError, Result, SizingError};
use crate::geometry::NormBox;
use crate::model::{FieldCandidate, FieldType, Rejection};
use crate::raster::Rasterizer;

const FIELD_KEYS: [&str; 2] = ["validated_fields", "fields"];

/// Serialization format of a sized document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Picks the format from a file extension, JSON unless it is `yaml`/`yml`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                OutputFormat::Yaml
            }
            _ => OutputFormat::Json,
        }
    }
}

/// One field record as it appears in the input.
#[derive(Deserialize)]
struct RawField {
    #[serde(default)]
    label: String,
    #[serde(default)]
    field_type: Option<String>,
    #[serde(default = "first_page")]
    page: u32,
    bounding_box: NormBox,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    options: Vec<String>,
}

fn first_page() -> u32 {
    1
}

impl TryFrom<RawField> for FieldCandidate {
    type Error = InputError;

    fn try_from(raw: RawField) -> std::result::Result<Self, Self::Error> {
        let field_type = match raw.field_type.as_deref() {
            Some(s) => s.parse()?,
            None => FieldType::Text,
        };
        Ok(FieldCandidate {
            label: raw.label,
            field_type,
            page: raw.page,
            anchor_box: raw.bounding_box,
            confidence: raw.confidence,
            options: raw.options,
        })
    }
}

fn parse_record(record: &Value) -> std::result::Result<FieldCandidate, InputError> {
    let raw: RawField = serde_json::from_value(record.clone())
        .map_err(|e| InputError::Malformed(e.to_string()))?;
    FieldCandidate::try_from(raw)
}

/// A parsed fields document.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldsDocument {
    /// Top-level keys other than the field array.
    extra: Map<String, Value>,
    records: Vec<Value>,
}

impl FieldsDocument {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut extra) = value else {
            return Err(SizingError::MissingFields);
        };
        // validated_fields wins when both are present
        let mut records = None;
        for key in FIELD_KEYS {
            if let Some(v) = extra.remove(key)
                && records.is_none()
            {
                records = Some(v);
            }
        }
        match records {
            Some(Value::Array(records)) => Ok(Self { extra, records }),
            _ => Err(SizingError::MissingFields),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sizes every record against the rendered pages.
    pub fn size<R>(&self, sizer: &FieldSizer, rasterizer: &R) -> Result<SizedDocument>
    where
        R: Rasterizer + ?Sized,
    {
        let mut candidates = Vec::with_capacity(self.records.len());
        let mut origin = Vec::with_capacity(self.records.len());
        let mut rejected = Vec::new();
        for (index, record) in self.records.iter().enumerate() {
            match parse_record(record) {
                Ok(candidate) => {
                    origin.push(index);
                    candidates.push(candidate);
                }
                Err(error) => {
                    tracing::warn!(index, %error, "rejecting field record");
                    rejected.push(Rejection {
                        index,
                        label: record
                            .get("label")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        page: record
                            .get("page")
                            .and_then(Value::as_u64)
                            .and_then(|p| u32::try_from(p).ok())
                            .unwrap_or(1),
                        error,
                    });
                }
            }
        }

        let mut report = sizer.size_document(rasterizer, candidates)?;
        for r in report.rejected.drain(..) {
            rejected.push(Rejection {
                index: origin[r.index],
                ..r
            });
        }
        rejected.sort_by_key(|r| r.index);
        report.rejected = rejected;

        let mut fields = Vec::new();
        for page in &report.pages {
            for (i, sized) in page.iter() {
                let mut out = match &self.records[origin[i]] {
                    Value::Object(map) => map.clone(),
                    _ => Map::new(),
                };
                if let Value::Object(sized_map) = serde_json::to_value(sized)? {
                    out.extend(sized_map);
                }
                out.insert("sizing_method".into(), json!("intelligent"));
                out.insert("degraded".into(), json!(sized.degraded()));
                fields.push(Value::Object(out));
            }
        }

        Ok(SizedDocument {
            extra: self.extra.clone(),
            fields,
            stats: report.stats(),
            rejected: report.rejected,
            failed_pages: report.failed_pages,
        })
    }
}

/// Result of sizing a [`FieldsDocument`].
#[derive(Clone, Debug, PartialEq)]
pub struct SizedDocument {
    extra: Map<String, Value>,
    fields: Vec<Value>,
    pub stats: SizingStats,
    pub rejected: Vec<Rejection>,
    pub failed_pages: Vec<PageFailure>,
}

impl SizedDocument {
    /// Sized field records, page by page.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut doc = self.extra.clone();
        doc.insert("validated_fields".into(), Value::Array(self.fields.clone()));
        doc.insert("sizing_applied".into(), json!(true));
        doc.insert("sizing_stats".into(), serde_json::to_value(&self.stats)?);
        let rejected: Vec<Value> = self
            .rejected
            .iter()
            .map(|r| {
                json!({
                    "index": r.index,
                    "label": r.label,
                    "page": r.page,
                    "reason": r.error.to_string(),
                })
            })
            .collect();
        doc.insert("rejected_fields".into(), Value::Array(rejected));
        doc.insert("failed_pages".into(), serde_json::to_value(&self.failed_pages)?);
        Ok(Value::Object(doc))
    }

    /// Serializes the document. JSON output ends with a newline like YAML.
    pub fn write<W: Write>(&self, mut writer: W, format: OutputFormat) -> Result<()> {
        let value = self.to_value()?;
        match format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &value)?;
                writer.write_all(b"\n")?;
            }
            OutputFormat::Yaml => serde_yaml::to_writer(&mut writer, &value)?,
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>, format: OutputFormat) -> Result<()> {
        let file = File::create(path)?;
        self.write(BufWriter::new(file), format)
    }
}
