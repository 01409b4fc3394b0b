//! VGG Image Annotator (VIA) JSON reader and writer.
//!
//! One JSON document maps image keys to entries. Each entry has a `regions`
//! collection, written either as a mapping (`{"0": {...}, "1": {...}}`) or
//! as a list. Both shapes are normalized into one ordered `Vec` right after
//! parsing.
//!
//! Regions are polygons (`all_points_x` / `all_points_y`); VIA `rect` regions
//! are read as their four-corner polygon. The writer always emits
//! axis-aligned rectangles, so polygon detail does not survive a round trip.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::discover::{self, image_path};
use super::image_io::ImageProvider;
use super::model::{AnnotationSet, Object, Record};
use super::polygon::{Polygon, PolygonError};
use super::BBox;
use crate::error::DatasetError;

/// File name used by [`write_vgg`].
pub const VGG_FILE_NAME: &str = "vgg_annotations.json";

const VGG_EXTENSION: &str = "json";

/// Read a VGG JSON file into an annotation set.
///
/// `annotations` is the `.json` file itself or a directory holding exactly
/// one. With `rasterize_masks` every region polygon is also filled into a
/// mask the size of its image.
pub fn read_vgg(
    image_dir: &Path,
    annotations: &Path,
    images: &dyn ImageProvider,
    rasterize_masks: bool,
) -> Result<AnnotationSet, DatasetError> {
    let json_path = discover::single_annotation_file(annotations, VGG_EXTENSION)?;
    let data = fs::read_to_string(&json_path).map_err(DatasetError::Io)?;
    let entries = parse_vgg_json_str(&data, &json_path)?;

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let info = images.describe(&image_path(image_dir, &entry.name)?)?;
        let mut record = Record::new(entry.name, info.width, info.height, info.depth);

        for region in entry.regions {
            let mut object = Object::new(region.polygon.bbox(), region.label);
            if rasterize_masks {
                object.mask = Some(region.polygon.rasterize(record.width, record.height));
            }
            record.objects.push(object);
        }

        log::debug!(
            "parsed VGG entry '{}' ({} region(s))",
            record.name,
            record.objects.len()
        );
        records.push(record);
    }

    Ok(AnnotationSet::new(records))
}

/// Write the set as one `vgg_annotations.json` in `output_dir`.
///
/// Every object becomes a four-point rectangle polygon of its bbox. Two
/// records with the same name fail with `DuplicateRecord` before the file
/// is created.
pub fn write_vgg(output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
    let path = output_dir.join(VGG_FILE_NAME);
    let document = to_vgg_json_value(set).map_err(|err| match err {
        DatasetError::DuplicateRecord { first, second, .. } => DatasetError::DuplicateRecord {
            path: path.clone(),
            first,
            second,
        },
        other => other,
    })?;

    fs::create_dir_all(output_dir).map_err(DatasetError::Io)?;
    let file = fs::File::create(&path).map_err(DatasetError::Io)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document).map_err(|source| {
        DatasetError::JsonWrite {
            path: path.clone(),
            source,
        }
    })?;
    writer.flush().map_err(DatasetError::Io)?;

    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Build the VGG JSON document for a set, entries in record order.
///
/// Entries are keyed by record name, so names must be unique.
pub fn to_vgg_json_value(set: &AnnotationSet) -> Result<Value, DatasetError> {
    let mut document = Map::new();

    for record in set {
        if document.contains_key(&record.name) {
            return Err(DatasetError::DuplicateRecord {
                path: PathBuf::from(VGG_FILE_NAME),
                first: record.name.clone(),
                second: record.name.clone(),
            });
        }

        let mut regions = Map::new();
        for (idx, object) in record.objects.iter().enumerate() {
            regions.insert(idx.to_string(), rectangle_region(&object.bbox, &object.label));
        }

        let entry = json!({
            "filename": record.name,
            "regions": regions,
        });
        document.insert(record.name.clone(), entry);
    }

    Ok(Value::Object(document))
}

/// Parse VGG JSON from a UTF-8 string.
///
/// This helper is primarily useful for testing/fuzzing parse behavior in-memory.
pub fn from_vgg_json_str(json: &str) -> Result<(), DatasetError> {
    parse_vgg_json_str(json, Path::new("<memory>"))?;
    Ok(())
}

/// One image entry after normalization.
#[derive(Debug)]
struct VggImage {
    name: String,
    regions: Vec<VggRegion>,
}

#[derive(Debug)]
struct VggRegion {
    polygon: Polygon,
    label: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    regions: RawRegions,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRegions {
    List(Vec<RawRegion>),
    Mapping(Map<String, Value>),
}

impl Default for RawRegions {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    shape_attributes: RawShape,
    #[serde(default)]
    region_attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawShape {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    all_points_x: Option<Vec<f64>>,
    #[serde(default)]
    all_points_y: Option<Vec<f64>>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

fn parse_vgg_json_str(json: &str, path: &Path) -> Result<Vec<VggImage>, DatasetError> {
    let document: Map<String, Value> =
        serde_json::from_str(json).map_err(|source| DatasetError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let mut images = Vec::with_capacity(document.len());
    for (key, value) in document {
        let entry: RawEntry = serde_json::from_value(value).map_err(|source| {
            malformed(path, format!("entry '{key}': {source}"))
        })?;

        let name = entry
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(key);

        let raw_regions = match entry.regions {
            RawRegions::List(list) => list,
            RawRegions::Mapping(mapping) => mapping
                .into_iter()
                .map(|(region_key, value)| {
                    serde_json::from_value(value).map_err(|source| {
                        malformed(path, format!("entry '{name}', region '{region_key}': {source}"))
                    })
                })
                .collect::<Result<Vec<RawRegion>, _>>()?,
        };

        let regions = raw_regions
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| convert_region(raw, path, &name, idx))
            .collect::<Result<Vec<_>, _>>()?;

        images.push(VggImage { name, regions });
    }

    Ok(images)
}

fn convert_region(
    raw: RawRegion,
    path: &Path,
    image: &str,
    idx: usize,
) -> Result<VggRegion, DatasetError> {
    let context = format!("entry '{image}', region {idx}");

    let label = match raw.region_attributes.get("label") {
        Some(Value::String(label)) if !label.trim().is_empty() => label.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(malformed(path, format!("{context}: missing region_attributes.label"))),
    };

    let shape = raw.shape_attributes;
    let polygon = match (shape.all_points_x, shape.all_points_y) {
        (Some(xs), Some(ys)) => Polygon::new(xs, ys).map_err(|err| polygon_error(err, path, &context))?,
        (None, None) => match (shape.x, shape.y, shape.width, shape.height) {
            (Some(x), Some(y), Some(w), Some(h)) => Polygon::new(
                vec![x, x + w, x + w, x],
                vec![y, y, y + h, y + h],
            )
            .map_err(|err| polygon_error(err, path, &context))?,
            _ => {
                return Err(malformed(
                    path,
                    format!(
                        "{context}: unsupported shape '{}'",
                        shape.name.as_deref().unwrap_or("<unnamed>")
                    ),
                ))
            }
        },
        _ => {
            return Err(malformed(
                path,
                format!("{context}: all_points_x and all_points_y must both be present"),
            ))
        }
    };

    Ok(VggRegion { polygon, label })
}

fn polygon_error(err: PolygonError, path: &Path, context: &str) -> DatasetError {
    match err {
        PolygonError::LengthMismatch { xs, ys } => DatasetError::LengthMismatch {
            context: format!("{context} in {}", path.display()),
            left_name: "all_points_x",
            left: xs,
            right_name: "all_points_y",
            right: ys,
        },
        other => malformed(path, format!("{context}: {other}")),
    }
}

fn rectangle_region(bbox: &BBox, label: &str) -> Value {
    json!({
        "shape_attributes": {
            "name": "polygon",
            "all_points_x": [bbox.x0, bbox.x1, bbox.x1, bbox.x0],
            "all_points_y": [bbox.y0, bbox.y0, bbox.y1, bbox.y1],
        },
        "region_attributes": { "label": label },
    })
}

fn malformed(path: &Path, message: String) -> DatasetError {
    DatasetError::MalformedAnnotation {
        path: PathBuf::from(path),
        message,
    }
}
