//! YOLO text label reader and writer.
//!
//! One `.txt` file per image, one line per object:
//! `class a b w h`, with all numbers normalized to the image size. Which
//! point `(a, b)` denotes is decided by a [`BoxAnchor`]. Class ids are mapped
//! to labels through an optional `data.yaml` next to the label files.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::discover::{self, file_name_string, file_stem_string, strip_image_extension, ImageIndex};
use super::image_io::ImageProvider;
use super::model::{AnnotationSet, Object, Record};
use super::{BoxFractions, ClassMap};
use crate::error::DatasetError;

/// Class-name file written next to the label files.
pub const DATA_YAML: &str = "data.yaml";

const LABEL_EXTENSION: &str = "txt";

/// Which point of a box the first two numeric fields of a label line denote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxAnchor {
    /// `cx cy w h`, the usual YOLO convention.
    #[default]
    Center,
    /// `x y w h` with `(x, y)` the top-left corner.
    TopLeft,
}

impl BoxAnchor {
    /// Builds box fractions from the four numeric fields of a label line.
    pub fn to_fractions(self, a: f64, b: f64, w: f64, h: f64) -> BoxFractions {
        match self {
            Self::Center => BoxFractions::from_cxcywh(a, b, w, h),
            Self::TopLeft => BoxFractions::from_xywh(a, b, w, h),
        }
    }

    /// Returns the four numeric fields of a label line for `fractions`.
    pub fn from_fractions(self, fractions: &BoxFractions) -> (f64, f64, f64, f64) {
        match self {
            Self::Center => fractions.to_cxcywh(),
            Self::TopLeft => fractions.to_xywh(),
        }
    }
}

/// Read a directory of YOLO label files into an annotation set.
///
/// Each `name.txt` is paired with the single image `name.<ext>` in
/// `image_dir`. Without a `data.yaml` the class token itself becomes the
/// label.
pub fn read_yolo(
    image_dir: &Path,
    annotations: &Path,
    images: &dyn ImageProvider,
    anchor: BoxAnchor,
) -> Result<AnnotationSet, DatasetError> {
    let label_files = discover::annotation_files(annotations, LABEL_EXTENSION)?;
    let class_map = read_data_yaml(annotations)?;
    let index = ImageIndex::scan(image_dir)?;

    let mut records = Vec::with_capacity(label_files.len());
    for label_path in label_files {
        let image_path = index.resolve(&file_stem_string(&label_path))?;
        let info = images.describe(&image_path)?;
        let mut record = Record::new(
            file_name_string(&image_path),
            info.width,
            info.height,
            info.depth,
        );

        let content = fs::read_to_string(&label_path).map_err(DatasetError::Io)?;
        for (line_idx, line) in content.lines().enumerate() {
            let Some(row) = parse_label_line(line, &label_path, line_idx + 1)? else {
                continue;
            };

            let label = match &class_map {
                Some(classes) => resolve_class(classes, &row.class, &label_path, line_idx + 1)?,
                None => row.class,
            };
            let bbox = anchor
                .to_fractions(row.a, row.b, row.w, row.h)
                .to_pixels(record.width, record.height);
            record.objects.push(Object::new(bbox, label));
        }

        log::debug!(
            "parsed {} ({} object(s))",
            label_path.display(),
            record.objects.len()
        );
        records.push(record);
    }

    Ok(AnnotationSet::new(records))
}

/// Write one label file per record plus `data.yaml` into `output_dir`.
///
/// Class ids come from a [`ClassMap`] built over the whole set. Records
/// without objects still get an (empty) label file. Records whose names
/// differ only in image extension would share a label file and fail with
/// `DuplicateRecord` before anything is written.
pub fn write_yolo(
    output_dir: &Path,
    set: &AnnotationSet,
    anchor: BoxAnchor,
) -> Result<(), DatasetError> {
    let label_paths = discover::distinct_outputs(set, |name: &str| {
        output_dir.join(format!(
            "{}.{}",
            strip_image_extension(name),
            LABEL_EXTENSION
        ))
    })?;

    fs::create_dir_all(output_dir).map_err(DatasetError::Io)?;
    let classes = ClassMap::from_set(set);

    for (record, label_path) in set.iter().zip(label_paths) {
        let file = fs::File::create(&label_path).map_err(DatasetError::Io)?;
        let mut writer = BufWriter::new(file);

        for object in &record.objects {
            let class_id = classes.require(&object.label)?;
            let fractions = object.bbox.to_fractions(record.width, record.height);
            writeln!(writer, "{}", format_label_line(class_id, &fractions, anchor))
                .map_err(DatasetError::Io)?;
        }
        writer.flush().map_err(DatasetError::Io)?;
    }

    fs::write(output_dir.join(DATA_YAML), classes.to_yaml_string()).map_err(DatasetError::Io)?;
    Ok(())
}

/// Formats one label line with six decimal places.
pub fn format_label_line(class_id: i64, fractions: &BoxFractions, anchor: BoxAnchor) -> String {
    let (a, b, w, h) = anchor.from_fractions(fractions);
    format!("{class_id} {a:.6} {b:.6} {w:.6} {h:.6}")
}

/// Fuzz-only entrypoint for YOLO single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), DatasetError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

#[derive(Debug, PartialEq)]
struct YoloLabelRow {
    class: String,
    a: f64,
    b: f64,
    w: f64,
    h: f64,
}

fn data_yaml_path(annotations: &Path) -> Option<PathBuf> {
    if annotations.is_dir() {
        Some(annotations.join(DATA_YAML))
    } else {
        annotations.parent().map(|parent| parent.join(DATA_YAML))
    }
}

fn read_data_yaml(annotations: &Path) -> Result<Option<ClassMap>, DatasetError> {
    match data_yaml_path(annotations) {
        Some(path) if path.is_file() => {
            log::debug!("reading class names from {}", path.display());
            ClassMap::from_yolo_yaml_file(&path).map(Some)
        }
        _ => Ok(None),
    }
}

fn resolve_class(
    classes: &ClassMap,
    token: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<String, DatasetError> {
    token
        .parse::<i64>()
        .ok()
        .and_then(|id| classes.label(id))
        .map(ToOwned::to_owned)
        .ok_or_else(|| DatasetError::MalformedAnnotation {
            path: file_path.to_path_buf(),
            message: format!("line {line_num}: class '{token}' is not listed in {DATA_YAML}"),
        })
}

fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<YoloLabelRow>, DatasetError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() != 5 {
        return Err(line_error(
            file_path,
            line_num,
            if tokens.len() > 5 {
                "too many fields; only 5-field box lines are supported".to_string()
            } else {
                format!("expected 5 fields, found {}", tokens.len())
            },
        ));
    }

    let a = parse_f64_token(tokens[1], "first coordinate", file_path, line_num)?;
    let b = parse_f64_token(tokens[2], "second coordinate", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;
    if w < 0.0 || h < 0.0 {
        return Err(line_error(
            file_path,
            line_num,
            format!("negative box size {w} x {h}"),
        ));
    }

    Ok(Some(YoloLabelRow {
        class: tokens[0].to_string(),
        a,
        b,
        w,
        h,
    }))
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, DatasetError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(line_error(
            file_path,
            line_num,
            format!("invalid {field_name} '{raw}'; expected a finite number"),
        )),
    }
}

fn line_error(file_path: &Path, line_num: usize, message: String) -> DatasetError {
    DatasetError::MalformedAnnotation {
        path: file_path.to_path_buf(),
        message: format!("line {line_num}: {message}"),
    }
}
