use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for dataset-maker operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No .{extension} annotation file found in {path}")]
    MissingAnnotationSource { path: PathBuf, extension: String },

    #[error("Found {} .{extension} annotation files in {path}; expected exactly one", .candidates.len())]
    AmbiguousAnnotationSource {
        path: PathBuf,
        extension: String,
        candidates: Vec<PathBuf>,
    },

    #[error("No image named '{name}' found in {dir}")]
    MissingImage { dir: PathBuf, name: String },

    #[error("Image '{name}' is ambiguous in {dir}: {} candidates", .candidates.len())]
    AmbiguousImage {
        dir: PathBuf,
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("Malformed annotation in {path}: {message}")]
    MalformedAnnotation { path: PathBuf, message: String },

    #[error("Length mismatch in {context}: {left_name} has {left} item(s), {right_name} has {right}")]
    LengthMismatch {
        context: String,
        left_name: &'static str,
        left: usize,
        right_name: &'static str,
        right: usize,
    },

    #[error("Records '{first}' and '{second}' would both be written to {path}")]
    DuplicateRecord {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Unknown format: '{0}'")]
    UnknownFormat(String),

    #[error("Format '{0}' is already registered")]
    DuplicateFormat(String),

    #[error("Failed to read image bytes from {path}: {source}")]
    ImageReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read image header from {path}: {source}")]
    ImageInfo {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode mask: {message}")]
    MaskEncode { message: String },

    #[error("Label '{label}' has no id in the class map")]
    UnknownLabel { label: String },

    #[error("Invalid class map in {path}: {message}")]
    ClassMapInvalid { path: PathBuf, message: String },

    #[error("Failed to parse class map YAML from {path}: {source}")]
    ClassMapParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Number of shards must be at least 1, got {0}")]
    InvalidShardCount(usize),

    #[error("Record writer is already closed")]
    WriterClosed,

    #[error("Corrupt record frame in {path} at byte {offset}: {message}")]
    RecordFrame {
        path: PathBuf,
        offset: u64,
        message: String,
    },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
