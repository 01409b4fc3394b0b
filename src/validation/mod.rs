//! Annotation set validation.
//!
//! Decoding fails fast on malformed input; validation instead inspects an
//! already decoded set and reports every suspicious value it finds:
//! - Record integrity (dimensions, names)
//! - Object quality (labels, box geometry)
//! - Mask consistency (size, emptiness)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashMap;

use crate::error::DatasetError;
use crate::ir::{AnnotationSet, Object, Record};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates a set and returns a report of all issues found.
///
/// The report inherits `opts.strict`, which decides
/// [`ValidationReport::passed`].
pub fn validate_set(set: &AnnotationSet, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new(opts.strict);
    report.records_checked = set.len();
    report.objects_checked = set.object_count();

    if set.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::EmptySet,
            "Set contains no records",
            IssueContext::Set,
        ));
    }

    let mut seen_names: HashMap<&str, usize> = HashMap::new();
    for (index, record) in set.iter().enumerate() {
        let context = IssueContext::Record {
            index,
            name: record.name.clone(),
        };

        if record.width == 0 || record.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    record.width, record.height
                ),
                context.clone(),
            ));
        }

        if record.name.trim().is_empty() {
            report.add(ValidationIssue::error(
                IssueCode::EmptyRecordName,
                "Empty record name",
                context,
            ));
        } else if let Some(first) = seen_names.get(record.name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateRecordName,
                format!("Name also used by record {}", first),
                context,
            ));
        } else {
            seen_names.insert(&record.name, index);
        }

        for (object_idx, object) in record.objects.iter().enumerate() {
            validate_object(record, index, object_idx, object, &mut report);
        }
    }

    report
}

/// Validates a set and turns a failing report into an error.
///
/// In strict mode warnings fail validation too.
pub fn ensure_valid(
    set: &AnnotationSet,
    opts: &ValidateOptions,
) -> Result<ValidationReport, DatasetError> {
    let report = validate_set(set, opts);
    if report.passed() {
        Ok(report)
    } else {
        Err(DatasetError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    }
}

fn validate_object(
    record: &Record,
    record_idx: usize,
    object_idx: usize,
    object: &Object,
    report: &mut ValidationReport,
) {
    let context = || IssueContext::Object {
        record: record_idx,
        name: record.name.clone(),
        object: object_idx,
    };

    if object.label.trim().is_empty() {
        report.add(ValidationIssue::error(
            IssueCode::EmptyLabel,
            "Empty label",
            context(),
        ));
    }

    let bbox = &object.bbox;
    if !bbox.is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvalidBBoxOrdering,
            format!("Invalid ordering: {} (min should be <= max)", bbox),
            context(),
        ));
    } else if bbox.area() == 0 {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidBBoxArea,
            format!("Zero area: {}", bbox),
            context(),
        ));
    }

    if record.width > 0 && record.height > 0 && !bbox.fits_within(record.width, record.height) {
        report.add(ValidationIssue::error(
            IssueCode::BBoxOutOfBounds,
            format!(
                "Bounding box {} extends outside image bounds (0, 0, {}, {})",
                bbox, record.width, record.height
            ),
            context(),
        ));
    }

    if let Some(mask) = &object.mask {
        if mask.width() != record.width || mask.height() != record.height {
            report.add(ValidationIssue::error(
                IssueCode::MaskSizeMismatch,
                format!(
                    "Mask is {}x{} but image is {}x{}",
                    mask.width(),
                    mask.height(),
                    record.width,
                    record.height
                ),
                context(),
            ));
        } else if mask.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyMask,
                "Mask has no set pixels",
                context(),
            ));
        }
    }
}
