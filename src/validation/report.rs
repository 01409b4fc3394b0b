//! Findings collected while checking a decoded annotation set.

use std::fmt;

use serde::Serialize;

/// Everything [`validate_set`](super::validate_set) found in one set.
///
/// The report remembers whether it was produced in strict mode, so
/// [`passed`](Self::passed) gives the same answer the CLI exit code does.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub records_checked: usize,
    pub objects_checked: usize,
    pub strict: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    #[inline]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    #[inline]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// No errors, and no warnings either when the report is strict.
    pub fn passed(&self) -> bool {
        self.error_count() == 0 && !(self.strict && self.warning_count() > 0)
    }

    /// Issues raised for the record at `index`, including its objects.
    pub fn for_record(&self, index: usize) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues
            .iter()
            .filter(move |issue| issue.context.record_index() == Some(index))
    }

    /// Renders the report as pretty JSON with counts up front.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            passed: bool,
            error_count: usize,
            warning_count: usize,
            #[serde(flatten)]
            report: &'a ValidationReport,
        }

        serde_json::to_string_pretty(&JsonReport {
            passed: self.passed(),
            error_count: self.error_count(),
            warning_count: self.warning_count(),
            report: self,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "passed" } else { "failed" };
        writeln!(
            f,
            "Validation {}: {} record(s), {} object(s) checked{}",
            verdict,
            self.records_checked,
            self.objects_checked,
            if self.strict { " (strict)" } else { "" }
        )?;

        if self.issues.is_empty() {
            return Ok(());
        }

        writeln!(
            f,
            "{} error(s), {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// One finding, tied to the set, a record or an object.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message, context)
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {:?} at {}: {}",
            self.severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but still convertible and exportable.
    Warning,
    /// The record would produce wrong or unreadable output.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable identifiers for each kind of finding; JSON output uses the
/// variant name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// The set holds no records.
    EmptySet,

    // Records
    /// Zero width or height.
    InvalidImageDimensions,
    EmptyRecordName,
    /// Several records share a name.
    DuplicateRecordName,

    // Objects
    /// Empty or blank label.
    EmptyLabel,
    /// `y0 > y1` or `x0 > x1`.
    InvalidBBoxOrdering,
    /// Box reaches past the image edge.
    BBoxOutOfBounds,
    /// Box with zero width or height.
    InvalidBBoxArea,

    // Masks
    /// Mask size differs from the image size.
    MaskSizeMismatch,
    /// Mask has no set pixels.
    EmptyMask,
}

/// Where in the set a finding applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueContext {
    Set,
    Record {
        index: usize,
        name: String,
    },
    Object {
        record: usize,
        name: String,
        object: usize,
    },
}

impl IssueContext {
    /// Position of the record this finding belongs to, if any.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            IssueContext::Set => None,
            IssueContext::Record { index, .. } => Some(*index),
            IssueContext::Object { record, .. } => Some(*record),
        }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Set => f.write_str("set"),
            IssueContext::Record { index, name } => write!(f, "{name} (record {index})"),
            IssueContext::Object {
                record,
                name,
                object,
            } => write!(f, "{name} (record {record}, object {object})"),
        }
    }
}
