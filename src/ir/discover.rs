//! Shared rules for locating annotation files and the images they reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DatasetError;
use crate::ir::AnnotationSet;

/// Image extensions tried, in order, when an image is referenced by stem.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "PNG", "jpg", "JPG", "jpeg", "JPEG"];

/// Returns `name` without a trailing known image extension.
///
/// Only one extension is removed, so `a.png.jpg` becomes `a.png`.
pub fn strip_image_extension(name: &str) -> &str {
    for ext in IMAGE_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ext).and_then(|s| s.strip_suffix('.')) {
            return stem;
        }
    }
    name
}

/// Returns every file with `extension` directly inside `location`.
///
/// `location` may also be a single file, which is returned as-is. The result
/// is sorted by file name and is never empty: a location without candidates
/// fails with `MissingAnnotationSource`.
pub fn annotation_files(location: &Path, extension: &str) -> Result<Vec<PathBuf>, DatasetError> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }

    let missing = || DatasetError::MissingAnnotationSource {
        path: location.to_path_buf(),
        extension: extension.to_string(),
    };

    if !location.is_dir() {
        return Err(missing());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(location).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| DatasetError::Io(source.into()))?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.path().to_path_buf());
        }
    }

    if files.is_empty() {
        return Err(missing());
    }

    files.sort_by_cached_key(|path| file_name_string(path));
    log::debug!(
        "found {} .{} file(s) in {}",
        files.len(),
        extension,
        location.display()
    );
    Ok(files)
}

/// Returns the single file with `extension` at `location`.
///
/// `location` may be the file itself. A directory must contain exactly one
/// candidate, otherwise `MissingAnnotationSource` or
/// `AmbiguousAnnotationSource` is returned.
pub fn single_annotation_file(location: &Path, extension: &str) -> Result<PathBuf, DatasetError> {
    let mut files = annotation_files(location, extension)?;
    if files.len() > 1 {
        return Err(DatasetError::AmbiguousAnnotationSource {
            path: location.to_path_buf(),
            extension: extension.to_string(),
            candidates: files,
        });
    }
    Ok(files.remove(0))
}

/// Resolves an image referenced by its full file name.
pub fn image_path(image_dir: &Path, name: &str) -> Result<PathBuf, DatasetError> {
    let path = image_dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(DatasetError::MissingImage {
            dir: image_dir.to_path_buf(),
            name: name.to_string(),
        })
    }
}

/// Index of the images in one directory, keyed by file stem.
#[derive(Debug)]
pub struct ImageIndex {
    dir: PathBuf,
    by_stem: BTreeMap<String, Vec<PathBuf>>,
}

impl ImageIndex {
    /// Scans `dir` (non-recursively) for files with an allowed extension.
    pub fn scan(dir: &Path) -> Result<Self, DatasetError> {
        let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        if dir.is_dir() {
            for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
                let entry = entry.map_err(|source| DatasetError::Io(source.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = file_name_string(entry.path());
                let stem = strip_image_extension(&name);
                if stem.len() != name.len() {
                    by_stem
                        .entry(stem.to_string())
                        .or_default()
                        .push(entry.path().to_path_buf());
                }
            }
        }

        for candidates in by_stem.values_mut() {
            candidates.sort();
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            by_stem,
        })
    }

    /// Finds the one image whose name is `stem` plus an allowed extension.
    pub fn resolve(&self, stem: &str) -> Result<PathBuf, DatasetError> {
        match self.by_stem.get(stem).map(Vec::as_slice) {
            None | Some([]) => Err(DatasetError::MissingImage {
                dir: self.dir.clone(),
                name: stem.to_string(),
            }),
            Some([single]) => Ok(single.clone()),
            Some(many) => Err(DatasetError::AmbiguousImage {
                dir: self.dir.clone(),
                name: stem.to_string(),
                candidates: many.to_vec(),
            }),
        }
    }
}

/// Returns the output path `output_for` assigns to each record, in set order.
///
/// Fails with `DuplicateRecord` on the first two records that share a path,
/// so a writer can check the whole set before creating any file.
pub fn distinct_outputs<F>(set: &AnnotationSet, output_for: F) -> Result<Vec<PathBuf>, DatasetError>
where
    F: Fn(&str) -> PathBuf,
{
    let mut owners: BTreeMap<PathBuf, &str> = BTreeMap::new();
    let mut paths = Vec::with_capacity(set.len());

    for record in set {
        let path = output_for(&record.name);
        if let Some(first) = owners.insert(path.clone(), &record.name) {
            return Err(DatasetError::DuplicateRecord {
                path,
                first: first.to_string(),
                second: record.name.clone(),
            });
        }
        paths.push(path);
    }

    Ok(paths)
}

/// Returns the final path component as a string, or an empty string.
pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the file name without its last extension.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
