#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use dataset_maker::ir::{AnnotationSet, BBox, ImageInfo, ImageProvider, Object, Record};
use dataset_maker::DatasetError;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Serves image dimensions from the set itself, keyed by file name.
///
/// The image files only need to exist; their contents are never read.
pub struct KnownImages(BTreeMap<String, (u32, u32)>);

impl KnownImages {
    pub fn from_set(set: &AnnotationSet) -> Self {
        Self(
            set.iter()
                .map(|record| (record.name.clone(), (record.width, record.height)))
                .collect(),
        )
    }

    /// Creates an empty placeholder file for every known image.
    pub fn materialize(&self, dir: &Path) {
        fs::create_dir_all(dir).expect("create image dir");
        for name in self.0.keys() {
            fs::write(dir.join(name), b"").expect("write placeholder image");
        }
    }
}

impl ImageProvider for KnownImages {
    fn describe(&self, path: &Path) -> Result<ImageInfo, DatasetError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (width, height) = self.0.get(&name).copied().ok_or_else(|| DatasetError::MissingImage {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            name,
        })?;
        Ok(ImageInfo {
            width,
            height,
            depth: 3,
        })
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, DatasetError> {
        fs::read(path).map_err(DatasetError::Io)
    }
}

pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        Just("cat".to_string()),
        Just("dog".to_string()),
        Just("traffic light".to_string()),
        "[a-z][a-z0-9_]{0,8}",
    ]
    .boxed()
}

/// A box with ordered corners inside a `width` x `height` image.
pub fn arb_bbox(width: u32, height: u32) -> BoxedStrategy<BBox> {
    (0..=width as i64, 0..=width as i64, 0..=height as i64, 0..=height as i64)
        .prop_map(|(xa, xb, ya, yb)| BBox::from_corners(ya, xa, yb, xb))
        .boxed()
}

pub fn arb_record(index: usize, max_objects: usize) -> BoxedStrategy<Record> {
    (1u32..=640, 1u32..=480, prop::bool::ANY)
        .prop_flat_map(move |(width, height, png)| {
            let name = format!("img_{index:03}.{}", if png { "png" } else { "jpg" });
            prop::collection::vec(
                (arb_bbox(width, height), arb_label()).prop_map(|(bbox, label)| Object::new(bbox, label)),
                0..=max_objects,
            )
            .prop_map(move |objects| {
                let mut record = Record::new(name.clone(), width, height, 3);
                record.objects = objects;
                record
            })
        })
        .boxed()
}

/// A set of up to `max_records` records with distinct names.
pub fn arb_set(max_records: usize, max_objects: usize) -> BoxedStrategy<AnnotationSet> {
    (1..=max_records)
        .prop_flat_map(move |count| {
            (0..count)
                .map(|index| arb_record(index, max_objects))
                .collect::<Vec<_>>()
        })
        .prop_map(AnnotationSet::new)
        .boxed()
}

/// Records sorted by name, for comparisons that ignore file order.
pub fn sorted_records(set: &AnnotationSet) -> Vec<Record> {
    let mut records = set.records.clone();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    records
}

/// Largest per-axis distance between matching boxes, or an error on a
/// structural mismatch.
pub fn max_box_distance(left: &AnnotationSet, right: &AnnotationSet) -> Result<i64, String> {
    let left = sorted_records(left);
    let right = sorted_records(right);
    if left.len() != right.len() {
        return Err(format!(
            "record count mismatch: left={} right={}",
            left.len(),
            right.len()
        ));
    }

    let mut worst = 0;
    for (a, b) in left.iter().zip(&right) {
        if a.name != b.name || a.objects.len() != b.objects.len() {
            return Err(format!("record mismatch: {} vs {}", a.name, b.name));
        }
        for (oa, ob) in a.objects.iter().zip(&b.objects) {
            if oa.label != ob.label {
                return Err(format!("label mismatch in {}: {} vs {}", a.name, oa.label, ob.label));
            }
            worst = worst
                .max((oa.bbox.x0 - ob.bbox.x0).abs())
                .max((oa.bbox.y0 - ob.bbox.y0).abs())
                .max((oa.bbox.x1 - ob.bbox.x1).abs())
                .max((oa.bbox.y1 - ob.bbox.y1).abs());
        }
    }
    Ok(worst)
}
