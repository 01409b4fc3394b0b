use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use prost::Message;

use super::example::{Example, Feature};
use super::writer::ShardedRecordWriter;
use crate::error::DatasetError;
use crate::ir::{AnnotationSet, ClassMap, ImageProvider, Mask, MaskEncoder, Record};

/// Shard file prefix used when none is given.
pub const DEFAULT_SHARD_PREFIX: &str = "dataset.record";

/// Settings for one export run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Number of shard files, at least 1.
    pub num_shards: usize,
    /// Shard file name prefix.
    pub prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            num_shards: 1,
            prefix: DEFAULT_SHARD_PREFIX.to_string(),
        }
    }
}

/// What an export wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub records: usize,
    pub objects: usize,
    pub masks: usize,
    pub shard_paths: Vec<PathBuf>,
    pub records_per_shard: Vec<usize>,
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported {} record(s), {} object(s), {} mask(s) into {} shard(s):",
            self.records,
            self.objects,
            self.masks,
            self.shard_paths.len()
        )?;
        for (path, count) in self.shard_paths.iter().zip(&self.records_per_shard) {
            writeln!(f, "  {}: {} record(s)", path.display(), count)?;
        }
        Ok(())
    }
}

/// Turns an annotation set into sharded `tf.train.Example` records.
pub struct RecordExporter<'a> {
    images: &'a dyn ImageProvider,
    masks: &'a dyn MaskEncoder,
}

impl<'a> RecordExporter<'a> {
    pub fn new(images: &'a dyn ImageProvider, masks: &'a dyn MaskEncoder) -> Self {
        Self { images, masks }
    }

    /// Builds the Example for one record.
    ///
    /// The image is read from `image_dir/record.name`. `image/object/mask` is
    /// always present: empty when no object has a mask, otherwise one PNG per
    /// object (blank for objects without one) so it lines up with the box
    /// lists.
    pub fn build_example(
        &self,
        image_dir: &Path,
        record: &Record,
        classes: &ClassMap,
    ) -> Result<Example, DatasetError> {
        record.check_masks()?;

        let encoded = self.images.read_bytes(&image_dir.join(&record.name))?;
        let format = record.name.rsplit('.').next().unwrap_or_default();

        let n = record.objects.len();
        let mut xmins = Vec::with_capacity(n);
        let mut xmaxs = Vec::with_capacity(n);
        let mut ymins = Vec::with_capacity(n);
        let mut ymaxs = Vec::with_capacity(n);
        let mut class_text = Vec::with_capacity(n);
        let mut class_ids = Vec::with_capacity(n);

        for object in &record.objects {
            let fractions = object.bbox.to_fractions(record.width, record.height);
            xmins.push(fractions.xmin as f32);
            xmaxs.push(fractions.xmax as f32);
            ymins.push(fractions.ymin as f32);
            ymaxs.push(fractions.ymax as f32);
            class_ids.push(classes.require(&object.label)?);
            class_text.push(object.label.as_bytes().to_vec());
        }

        let mut feature = BTreeMap::new();
        feature.insert("image/height".to_string(), Feature::int64(record.height.into()));
        feature.insert("image/width".to_string(), Feature::int64(record.width.into()));
        feature.insert("image/filename".to_string(), Feature::bytes(record.name.as_bytes()));
        feature.insert("image/source_id".to_string(), Feature::bytes(record.name.as_bytes()));
        feature.insert("image/encoded".to_string(), Feature::bytes(encoded));
        feature.insert("image/format".to_string(), Feature::bytes(format.as_bytes()));
        feature.insert("image/object/bbox/xmin".to_string(), Feature::float_list(xmins));
        feature.insert("image/object/bbox/xmax".to_string(), Feature::float_list(xmaxs));
        feature.insert("image/object/bbox/ymin".to_string(), Feature::float_list(ymins));
        feature.insert("image/object/bbox/ymax".to_string(), Feature::float_list(ymaxs));
        feature.insert("image/object/class/text".to_string(), Feature::bytes_list(class_text));
        feature.insert("image/object/class/label".to_string(), Feature::int64_list(class_ids));

        let masks = if record.objects.iter().any(|object| object.mask.is_some()) {
            let blank = Mask::new(record.width, record.height);
            record
                .objects
                .iter()
                .map(|object| self.masks.encode_mask(object.mask.as_ref().unwrap_or(&blank)))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        feature.insert("image/object/mask".to_string(), Feature::bytes_list(masks));

        Ok(Example::from_features(feature))
    }

    /// Writes every record of `set`, in order, across the configured shards.
    ///
    /// Record `i` lands in shard `i % num_shards`. On failure the shards are
    /// closed, keeping what was already written, and the error is returned.
    pub fn export(
        &self,
        set: &AnnotationSet,
        classes: &ClassMap,
        image_dir: &Path,
        output_dir: &Path,
        options: &ExportOptions,
    ) -> Result<ExportSummary, DatasetError> {
        let mut writer = ShardedRecordWriter::new(output_dir, &options.prefix, options.num_shards)?;

        for (idx, record) in set.iter().enumerate() {
            let written = self
                .build_example(image_dir, record, classes)
                .and_then(|example| writer.write(idx, &example.encode_to_vec()));

            if let Err(err) = written {
                log::warn!(
                    "export stopped at record {idx} ('{}'); {idx} record(s) already written to {}",
                    record.name,
                    output_dir.display()
                );
                if let Err(close_err) = writer.close() {
                    log::warn!("failed to close shards after error: {close_err}");
                }
                return Err(err);
            }
            log::debug!("wrote record {idx} ('{}')", record.name);
        }

        writer.close()?;

        let summary = ExportSummary {
            records: set.len(),
            objects: set.object_count(),
            masks: set.mask_count(),
            shard_paths: writer.paths().to_vec(),
            records_per_shard: writer.record_counts().to_vec(),
        };
        log::info!(
            "exported {} record(s) into {} shard(s) in {}",
            summary.records,
            summary.shard_paths.len(),
            output_dir.display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BBox, ImageInfo, Object, PngMaskEncoder};

    /// Serves fixed bytes for every path.
    struct FixedImages(Vec<u8>);

    impl ImageProvider for FixedImages {
        fn describe(&self, _path: &Path) -> Result<ImageInfo, DatasetError> {
            Ok(ImageInfo {
                width: 20,
                height: 20,
                depth: 3,
            })
        }

        fn read_bytes(&self, _path: &Path) -> Result<Vec<u8>, DatasetError> {
            Ok(self.0.clone())
        }
    }

    fn floats(example: &Example, key: &str) -> Vec<f32> {
        example
            .get(key)
            .and_then(Feature::as_floats)
            .expect("float feature")
            .to_vec()
    }

    #[test]
    fn build_example_fills_every_key() {
        let images = FixedImages(b"jpeg bytes".to_vec());
        let exporter = RecordExporter::new(&images, &PngMaskEncoder);
        let record = Record::new("photo.final.jpg", 20, 20, 3)
            .with_object(Object::new(BBox::new(2, 3, 10, 9), "dog"))
            .with_object(Object::new(BBox::new(0, 0, 20, 20), "cat"));
        let classes = ClassMap::build(["cat", "dog"]);

        let example = exporter
            .build_example(Path::new("imgs"), &record, &classes)
            .expect("build example");

        assert_eq!(
            example.get("image/format").and_then(Feature::as_bytes_list),
            Some(&[b"jpg".to_vec()][..])
        );
        assert_eq!(
            example.get("image/encoded").and_then(Feature::as_bytes_list),
            Some(&[b"jpeg bytes".to_vec()][..])
        );
        assert_eq!(
            example.get("image/object/class/label").and_then(Feature::as_int64s),
            Some(&[2, 1][..])
        );
        assert_eq!(floats(&example, "image/object/bbox/xmin"), vec![0.15, 0.0]);
        assert_eq!(floats(&example, "image/object/bbox/ymax"), vec![0.5, 1.0]);
        assert_eq!(
            example.get("image/object/mask").and_then(Feature::as_bytes_list),
            Some(&[][..])
        );
    }

    #[test]
    fn masks_are_png_encoded_and_aligned() {
        let images = FixedImages(Vec::new());
        let exporter = RecordExporter::new(&images, &PngMaskEncoder);
        let mut mask = Mask::new(20, 20);
        mask.fill_span(4, 3, 9);
        let record = Record::new("a.png", 20, 20, 3)
            .with_object(Object::new(BBox::new(4, 3, 5, 9), "cat").with_mask(mask))
            .with_object(Object::new(BBox::new(0, 0, 1, 1), "cat"));

        let example = exporter
            .build_example(Path::new("."), &record, &ClassMap::build(["cat"]))
            .expect("build example");
        let masks = example
            .get("image/object/mask")
            .and_then(Feature::as_bytes_list)
            .expect("mask feature");
        assert_eq!(masks.len(), 2);
        for png in masks {
            assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        }
    }

    #[test]
    fn unknown_label_and_bad_mask_fail() {
        let images = FixedImages(Vec::new());
        let exporter = RecordExporter::new(&images, &PngMaskEncoder);
        let classes = ClassMap::build(["cat"]);

        let record = Record::new("a.png", 20, 20, 3)
            .with_object(Object::new(BBox::new(0, 0, 1, 1), "zebra"));
        assert!(matches!(
            exporter.build_example(Path::new("."), &record, &classes),
            Err(DatasetError::UnknownLabel { .. })
        ));

        let record = Record::new("a.png", 20, 20, 3)
            .with_object(Object::new(BBox::new(0, 0, 1, 1), "cat").with_mask(Mask::new(5, 5)));
        assert!(matches!(
            exporter.build_example(Path::new("."), &record, &classes),
            Err(DatasetError::LengthMismatch { .. })
        ));
    }
}
