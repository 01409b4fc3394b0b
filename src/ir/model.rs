//! Core annotation model.
//!
//! Every codec decodes into these types and encodes out of them. An
//! [`AnnotationSet`] is a plain ordered value: the position of a record is
//! significant because it decides which shard the record is exported to.

use super::bbox::BBox;
use super::mask::Mask;
use crate::error::DatasetError;

/// An ordered collection of annotated images produced by one decode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSet {
    pub records: Vec<Record>,
}

impl AnnotationSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Iterates over the labels of every object, in record order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .flat_map(|record| record.objects.iter().map(|object| object.label.as_str()))
    }

    /// Total number of objects across all records.
    pub fn object_count(&self) -> usize {
        self.records.iter().map(|record| record.objects.len()).sum()
    }

    /// Total number of objects that carry a mask.
    pub fn mask_count(&self) -> usize {
        self.records
            .iter()
            .flat_map(|record| record.objects.iter())
            .filter(|object| object.mask.is_some())
            .count()
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for AnnotationSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// One image: its identity, dimensions and annotated objects.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Image file name. Source image paths and output file names derive
    /// from it.
    pub name: String,

    /// Image width in pixels, as reported by the image provider.
    pub width: u32,

    /// Image height in pixels, as reported by the image provider.
    pub height: u32,

    /// Number of channels.
    pub depth: u32,

    pub objects: Vec<Object>,
}

impl Record {
    pub fn new(name: impl Into<String>, width: u32, height: u32, depth: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            depth,
            objects: Vec::new(),
        }
    }

    /// Adds an object, builder style.
    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    /// Checks that every mask has the same size as this record's image.
    pub fn check_masks(&self) -> Result<(), DatasetError> {
        for (idx, object) in self.objects.iter().enumerate() {
            let Some(mask) = &object.mask else {
                continue;
            };
            let expected = self.width as usize * self.height as usize;
            let actual = mask.width() as usize * mask.height() as usize;
            if mask.width() != self.width || mask.height() != self.height {
                return Err(DatasetError::LengthMismatch {
                    context: format!(
                        "mask of object {idx} in '{}' ({}x{} mask, {}x{} image)",
                        self.name,
                        mask.width(),
                        mask.height(),
                        self.width,
                        self.height
                    ),
                    left_name: "mask pixels",
                    left: actual,
                    right_name: "image pixels",
                    right: expected,
                });
            }
        }
        Ok(())
    }
}

/// One annotated instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub bbox: BBox,
    pub mask: Option<Mask>,
    pub label: String,
}

impl Object {
    pub fn new(bbox: BBox, label: impl Into<String>) -> Self {
        Self {
            bbox,
            mask: None,
            label: label.into(),
        }
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }
}
