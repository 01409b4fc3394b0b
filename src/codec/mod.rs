//! Format codecs and the registry that names them.
//!
//! A [`Codec`] converts between one on-disk annotation format and the
//! canonical [`AnnotationSet`]. Codecs are stateless; everything a decode
//! needs (including the image provider) is passed in.

mod registry;

pub use registry::CodecRegistry;

use std::fmt;
use std::path::Path;

use crate::error::DatasetError;
use crate::ir::io_yolo::BoxAnchor;
use crate::ir::{io_vgg_json, io_voc_xml, io_yolo, AnnotationSet, ImageProvider};

/// How much of the canonical model a format can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lossiness {
    /// Format can represent everything in the model (round-trip safe).
    Lossless,
    /// Format may lose some information depending on the set's content.
    Conditional,
    /// Format always loses some information.
    Lossy,
}

impl fmt::Display for Lossiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Lossiness::Lossless => "lossless",
            Lossiness::Conditional => "conditional",
            Lossiness::Lossy => "lossy",
        })
    }
}

/// A bidirectional converter between one on-disk format and the model.
pub trait Codec: Send + Sync {
    /// One-line human-readable description.
    fn description(&self) -> &'static str;

    /// How lossy an encode-then-decode round trip is.
    fn lossiness(&self) -> Lossiness;

    /// Reads annotations at `annotations` whose images live in `image_dir`.
    fn decode(
        &self,
        image_dir: &Path,
        annotations: &Path,
        images: &dyn ImageProvider,
    ) -> Result<AnnotationSet, DatasetError>;

    /// Writes `set` into `output_dir`, creating it if needed.
    fn encode(&self, output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError>;
}

/// Pascal VOC: one XML file per image, boxes only.
#[derive(Clone, Copy, Debug, Default)]
pub struct PascalVocCodec;

impl Codec for PascalVocCodec {
    fn description(&self) -> &'static str {
        "Pascal VOC XML, one file per image"
    }

    fn lossiness(&self) -> Lossiness {
        Lossiness::Conditional
    }

    fn decode(
        &self,
        image_dir: &Path,
        annotations: &Path,
        images: &dyn ImageProvider,
    ) -> Result<AnnotationSet, DatasetError> {
        log::info!("decoding Pascal VOC from {}", annotations.display());
        let set = io_voc_xml::read_voc(image_dir, annotations, images)?;
        log_decoded("voc", &set);
        Ok(set)
    }

    fn encode(&self, output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
        warn_dropped_masks("voc", set);
        io_voc_xml::write_voc(output_dir, set)?;
        log_encoded("voc", set, output_dir);
        Ok(())
    }
}

/// YOLO text labels with a fixed [`BoxAnchor`].
#[derive(Clone, Copy, Debug, Default)]
pub struct YoloCodec {
    anchor: BoxAnchor,
}

impl YoloCodec {
    pub fn new(anchor: BoxAnchor) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> BoxAnchor {
        self.anchor
    }
}

impl Codec for YoloCodec {
    fn description(&self) -> &'static str {
        match self.anchor {
            BoxAnchor::Center => "YOLO text labels (center x, center y, width, height)",
            BoxAnchor::TopLeft => "YOLO text labels (top-left x, top-left y, width, height)",
        }
    }

    fn lossiness(&self) -> Lossiness {
        Lossiness::Lossy
    }

    fn decode(
        &self,
        image_dir: &Path,
        annotations: &Path,
        images: &dyn ImageProvider,
    ) -> Result<AnnotationSet, DatasetError> {
        log::info!(
            "decoding YOLO ({:?} anchor) from {}",
            self.anchor,
            annotations.display()
        );
        let set = io_yolo::read_yolo(image_dir, annotations, images, self.anchor)?;
        log_decoded("yolo", &set);
        Ok(set)
    }

    fn encode(&self, output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
        warn_dropped_masks("yolo", set);
        io_yolo::write_yolo(output_dir, set, self.anchor)?;
        log_encoded("yolo", set, output_dir);
        Ok(())
    }
}

/// VGG JSON read as boxes only.
#[derive(Clone, Copy, Debug, Default)]
pub struct VggDetectionCodec;

impl Codec for VggDetectionCodec {
    fn description(&self) -> &'static str {
        "VGG Image Annotator JSON, polygons read as boxes"
    }

    fn lossiness(&self) -> Lossiness {
        Lossiness::Conditional
    }

    fn decode(
        &self,
        image_dir: &Path,
        annotations: &Path,
        images: &dyn ImageProvider,
    ) -> Result<AnnotationSet, DatasetError> {
        log::info!("decoding VGG JSON from {}", annotations.display());
        let set = io_vgg_json::read_vgg(image_dir, annotations, images, false)?;
        log_decoded("vgg", &set);
        Ok(set)
    }

    fn encode(&self, output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
        warn_dropped_masks("vgg", set);
        io_vgg_json::write_vgg(output_dir, set)?;
        log_encoded("vgg", set, output_dir);
        Ok(())
    }
}

/// VGG JSON with region polygons rasterized into masks.
///
/// Encoding writes rectangles, so masks do not survive a round trip.
#[derive(Clone, Copy, Debug, Default)]
pub struct VggSegmentationCodec;

impl Codec for VggSegmentationCodec {
    fn description(&self) -> &'static str {
        "VGG Image Annotator JSON, polygons rasterized into masks"
    }

    fn lossiness(&self) -> Lossiness {
        Lossiness::Lossy
    }

    fn decode(
        &self,
        image_dir: &Path,
        annotations: &Path,
        images: &dyn ImageProvider,
    ) -> Result<AnnotationSet, DatasetError> {
        log::info!(
            "decoding VGG JSON with masks from {}",
            annotations.display()
        );
        let set = io_vgg_json::read_vgg(image_dir, annotations, images, true)?;
        log_decoded("vgg-segmentation", &set);
        Ok(set)
    }

    fn encode(&self, output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
        warn_dropped_masks("vgg-segmentation", set);
        io_vgg_json::write_vgg(output_dir, set)?;
        log_encoded("vgg-segmentation", set, output_dir);
        Ok(())
    }
}

fn log_decoded(format: &str, set: &AnnotationSet) {
    log::info!(
        "decoded {} record(s), {} object(s), {} mask(s) as {format}",
        set.len(),
        set.object_count(),
        set.mask_count()
    );
}

fn log_encoded(format: &str, set: &AnnotationSet, output_dir: &Path) {
    log::info!(
        "encoded {} record(s), {} object(s) as {format} into {}",
        set.len(),
        set.object_count(),
        output_dir.display()
    );
}

fn warn_dropped_masks(format: &str, set: &AnnotationSet) {
    let masks = set.mask_count();
    if masks > 0 {
        log::warn!("{format} cannot store masks; dropping {masks} mask(s), boxes are kept");
    }
}
