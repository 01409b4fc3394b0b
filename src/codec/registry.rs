use std::collections::BTreeMap;

use super::{Codec, PascalVocCodec, VggDetectionCodec, VggSegmentationCodec, YoloCodec};
use crate::error::DatasetError;
use crate::ir::io_yolo::BoxAnchor;

/// Named collection of codecs.
///
/// Built once and passed to whoever needs to resolve a format name; there is
/// no global instance. Names iterate in lexicographic order.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Box<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in format.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, Box<dyn Codec>); 5] = [
            ("voc", Box::new(PascalVocCodec)),
            ("yolo", Box::new(YoloCodec::new(BoxAnchor::Center))),
            ("yolo-top-left", Box::new(YoloCodec::new(BoxAnchor::TopLeft))),
            ("vgg", Box::new(VggDetectionCodec)),
            ("vgg-segmentation", Box::new(VggSegmentationCodec)),
        ];
        for (name, codec) in builtins {
            registry.codecs.insert(name.to_string(), codec);
        }
        registry
    }

    /// Adds a codec under `name`. Names are never overwritten.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        codec: Box<dyn Codec>,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if self.codecs.contains_key(&name) {
            return Err(DatasetError::DuplicateFormat(name));
        }
        self.codecs.insert(name, codec);
        Ok(())
    }

    /// Looks up a codec by name.
    pub fn get(&self, name: &str) -> Result<&dyn Codec, DatasetError> {
        self.codecs
            .get(name)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| DatasetError::UnknownFormat(name.to_string()))
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.codecs.keys().map(String::as_str)
    }

    /// `(name, codec)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Codec)> + '_ {
        self.codecs
            .iter()
            .map(|(name, codec)| (name.as_str(), codec.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
