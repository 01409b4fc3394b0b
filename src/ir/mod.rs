//! Canonical annotation model for dataset-maker.
//!
//! Every supported format decodes into an [`AnnotationSet`] and encodes out
//! of one. Boxes are integer pixel rectangles stored as `(y0, x0, y1, x1)`;
//! segmentation detail lives in an optional per-object [`Mask`].
//!
//! # Example
//!
//! ```
//! use dataset_maker::ir::{AnnotationSet, BBox, ClassMap, Object, Record};
//!
//! let set = AnnotationSet::new(vec![
//!     Record::new("cat.png", 640, 480, 3)
//!         .with_object(Object::new(BBox::new(20, 10, 200, 100), "cat")),
//! ]);
//!
//! let classes = ClassMap::from_set(&set);
//! assert_eq!(classes.id("cat"), Some(1));
//! ```

mod bbox;
mod class_map;
pub mod discover;
pub mod image_io;
pub mod io_vgg_json;
pub mod io_voc_xml;
pub mod io_yolo;
mod mask;
mod model;
pub mod polygon;

pub use bbox::{BBox, BoxFractions};
pub use class_map::ClassMap;
pub use image_io::{DiskImages, ImageInfo, ImageProvider, MaskEncoder, PngMaskEncoder};
pub use mask::Mask;
pub use model::{AnnotationSet, Object, Record};
pub use polygon::{Polygon, PolygonError};
