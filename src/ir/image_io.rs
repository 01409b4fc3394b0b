//! Image collaborators used by codecs and the record exporter.
//!
//! The core never decodes pixels itself. Codecs ask an [`ImageProvider`] for
//! image dimensions, the exporter asks it for the encoded file bytes, and
//! masks are compressed through a [`MaskEncoder`].

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageDecoder, ImageFormat, ImageReader};

use super::Mask;
use crate::error::DatasetError;

/// Dimensions and channel count of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Source of image metadata and encoded image bytes.
pub trait ImageProvider {
    /// Reads the dimensions and channel count of the image at `path`.
    fn describe(&self, path: &Path) -> Result<ImageInfo, DatasetError>;

    /// Reads the encoded (compressed) bytes of the image at `path`.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, DatasetError>;
}

/// Turns a binary mask into an encoded image.
pub trait MaskEncoder {
    fn encode_mask(&self, mask: &Mask) -> Result<Vec<u8>, DatasetError>;
}

/// Reads images from the local filesystem.
///
/// `describe` only parses the image header; pixel data is never decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskImages;

impl ImageProvider for DiskImages {
    fn describe(&self, path: &Path) -> Result<ImageInfo, DatasetError> {
        let header_error = |source| DatasetError::ImageInfo {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| header_error(image::ImageError::IoError(err)))?;
        let decoder = reader.into_decoder().map_err(header_error)?;

        let (width, height) = decoder.dimensions();
        let depth = u32::from(decoder.color_type().channel_count());
        Ok(ImageInfo {
            width,
            height,
            depth,
        })
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, DatasetError> {
        fs::read(path).map_err(|source| DatasetError::ImageReadError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Encodes masks as 8-bit grayscale PNG with pixel values 0 and 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngMaskEncoder;

impl MaskEncoder for PngMaskEncoder {
    fn encode_mask(&self, mask: &Mask) -> Result<Vec<u8>, DatasetError> {
        let buffer = GrayImage::from_raw(mask.width(), mask.height(), mask.as_raw().to_vec())
            .ok_or_else(|| DatasetError::MaskEncode {
                message: format!(
                    "buffer does not match {}x{} mask",
                    mask.width(),
                    mask.height()
                ),
            })?;

        let mut bytes = Vec::new();
        buffer
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| DatasetError::MaskEncode {
                message: err.to_string(),
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
        let row_stride = (width * 3).div_ceil(4) * 4;
        let pixel_array_size = row_stride * height;
        let file_size = 54 + pixel_array_size;

        let mut bytes = Vec::with_capacity(file_size as usize);
        bytes.extend_from_slice(b"BM");
        bytes.extend_from_slice(&file_size.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&54u32.to_le_bytes());

        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(&(width as i32).to_le_bytes());
        bytes.extend_from_slice(&(height as i32).to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&24u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
        bytes.extend_from_slice(&2835u32.to_le_bytes());
        bytes.extend_from_slice(&2835u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        bytes.resize(file_size as usize, 0);
        bytes
    }

    #[test]
    fn describe_reads_header_of_bmp() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.png");
        // Content sniffing wins over the misleading extension.
        fs::write(&path, bmp_bytes(12, 7)).expect("write bmp");

        let info = DiskImages.describe(&path).expect("describe image");
        assert_eq!(
            info,
            ImageInfo {
                width: 12,
                height: 7,
                depth: 3
            }
        );
    }

    #[test]
    fn read_bytes_reports_missing_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = DiskImages
            .read_bytes(&temp.path().join("missing.jpg"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::ImageReadError { .. }));
    }

    #[test]
    fn describe_reports_header_error_for_missing_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("missing.png");
        match DiskImages.describe(&path).unwrap_err() {
            DatasetError::ImageInfo { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected ImageInfo, got {other:?}"),
        }
    }

    #[test]
    fn png_mask_encoding_roundtrips_through_image() {
        let mut mask = Mask::new(5, 3);
        mask.fill_span(1, 1, 3);

        let bytes = PngMaskEncoder.encode_mask(&mask).expect("encode mask");
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .expect("decode png")
            .to_luma8();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.as_raw().as_slice(), mask.as_raw());
    }
}
