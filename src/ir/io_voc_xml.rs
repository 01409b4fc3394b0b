//! Pascal VOC XML reader and writer.
//!
//! One XML document per image. The reader takes a directory of `.xml` files
//! (or a single file) and looks up the referenced image in the image
//! directory to obtain its dimensions; the `<size>` element is written for
//! other tools but not trusted on read.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::discover::{self, file_name_string, strip_image_extension};
use super::image_io::ImageProvider;
use super::model::{AnnotationSet, Object, Record};
use super::BBox;
use crate::error::DatasetError;

const VOC_XML_EXTENSION: &str = "xml";

/// Read a directory of VOC XML files into an annotation set.
///
/// Files are processed in file name order. Each `<filename>` (or the legacy
/// `<file>`) must name an image inside `image_dir`.
pub fn read_voc(
    image_dir: &Path,
    annotations: &Path,
    images: &dyn ImageProvider,
) -> Result<AnnotationSet, DatasetError> {
    let xml_files = discover::annotation_files(annotations, VOC_XML_EXTENSION)?;

    let mut seen = BTreeSet::new();
    let mut records = Vec::with_capacity(xml_files.len());

    for xml_path in xml_files {
        let parsed = parse_voc_xml(&xml_path)?;
        if !seen.insert(parsed.filename.clone()) {
            return Err(DatasetError::MalformedAnnotation {
                path: xml_path,
                message: format!(
                    "duplicate <filename> '{}' found in multiple XML files",
                    parsed.filename
                ),
            });
        }

        let image_path = discover::image_path(image_dir, &parsed.filename)?;
        let info = images.describe(&image_path)?;

        let mut record = Record::new(parsed.filename, info.width, info.height, info.depth);
        record.objects = parsed
            .objects
            .into_iter()
            .map(|object| Object::new(object.bbox, object.name))
            .collect();

        log::debug!(
            "parsed {} ({} object(s))",
            xml_path.display(),
            record.objects.len()
        );
        records.push(record);
    }

    Ok(AnnotationSet::new(records))
}

/// Write one VOC XML file per record into `output_dir`.
///
/// The file name is the record name with its image extension replaced by
/// `.xml`, and `<folder>` is the last component of `output_dir`. Records
/// that would share a file fail with `DuplicateRecord` before anything is
/// written.
pub fn write_voc(output_dir: &Path, set: &AnnotationSet) -> Result<(), DatasetError> {
    let xml_paths = discover::distinct_outputs(set, |name: &str| {
        output_dir.join(format!(
            "{}.{}",
            strip_image_extension(name),
            VOC_XML_EXTENSION
        ))
    })?;

    fs::create_dir_all(output_dir).map_err(DatasetError::Io)?;
    let folder = file_name_string(output_dir);

    for (record, xml_path) in set.iter().zip(xml_paths) {
        fs::write(&xml_path, to_voc_xml_string(record, &folder)).map_err(DatasetError::Io)?;
        log::debug!("wrote {}", xml_path.display());
    }

    Ok(())
}

/// Render one record as a VOC XML document.
pub fn to_voc_xml_string(record: &Record, folder: &str) -> String {
    let mut xml = String::new();

    writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>").expect("write to string");
    writeln!(xml, "<annotation>").expect("write to string");
    writeln!(xml, "  <folder>{}</folder>", xml_escape(folder)).expect("write to string");
    writeln!(xml, "  <filename>{}</filename>", xml_escape(&record.name))
        .expect("write to string");
    writeln!(xml, "  <size>").expect("write to string");
    writeln!(xml, "    <width>{}</width>", record.width).expect("write to string");
    writeln!(xml, "    <height>{}</height>", record.height).expect("write to string");
    writeln!(xml, "    <depth>{}</depth>", record.depth).expect("write to string");
    writeln!(xml, "  </size>").expect("write to string");

    for object in &record.objects {
        writeln!(xml, "  <object>").expect("write to string");
        writeln!(xml, "    <name>{}</name>", xml_escape(&object.label)).expect("write to string");
        writeln!(xml, "    <bndbox>").expect("write to string");
        writeln!(xml, "      <xmin>{}</xmin>", object.bbox.x0).expect("write to string");
        writeln!(xml, "      <ymin>{}</ymin>", object.bbox.y0).expect("write to string");
        writeln!(xml, "      <xmax>{}</xmax>", object.bbox.x1).expect("write to string");
        writeln!(xml, "      <ymax>{}</ymax>", object.bbox.y1).expect("write to string");
        writeln!(xml, "    </bndbox>").expect("write to string");
        writeln!(xml, "  </object>").expect("write to string");
    }

    writeln!(xml, "</annotation>").expect("write to string");
    xml
}

/// Parse VOC XML from a UTF-8 string.
///
/// This helper is primarily useful for testing/fuzzing parse behavior in-memory.
pub fn from_voc_xml_str(xml: &str) -> Result<(), DatasetError> {
    parse_voc_xml_str(xml, Path::new("<memory>"))?;
    Ok(())
}

/// Parse VOC XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<(), DatasetError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| DatasetError::MalformedAnnotation {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_voc_xml_str(xml)
}

#[derive(Debug)]
struct ParsedVocAnnotation {
    filename: String,
    objects: Vec<ParsedVocObject>,
}

#[derive(Debug)]
struct ParsedVocObject {
    name: String,
    bbox: BBox,
}

fn parse_voc_xml(path: &Path) -> Result<ParsedVocAnnotation, DatasetError> {
    let xml = fs::read_to_string(path).map_err(DatasetError::Io)?;
    parse_voc_xml_str(&xml, path)
}

fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<ParsedVocAnnotation, DatasetError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| DatasetError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(malformed(path, "missing <annotation> root element".to_string()));
    }

    let filename = optional_child_text(annotation, "filename")
        .or_else(|| optional_child_text(annotation, "file"))
        .ok_or_else(|| malformed(path, "missing <filename> in <annotation>".to_string()))?;

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let name = required_child_text(object, "name", path, "<object>")?;
        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;

        let xmin = parse_required_coord(bndbox, "xmin", path)?;
        let ymin = parse_required_coord(bndbox, "ymin", path)?;
        let xmax = parse_required_coord(bndbox, "xmax", path)?;
        let ymax = parse_required_coord(bndbox, "ymax", path)?;

        objects.push(ParsedVocObject {
            name,
            bbox: BBox::new(ymin, xmin, ymax, xmax),
        });
    }

    Ok(ParsedVocAnnotation { filename, objects })
}

fn malformed(path: &Path, message: String) -> DatasetError {
    DatasetError::MalformedAnnotation {
        path: path.to_path_buf(),
        message,
    }
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, DatasetError> {
    child_element(node, tag).ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, DatasetError> {
    optional_child_text(node, tag).ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

/// Parses a pixel coordinate. Integral decimals such as `12.0` are accepted;
/// fractional values are rejected rather than rounded.
fn parse_required_coord(node: Node<'_, '_>, tag: &str, path: &Path) -> Result<i64, DatasetError> {
    let raw = required_child_text(node, tag, path, "<bndbox>")?;
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Err(malformed(
            path,
            format!("invalid <{tag}> value '{raw}' in <bndbox>; expected an integer"),
        )),
    }
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <folder>images</folder>
  <filename>img1.jpg</filename>
  <size>
    <width>640</width>
    <height>480</height>
    <depth>3</depth>
  </size>
  <object>
    <name>cat</name>
    <pose>Unspecified</pose>
    <bndbox>
      <xmin>10</xmin>
      <ymin>20</ymin>
      <xmax>30.0</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
  <object>
    <name>dog &amp; friend</name>
    <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox>
  </object>
</annotation>"#;

    #[test]
    fn parse_voc_xml_extracts_boxes_and_labels() {
        let parsed = parse_voc_xml_str(SAMPLE, Path::new("sample.xml")).expect("parse xml");
        assert_eq!(parsed.filename, "img1.jpg");
        assert_eq!(parsed.objects.len(), 2);
        assert_eq!(parsed.objects[0].name, "cat");
        assert_eq!(parsed.objects[0].bbox, BBox::new(20, 10, 40, 30));
        assert_eq!(parsed.objects[1].name, "dog & friend");
    }

    #[test]
    fn legacy_file_element_is_accepted() {
        let xml = "<annotation><file>a.png</file></annotation>";
        let parsed = parse_voc_xml_str(xml, Path::new("a.xml")).expect("parse xml");
        assert_eq!(parsed.filename, "a.png");
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn fractional_coordinates_are_malformed() {
        let xml = "<annotation><filename>a.png</filename><object><name>x</name>\
                   <bndbox><xmin>1.5</xmin><ymin>0</ymin><xmax>3</xmax><ymax>4</ymax></bndbox>\
                   </object></annotation>";
        let err = parse_voc_xml_str(xml, Path::new("a.xml")).unwrap_err();
        assert!(matches!(err, DatasetError::MalformedAnnotation { .. }));
    }

    #[test]
    fn missing_name_or_root_is_malformed() {
        for xml in [
            "<root><filename>a.png</filename></root>",
            "<annotation></annotation>",
            "<annotation><filename>a.png</filename><object><bndbox/></object></annotation>",
            "<annotation>",
        ] {
            assert!(
                matches!(
                    from_voc_xml_str(xml),
                    Err(DatasetError::MalformedAnnotation { .. })
                ),
                "expected malformed for {xml}"
            );
        }
    }

    #[test]
    fn writer_output_parses_back() {
        let record = Record::new("cat <1>.png", 20, 10, 3)
            .with_object(Object::new(BBox::new(2, 3, 10, 9), "tabby & co"));
        let xml = to_voc_xml_string(&record, "out");
        assert!(xml.contains("<folder>out</folder>"));
        assert!(xml.contains("<depth>3</depth>"));

        let parsed = parse_voc_xml_str(&xml, Path::new("mem.xml")).expect("parse written xml");
        assert_eq!(parsed.filename, "cat <1>.png");
        assert_eq!(parsed.objects[0].name, "tabby & co");
        assert_eq!(parsed.objects[0].bbox, BBox::new(2, 3, 10, 9));
    }
}
