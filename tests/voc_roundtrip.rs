//! Integration tests for Pascal VOC format support.

use std::fs;
use std::path::Path;

use dataset_maker::ir::io_voc_xml::{read_voc, write_voc};
use dataset_maker::ir::{AnnotationSet, BBox, DiskImages, Object, Record};
use dataset_maker::DatasetError;

mod common;

fn create_sample_voc_dataset(root: &Path) {
    common::write_image(&root.join("images/img_a.jpg"), 100, 50);
    common::write_image(&root.join("images/img_b.png"), 120, 80);
    common::write_image(&root.join("images/img_c.jpg"), 64, 64);

    let xml_a = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <filename>img_b.png</filename>
  <size>
    <width>999</width>
    <height>999</height>
    <depth>1</depth>
  </size>
  <object>
    <name>dog</name>
    <truncated>1</truncated>
    <bndbox>
      <xmin>10</xmin>
      <ymin>12</ymin>
      <xmax>60</xmax>
      <ymax>70</ymax>
    </bndbox>
  </object>
</annotation>
"#;

    let xml_b = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <filename>img_a.jpg</filename>
  <object>
    <name>cat</name>
    <pose>Sitting</pose>
    <bndbox>
      <xmin>1</xmin>
      <ymin>2</ymin>
      <xmax>30.0</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
  <object>
    <name>dog</name>
    <bndbox>
      <xmin>31</xmin>
      <ymin>4</ymin>
      <xmax>80</xmax>
      <ymax>45</ymax>
    </bndbox>
  </object>
</annotation>
"#;

    let xml_c = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <file>img_c.jpg</file>
</annotation>
"#;

    common::write_file(&root.join("Annotations/a.xml"), xml_a);
    common::write_file(&root.join("Annotations/b.xml"), xml_b);
    common::write_file(&root.join("Annotations/c.xml"), xml_c);
}

#[test]
fn read_voc_follows_file_order_and_image_dimensions() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_sample_voc_dataset(temp.path());

    let set = read_voc(
        &temp.path().join("images"),
        &temp.path().join("Annotations"),
        &DiskImages,
    )
    .expect("read voc dataset");

    assert_eq!(set.len(), 3);
    let names: Vec<&str> = set.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, vec!["img_b.png", "img_a.jpg", "img_c.jpg"]);

    // Dimensions come from the image, not from <size>.
    assert_eq!((set.records[0].width, set.records[0].height), (120, 80));
    assert_eq!(set.records[0].depth, 3);

    let objects = &set.records[1].objects;
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].label, "cat");
    assert_eq!(objects[0].bbox, BBox::new(2, 1, 40, 30));
    assert_eq!(objects[1].bbox, BBox::new(4, 31, 45, 80));
    assert!(objects.iter().all(|object| object.mask.is_none()));

    assert!(set.records[2].objects.is_empty());
}

#[test]
fn voc_write_then_read_roundtrip() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_sample_voc_dataset(temp.path());
    let images = temp.path().join("images");

    let input = read_voc(&images, &temp.path().join("Annotations"), &DiskImages)
        .expect("read input dataset");

    let output_root = temp.path().join("voc_out");
    write_voc(&output_root, &input).expect("write voc dataset");

    assert!(output_root.join("img_a.xml").is_file());
    assert!(output_root.join("img_b.xml").is_file());
    assert!(output_root.join("img_c.xml").is_file());

    let restored = read_voc(&images, &output_root, &DiskImages).expect("read restored dataset");

    // File order differs after renaming, so compare by name.
    let mut left = input.records.clone();
    let mut right = restored.records.clone();
    left.sort_by(|a, b| a.name.cmp(&b.name));
    right.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(left, right);
}

#[test]
fn written_xml_carries_folder_and_size() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let output_root = temp.path().join("annotations_out");

    let set = AnnotationSet::new(vec![Record::new("photo.jpeg", 32, 24, 3)
        .with_object(Object::new(BBox::new(2, 1, 20, 25), "a<b"))]);
    write_voc(&output_root, &set).expect("write voc");

    let xml = fs::read_to_string(output_root.join("photo.xml")).expect("read written xml");
    assert!(xml.contains("<folder>annotations_out</folder>"));
    assert!(xml.contains("<filename>photo.jpeg</filename>"));
    assert!(xml.contains("<width>32</width>"));
    assert!(xml.contains("<height>24</height>"));
    assert!(xml.contains("<name>a&lt;b</name>"));
    assert!(xml.contains("<xmin>1</xmin>"));
    assert!(xml.contains("<ymax>20</ymax>"));
}

#[test]
fn missing_image_fails_decode() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_sample_voc_dataset(temp.path());
    fs::remove_file(temp.path().join("images/img_c.jpg")).expect("remove image");

    let err = read_voc(
        &temp.path().join("images"),
        &temp.path().join("Annotations"),
        &DiskImages,
    )
    .unwrap_err();
    assert!(matches!(err, DatasetError::MissingImage { ref name, .. } if name == "img_c.jpg"));
}

#[test]
fn empty_annotation_dir_fails_decode() {
    let temp = tempfile::tempdir().expect("create temp dir");
    fs::create_dir_all(temp.path().join("Annotations")).expect("create dir");

    let err = read_voc(temp.path(), &temp.path().join("Annotations"), &DiskImages).unwrap_err();
    assert!(matches!(err, DatasetError::MissingAnnotationSource { .. }));
}

#[test]
fn duplicate_filename_fails_decode() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_sample_voc_dataset(temp.path());
    let duplicate = fs::read_to_string(temp.path().join("Annotations/b.xml")).expect("read b.xml");
    common::write_file(&temp.path().join("Annotations/d.xml"), &duplicate);

    let err = read_voc(
        &temp.path().join("images"),
        &temp.path().join("Annotations"),
        &DiskImages,
    )
    .unwrap_err();
    assert!(matches!(err, DatasetError::MalformedAnnotation { .. }));
}

#[test]
fn records_sharing_a_stem_fail_before_writing() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let output_root = temp.path().join("voc_out");

    let set = AnnotationSet::new(vec![
        Record::new("a.png", 10, 10, 3).with_object(Object::new(BBox::new(0, 0, 4, 4), "cat")),
        Record::new("b.png", 10, 10, 3),
        Record::new("a.jpg", 10, 10, 3),
    ]);

    let err = write_voc(&output_root, &set).unwrap_err();
    match err {
        DatasetError::DuplicateRecord { path, first, second } => {
            assert_eq!(path, output_root.join("a.xml"));
            assert_eq!((first.as_str(), second.as_str()), ("a.png", "a.jpg"));
        }
        other => panic!("expected DuplicateRecord, got {other:?}"),
    }
    assert!(!output_root.exists());
}
