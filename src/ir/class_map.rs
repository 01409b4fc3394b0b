//! Deterministic label ↔ integer id mapping.
//!
//! Ids start at 1 and follow the lexicographic order of the distinct labels,
//! so building a map from the same labels always yields the same ids no
//! matter how the labels were traversed.
//!
//! Maps read from a YOLO `data.yaml` are the exception: YOLO numbers classes
//! from 0, so [`ClassMap::from_yolo_yaml_file`] accepts id 0 and numbers a
//! `names:` sequence from 0.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::model::AnnotationSet;
use crate::error::DatasetError;

/// An immutable bijection between labels and non-negative integer ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassMap {
    ids: BTreeMap<String, i64>,
    labels: BTreeMap<i64, String>,
}

impl ClassMap {
    /// Builds a map from the distinct labels, sorted, with ids from 1.
    pub fn build<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_owned())
            .collect();

        let mut map = Self::default();
        for (idx, label) in distinct.into_iter().enumerate() {
            let id = idx as i64 + 1;
            map.labels.insert(id, label.clone());
            map.ids.insert(label, id);
        }
        map
    }

    /// Builds a map from every object label in the set.
    pub fn from_set(set: &AnnotationSet) -> Self {
        Self::build(set.labels())
    }

    /// Builds a map from explicit `(id, label)` pairs.
    ///
    /// Fails if an id is below 1 or if an id or label appears twice.
    pub fn from_pairs<I, S>(pairs: I, source: &Path) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self::from_pairs_with_base(pairs, source, 1)
    }

    fn from_pairs_with_base<I, S>(pairs: I, source: &Path, first_id: i64) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for (id, label) in pairs {
            let label = label.into();
            if id < first_id {
                return Err(DatasetError::ClassMapInvalid {
                    path: source.to_path_buf(),
                    message: format!("id {id} for '{label}' must be at least {first_id}"),
                });
            }
            if label.trim().is_empty() {
                return Err(DatasetError::ClassMapInvalid {
                    path: source.to_path_buf(),
                    message: format!("id {id} has an empty label"),
                });
            }
            if map.labels.contains_key(&id) {
                return Err(DatasetError::ClassMapInvalid {
                    path: source.to_path_buf(),
                    message: format!("id {id} is assigned more than once"),
                });
            }
            if map.ids.contains_key(&label) {
                return Err(DatasetError::ClassMapInvalid {
                    path: source.to_path_buf(),
                    message: format!("label '{label}' is assigned more than once"),
                });
            }
            map.ids.insert(label.clone(), id);
            map.labels.insert(id, label);
        }
        Ok(map)
    }

    /// Loads a map from a YAML file with a `names:` key.
    ///
    /// `names` may be a sequence (ids are assigned from 1 in file order) or
    /// an `id: label` mapping.
    pub fn from_yaml_file(path: &Path) -> Result<Self, DatasetError> {
        let data = fs::read_to_string(path).map_err(DatasetError::Io)?;
        Self::from_yaml_str(&data, path)
    }

    /// Parses a map from YAML text. `source` is only used in errors.
    pub fn from_yaml_str(yaml: &str, source: &Path) -> Result<Self, DatasetError> {
        Self::parse_names_yaml(yaml, source, 1)
    }

    /// Loads a YOLO `data.yaml`, where class ids start at 0.
    ///
    /// A `names:` sequence is numbered from 0 in file order; a mapping may
    /// use id 0.
    pub fn from_yolo_yaml_file(path: &Path) -> Result<Self, DatasetError> {
        let data = fs::read_to_string(path).map_err(DatasetError::Io)?;
        Self::from_yolo_yaml_str(&data, path)
    }

    /// Parses YOLO `data.yaml` text. `source` is only used in errors.
    pub fn from_yolo_yaml_str(yaml: &str, source: &Path) -> Result<Self, DatasetError> {
        Self::parse_names_yaml(yaml, source, 0)
    }

    fn parse_names_yaml(yaml: &str, source: &Path, first_id: i64) -> Result<Self, DatasetError> {
        let parsed: NamesYaml =
            serde_yaml::from_str(yaml).map_err(|err| DatasetError::ClassMapParse {
                path: source.to_path_buf(),
                source: err,
            })?;

        match parsed.names {
            NamesYamlEntries::Sequence(names) => Self::from_pairs_with_base(
                names
                    .into_iter()
                    .enumerate()
                    .map(|(idx, name)| (idx as i64 + first_id, name)),
                source,
                first_id,
            ),
            NamesYamlEntries::Mapping(mapping) => {
                Self::from_pairs_with_base(mapping, source, first_id)
            }
        }
    }

    /// Renders the map as a `names:` YAML mapping, in id order.
    pub fn to_yaml_string(&self) -> String {
        let mut yaml = String::from("names:\n");
        for (id, label) in self.iter() {
            writeln!(yaml, "  {}: {}", id, yaml_single_quoted(label)).expect("write to string");
        }
        yaml
    }

    #[inline]
    pub fn id(&self, label: &str) -> Option<i64> {
        self.ids.get(label).copied()
    }

    /// Like [`ClassMap::id`] but fails with `UnknownLabel`.
    pub fn require(&self, label: &str) -> Result<i64, DatasetError> {
        self.id(label).ok_or_else(|| DatasetError::UnknownLabel {
            label: label.to_owned(),
        })
    }

    #[inline]
    pub fn label(&self, id: i64) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Iterates over `(id, label)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct NamesYaml {
    names: NamesYamlEntries,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamesYamlEntries {
    Sequence(Vec<String>),
    Mapping(BTreeMap<i64, String>),
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_sorted_and_deduplicated() {
        let map = ClassMap::build(["cat", "dog", "cat"]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.id("cat"), Some(1));
        assert_eq!(map.id("dog"), Some(2));

        let reversed = ClassMap::build(["dog", "cat", "dog", "cat"]);
        assert_eq!(map, reversed);
    }

    #[test]
    fn require_reports_unknown_label() {
        let map = ClassMap::build(["cat"]);
        let err = map.require("zebra").unwrap_err();
        assert!(matches!(err, DatasetError::UnknownLabel { label } if label == "zebra"));
    }

    #[test]
    fn yaml_sequence_keeps_file_order() {
        let map = ClassMap::from_yaml_str("names:\n  - zebra\n  - ant\n", Path::new("m.yaml"))
            .expect("parse yaml");
        assert_eq!(map.id("zebra"), Some(1));
        assert_eq!(map.id("ant"), Some(2));
    }

    #[test]
    fn yaml_mapping_roundtrip() {
        let map = ClassMap::build(["cat", "dog's"]);
        let yaml = map.to_yaml_string();
        assert!(yaml.contains("1: 'cat'"));
        assert!(yaml.contains("2: 'dog''s'"));

        let parsed = ClassMap::from_yaml_str(&yaml, Path::new("m.yaml")).expect("parse yaml");
        assert_eq!(parsed, map);
    }

    #[test]
    fn from_pairs_rejects_duplicates_and_zero() {
        let path = Path::new("m.yaml");
        assert!(matches!(
            ClassMap::from_pairs([(0, "cat")], path),
            Err(DatasetError::ClassMapInvalid { .. })
        ));
        assert!(matches!(
            ClassMap::from_pairs([(1, "cat"), (2, "cat")], path),
            Err(DatasetError::ClassMapInvalid { .. })
        ));
        assert!(matches!(
            ClassMap::from_pairs([(1, "cat"), (1, "dog")], path),
            Err(DatasetError::ClassMapInvalid { .. })
        ));
    }

    #[test]
    fn yolo_yaml_sequence_starts_at_zero() {
        let path = Path::new("data.yaml");
        let map = ClassMap::from_yolo_yaml_str("names: [cat, dog]\n", path).expect("parse yaml");
        assert_eq!(map.label(0), Some("cat"));
        assert_eq!(map.label(1), Some("dog"));

        let mapping = ClassMap::from_yolo_yaml_str("names:\n  0: person\n  3: bus\n", path)
            .expect("parse mapping");
        assert_eq!(mapping.id("person"), Some(0));
        assert_eq!(mapping.id("bus"), Some(3));

        assert!(matches!(
            ClassMap::from_yolo_yaml_str("names:\n  -1: ghost\n", path),
            Err(DatasetError::ClassMapInvalid { .. })
        ));
    }

    #[test]
    fn label_lookup_is_inverse() {
        let map = ClassMap::build(["b", "a", "c"]);
        for (id, label) in map.iter() {
            assert_eq!(map.id(label), Some(id));
            assert_eq!(map.label(id), Some(label));
        }
        assert_eq!(map.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
