//! Record schema loaded from `index.yaml`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::duration::{total, DurationError, Elapsed};

/// One archive entry, loaded from a record folder's `index.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// External identifier, e.g. `R12`
    pub id: String,

    /// Display name
    pub name: String,

    /// Films watched for this record, in document order
    pub films: Films,

    /// Template-only fields, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Record {
    /// Display label: the id without its first character, then the name.
    ///
    /// `R12` + `Lasers` becomes `12. Lasers`.
    pub fn id_name(&self) -> String {
        let mut chars = self.id.chars();
        chars.next();
        format!("{}. {}", chars.as_str(), self.name)
    }

    /// Duration totals across this record's films.
    pub fn totals(&self) -> Result<Totals, DurationError> {
        Totals::of(self.films.iter().map(|(_, film)| film))
    }
}

/// A film belonging to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    /// Runtime as `H:M:S`
    pub length: String,

    /// Speedrun runtime as `H:M:S`
    pub speedrun_length: String,

    /// Template-only fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Films keyed by their `index.yaml` key, kept in document order.
///
/// Deserializes from a mapping; serializes as a plain sequence of films so
/// templates can iterate it directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Films(Vec<(String, Film)>);

impl Films {
    pub fn new(films: Vec<(String, Film)>) -> Self {
        Self(films)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Film)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Film> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, film)| film)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Films {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (_, film) in &self.0 {
            seq.serialize_element(film)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Films {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilmsVisitor;

        impl<'de> Visitor<'de> for FilmsVisitor {
            type Value = Films;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of film key to film")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Films, E> {
                Ok(Films::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Films, A::Error> {
                let mut films = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, film)) = map.next_entry::<String, Film>()? {
                    films.push((key, film));
                }
                Ok(Films(films))
            }
        }

        deserializer.deserialize_any(FilmsVisitor)
    }
}

/// Normal and speedrun duration totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub time: Elapsed,
    pub speedrun_time: Elapsed,
}

impl Totals {
    /// Sum the `length` and `speedrun_length` of every film.
    pub fn of<'a, I>(films: I) -> Result<Self, DurationError>
    where
        I: IntoIterator<Item = &'a Film>,
        I::IntoIter: Clone,
    {
        let films = films.into_iter();
        Ok(Self {
            time: total(films.clone().map(|f| f.length.as_str()))?,
            speedrun_time: total(films.map(|f| f.speedrun_length.as_str()))?,
        })
    }
}

/// Freeform document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Reference materials, read from `refs/`
    Materials,
    /// Transcripts, read from `transcripts/`
    Transcripts,
}

impl Category {
    /// Subdirectory of a record folder holding this category's documents.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Materials => "refs",
            Category::Transcripts => "transcripts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Materials => f.write_str("materials"),
            Category::Transcripts => f.write_str("transcripts"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RECORD_YAML: &str = r#"
id: R7
name: Optics
teacher: Kubosh
films:
  zeta:
    title: Last
    length: "1:00:00"
    speedrun_length: "0:40:00"
  alpha:
    title: First
    length: "0:30:00"
    speedrun_length: "0:20:00"
"#;

    #[test]
    fn parses_record_with_passthrough_fields() {
        let record: Record = serde_yaml::from_str(RECORD_YAML).unwrap();

        assert_eq!(record.id, "R7");
        assert_eq!(record.name, "Optics");
        assert_eq!(
            record.extra.get("teacher"),
            Some(&serde_yaml::Value::String("Kubosh".to_string()))
        );
        assert_eq!(record.films.len(), 2);
        assert!(record.films.get("alpha").unwrap().extra.contains_key("title"));
    }

    #[test]
    fn keeps_film_document_order() {
        let record: Record = serde_yaml::from_str(RECORD_YAML).unwrap();
        let keys: Vec<&str> = record.films.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn films_serialize_as_sequence() {
        let record: Record = serde_yaml::from_str(RECORD_YAML).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        let films = json["films"].as_array().unwrap();
        assert_eq!(films.len(), 2);
        assert_eq!(films[0]["title"], "Last");
        assert_eq!(json["teacher"], "Kubosh");
    }

    #[test]
    fn empty_films_mapping_is_allowed() {
        let record: Record = serde_yaml::from_str("id: R1\nname: Empty\nfilms:\n").unwrap();
        assert!(record.films.is_empty());
        assert_eq!(record.totals().unwrap(), Totals::default());
    }

    #[test]
    fn builds_id_name() {
        let record: Record = serde_yaml::from_str(RECORD_YAML).unwrap();
        assert_eq!(record.id_name(), "7. Optics");
    }

    #[test]
    fn sums_record_totals() {
        let record: Record = serde_yaml::from_str(RECORD_YAML).unwrap();
        let totals = record.totals().unwrap();

        assert_eq!(totals.time.seconds(), 5400);
        assert_eq!(totals.speedrun_time.seconds(), 3600);
    }

    #[test]
    fn malformed_film_length_fails_totals() {
        let yaml = "id: R1\nname: Bad\nfilms:\n  a:\n    length: \"1:00\"\n    speedrun_length: \"0:00:01\"\n";
        let record: Record = serde_yaml::from_str(yaml).unwrap();

        assert!(matches!(
            record.totals(),
            Err(DurationError::FieldCount { found: 2, .. })
        ));
    }
}
