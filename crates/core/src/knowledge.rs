//! Knowledge configuration — the hierarchical document the prompt is
//! rendered from.
//!
//! A [`KnowledgeConfig`] is a closed tagged value: text, an ordered sequence,
//! or an ordered mapping. Scalars (numbers, booleans) collapse to text and
//! `null` to empty text, so any JSON/TOML document can be loaded without a
//! schema.
//!
//! Mapping order is the order keys appear in the source document; the
//! renderer relies on it. Always deserialize straight from text
//! (`serde_json::from_str`), not via `serde_json::Value`, which re-sorts keys.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recursively nested configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeConfig {
    Text(String),
    Sequence(Vec<KnowledgeConfig>),
    Mapping(Vec<(String, KnowledgeConfig)>),
}

impl KnowledgeConfig {
    /// Look up a key in a mapping. Non-mappings have no keys.
    pub fn get(&self, key: &str) -> Option<&KnowledgeConfig> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Empty text, empty sequence, or empty mapping.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Sequence(items) => items.is_empty(),
            Self::Mapping(entries) => entries.is_empty(),
        }
    }

    /// A copy of this mapping with the given keys removed.
    ///
    /// Non-mappings are returned unchanged.
    pub fn without_keys(&self, keys: &[&str]) -> KnowledgeConfig {
        match self {
            Self::Mapping(entries) => Self::Mapping(
                entries
                    .iter()
                    .filter(|(k, _)| !keys.contains(&k.as_str()))
                    .cloned()
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl From<&str> for KnowledgeConfig {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KnowledgeConfig {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── Serde ─────────────────────────────────────────────────────────────────

impl Serialize for KnowledgeConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for KnowledgeConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KnowledgeVisitor)
    }
}

struct KnowledgeVisitor;

impl<'de> Visitor<'de> for KnowledgeVisitor {
    type Value = KnowledgeConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, null, array, or object")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(String::new()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(KnowledgeConfig::Text(String::new()))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        KnowledgeConfig::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(KnowledgeConfig::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, KnowledgeConfig)> =
            Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, KnowledgeConfig>()? {
            // Duplicate keys: last value wins, first position is kept.
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(KnowledgeConfig::Mapping(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_preserves_document_order() {
        let doc: KnowledgeConfig =
            serde_json::from_str(r#"{"zeta": "z", "alpha": "a", "mid": "m"}"#).unwrap();
        let KnowledgeConfig::Mapping(entries) = doc else {
            panic!("expected mapping");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn scalars_collapse_to_text() {
        let doc: KnowledgeConfig =
            serde_json::from_str(r#"{"seats": 40, "open": true, "rating": 4.5, "note": null}"#)
                .unwrap();
        assert_eq!(doc.get("seats").and_then(|v| v.as_text()), Some("40"));
        assert_eq!(doc.get("open").and_then(|v| v.as_text()), Some("true"));
        assert_eq!(doc.get("rating").and_then(|v| v.as_text()), Some("4.5"));
        assert!(doc.get("note").unwrap().is_empty());
    }

    #[test]
    fn duplicate_keys_keep_first_position() {
        let doc: KnowledgeConfig =
            serde_json::from_str(r#"{"a": "1", "b": "2", "a": "3"}"#).unwrap();
        assert_eq!(
            doc,
            KnowledgeConfig::Mapping(vec![
                ("a".into(), "3".into()),
                ("b".into(), "2".into()),
            ])
        );
    }

    #[test]
    fn serializes_back_in_order() {
        let src = r#"{"b":["x","y"],"a":{"c":"d"}}"#;
        let doc: KnowledgeConfig = serde_json::from_str(src).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), src);
    }

    #[test]
    fn loads_from_toml_too() {
        let doc: KnowledgeConfig = toml::from_str("name = \"Marios\"\n[hours]\nlunch = \"12:30\"\n").unwrap();
        assert_eq!(doc.get("name").and_then(|v| v.as_text()), Some("Marios"));
        assert!(doc.get("hours").and_then(|h| h.get("lunch")).is_some());
    }

    #[test]
    fn without_keys_drops_top_level_entries() {
        let doc: KnowledgeConfig =
            serde_json::from_str(r#"{"modelId": "m", "menu": {"pizza": ["margherita"]}}"#).unwrap();
        let trimmed = doc.without_keys(&["modelId"]);
        assert!(trimmed.get("modelId").is_none());
        assert!(trimmed.get("menu").and_then(|m| m.get("pizza")).is_some());
    }
}
