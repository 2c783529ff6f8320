use crate::source::{ExtractedFields, RawRecord};
use serde::{Deserialize, Serialize};

/// Separator between the recipe id and the fragment slot in vector ids
pub const SLOT_SEPARATOR: char = '#';

/// Payload stored with every vector of a recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub minutes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl RecipeMetadata {
    pub fn new(record: &RawRecord, fields: ExtractedFields) -> Self {
        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            minutes: record.minutes.clone(),
            tags: fields.tags,
            steps: fields.steps,
            ingredients: fields.ingredients,
        }
    }
}

/// One vector to be written to the index.
///
/// All entries of a recipe share `id` and `metadata`; `slot` is the position
/// of the fragment the vector was embedded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub slot: usize,
    pub values: Vec<f32>,
    pub metadata: RecipeMetadata,
}

impl IndexEntry {
    /// Key used by the vector service, `"{id}#{slot}"`
    pub fn vector_id(&self) -> String {
        format!("{}{}{}", self.id, SLOT_SEPARATOR, self.slot)
    }
}

/// Split a vector id back into recipe id and slot.
///
/// Ids written without a slot are returned whole.
pub fn split_vector_id(vector_id: &str) -> (&str, Option<usize>) {
    match vector_id.rsplit_once(SLOT_SEPARATOR) {
        Some((id, slot)) => match slot.parse() {
            Ok(slot) => (id, Some(slot)),
            Err(_) => (vector_id, None),
        },
        None => (vector_id, None),
    }
}

/// Parameters for creating an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub indexed_fields: Vec<String>,
}

/// Nearest-neighbour hit returned by a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Recipe id with the slot suffix removed
    pub id: String,
    pub vector_id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecipeMetadata>,
}

impl QueryMatch {
    pub fn from_vector_id(vector_id: String, score: f32, metadata: Option<RecipeMetadata>) -> Self {
        let id = split_vector_id(&vector_id).0.to_string();
        Self {
            id,
            vector_id,
            score,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_id_round_trip() {
        let entry = IndexEntry {
            id: "137739".to_string(),
            slot: 4,
            values: vec![0.1, 0.2],
            metadata: RecipeMetadata::default(),
        };
        assert_eq!(entry.vector_id(), "137739#4");
        assert_eq!(split_vector_id(&entry.vector_id()), ("137739", Some(4)));
    }

    #[test]
    fn test_split_plain_ids() {
        assert_eq!(split_vector_id("42"), ("42", None));
        assert_eq!(split_vector_id("a#b"), ("a#b", None));
        assert_eq!(split_vector_id("a#b#2"), ("a#b", Some(2)));
    }

    #[test]
    fn test_metadata_tolerates_missing_fields() {
        let metadata: RecipeMetadata = serde_json::from_str(r#"{"name": "Soup"}"#).unwrap();
        assert_eq!(metadata.name, "Soup");
        assert!(metadata.tags.is_empty());
    }
}
