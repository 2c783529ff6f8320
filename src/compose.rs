//! Turns one recipe row into the text fragments that get embedded.
//!
//! Every fragment of a record is stored under the same recipe id and
//! metadata, so the order returned here is the order of the vector slots.

use crate::source::{ExtractedFields, RawRecord};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the record's duration
pub const MINUTES_PLACEHOLDER: &str = "{minutes}";

/// Duration phrasings added to every record.
///
/// Several near-identical phrasings are embedded on purpose so queries like
/// "quick 30 minute dinner" land close to the recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentTemplates {
    pub duration: Vec<String>,
}

impl Default for FragmentTemplates {
    fn default() -> Self {
        Self {
            duration: vec![
                "done in {minutes} minutes".to_string(),
                "time taken {minutes} minutes".to_string(),
                "{minutes} minutes".to_string(),
            ],
        }
    }
}

impl FragmentTemplates {
    pub fn render_durations(&self, minutes: &str) -> impl Iterator<Item = String> + '_ {
        let minutes = minutes.trim().to_string();
        self.duration
            .iter()
            .map(move |template| template.replace(MINUTES_PLACEHOLDER, &minutes))
    }
}

/// Build the ordered fragment list for a record:
/// name, tags, steps, ingredients, duration phrasings, then description.
/// Blank fragments are dropped.
pub fn compose_fragments(
    record: &RawRecord,
    fields: &ExtractedFields,
    templates: &FragmentTemplates,
) -> Vec<String> {
    std::iter::once(record.name.clone())
        .chain(fields.tags.iter().cloned())
        .chain(fields.steps.iter().cloned())
        .chain(fields.ingredients.iter().cloned())
        .chain(templates.render_durations(&record.minutes))
        .chain(std::iter::once(record.description.clone()))
        .filter(|fragment| !fragment.trim().is_empty())
        .collect()
}
