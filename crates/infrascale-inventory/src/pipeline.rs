//! Aggregation pipeline builder for the target collection

use std::fmt;

use mongodb::bson::{Bson, Document, doc};

/// One aggregation stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents where `field` exists
    MatchExists {
        /// Field that must be present
        field: String,
    },
    /// Left outer equi-join against another collection
    Lookup {
        /// Foreign collection
        from: String,
        /// Field on the input documents
        local_field: String,
        /// Field on the foreign documents
        foreign_field: String,
        /// Output array field
        as_field: String,
    },
}

impl Stage {
    /// Render as a BSON stage document
    #[must_use]
    pub fn to_document(&self) -> Document {
        match self {
            Stage::MatchExists { field } => {
                let mut condition = Document::new();
                condition.insert(field.as_str(), doc! { "$exists": true });
                doc! { "$match": condition }
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => doc! {
                "$lookup": {
                    "from": from.as_str(),
                    "localField": local_field.as_str(),
                    "foreignField": foreign_field.as_str(),
                    "as": as_field.as_str(),
                }
            },
        }
    }
}

/// Aggregation pipeline builder
///
/// Provides typed construction of the pipelines run against the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep documents where `field` exists
    #[must_use]
    pub fn match_exists(mut self, field: &str) -> Self {
        self.stages.push(Stage::MatchExists {
            field: field.to_string(),
        });
        self
    }

    /// Join `from` on `local_field == foreign_field`, writing matches to `as_field`
    #[must_use]
    pub fn lookup(mut self, from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        self.stages.push(Stage::Lookup {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        });
        self
    }

    /// Stages in order
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Build the BSON pipeline
    #[must_use]
    pub fn build(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<Bson> = self.build().into_iter().map(Bson::Document).collect();
        write!(f, "{}", Bson::Array(stages).into_relaxed_extjson())
    }
}

/// Predefined pipelines
pub mod pipelines {
    use super::Pipeline;
    use crate::types::{NAME_FIELD, RESOLVED_GROUPS_FIELD};

    /// Every named target with its group references resolved
    #[must_use]
    pub fn targets_with_groups(groups_collection: &str, groups_attr: &str) -> Pipeline {
        Pipeline::new().match_exists(NAME_FIELD).lookup(
            groups_collection,
            groups_attr,
            NAME_FIELD,
            RESOLVED_GROUPS_FIELD,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .match_exists("name")
            .lookup("groups", "groups", "name", "groups");

        let stages = pipeline.build();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], doc! { "$match": { "name": { "$exists": true } } });
        assert_eq!(
            stages[1],
            doc! {
                "$lookup": {
                    "from": "groups",
                    "localField": "groups",
                    "foreignField": "name",
                    "as": "groups",
                }
            }
        );
    }

    #[test]
    fn test_predefined_pipeline() {
        let pipeline = pipelines::targets_with_groups("host_groups", "roles");
        assert_eq!(
            pipeline.stages()[1],
            Stage::Lookup {
                from: "host_groups".to_string(),
                local_field: "roles".to_string(),
                foreign_field: "name".to_string(),
                as_field: "groups".to_string(),
            }
        );
    }

    #[test]
    fn test_display() {
        let rendered = pipelines::targets_with_groups("groups", "groups").to_string();
        assert!(rendered.contains(r#""$match":{"name":{"$exists":true}}"#));
        assert!(rendered.contains(r#""localField":"groups""#));
    }
}
