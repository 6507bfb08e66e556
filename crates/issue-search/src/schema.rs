//! Tantivy schema for the issue index.
//!
//! Filterable keys are indexed as raw `STRING` terms. The full typed
//! document is kept in the stored-only `source` field as JSON, so reads
//! return an [`issue_types::IssueDoc`] rather than a field map.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct IssueSchema {
    schema: Schema,
    /// `index/type` of the document (STRING | STORED)
    pub index_type: Field,
    /// Primary key: the issue key (STRING | STORED)
    pub doc_id: Field,
    /// Routing key, the project UUID (STRING | STORED)
    pub routing: Field,
    pub project_uuid: Field,
    pub branch_uuid: Field,
    pub component_uuid: Field,
    /// Multi-valued tags (STRING)
    pub tags: Field,
    /// Searchable text: message, rule key and file path (TEXT)
    pub text: Field,
    /// JSON of the typed document (STORED)
    pub source: Field,
}

impl IssueSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create an IssueSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };

        Ok(Self {
            index_type: field("index_type")?,
            doc_id: field("doc_id")?,
            routing: field("routing")?,
            project_uuid: field("project_uuid")?,
            branch_uuid: field("branch_uuid")?,
            component_uuid: field("component_uuid")?,
            tags: field("tags")?,
            text: field("text")?,
            source: field("source")?,
            schema,
        })
    }
}

/// Build the issue index schema.
pub fn build_issue_schema() -> IssueSchema {
    let mut schema_builder = Schema::builder();

    let index_type = schema_builder.add_text_field("index_type", STRING | STORED);
    let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
    let routing = schema_builder.add_text_field("routing", STRING | STORED);
    let project_uuid = schema_builder.add_text_field("project_uuid", STRING | STORED);
    let branch_uuid = schema_builder.add_text_field("branch_uuid", STRING | STORED);
    let component_uuid = schema_builder.add_text_field("component_uuid", STRING | STORED);
    let tags = schema_builder.add_text_field("tags", STRING);
    let text = schema_builder.add_text_field("text", TEXT);
    let source = schema_builder.add_text_field("source", STORED);

    let schema = schema_builder.build();

    IssueSchema {
        schema,
        index_type,
        doc_id,
        routing,
        project_uuid,
        branch_uuid,
        component_uuid,
        tags,
        text,
        source,
    }
}
