//! Conversion between typed issue documents and Tantivy documents.

use tantivy::schema::Value;
use tantivy::TantivyDocument;

use issue_types::{IssueDoc, TYPE_ISSUE};

use crate::error::SearchError;
use crate::schema::IssueSchema;

/// Build the Tantivy document for an issue.
pub fn issue_to_doc(schema: &IssueSchema, issue: &IssueDoc) -> Result<TantivyDocument, SearchError> {
    let mut doc = TantivyDocument::default();
    doc.add_text(schema.index_type, TYPE_ISSUE.format());
    doc.add_text(schema.doc_id, &issue.key);
    doc.add_text(schema.routing, issue.routing());
    doc.add_text(schema.project_uuid, &issue.project_uuid);
    doc.add_text(schema.branch_uuid, &issue.branch_uuid);
    doc.add_text(schema.component_uuid, &issue.component_uuid);
    for tag in &issue.tags {
        doc.add_text(schema.tags, tag);
    }
    doc.add_text(schema.text, searchable_text(issue));
    doc.add_text(schema.source, issue.to_json()?);
    Ok(doc)
}

/// Decode the typed issue stored in a Tantivy document.
pub fn doc_to_issue(schema: &IssueSchema, doc: &TantivyDocument) -> Result<IssueDoc, SearchError> {
    let source = doc
        .get_first(schema.source)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::Serialization("document has no source".to_string()))?;
    Ok(IssueDoc::from_json(source)?)
}

fn searchable_text(issue: &IssueDoc) -> String {
    let mut parts: Vec<&str> = vec![issue.rule_key.as_str()];
    if let Some(message) = &issue.message {
        parts.push(message);
    }
    if let Some(path) = &issue.file_path {
        parts.push(path);
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_issue_schema;
    use issue_types::IssueRow;

    #[test]
    fn test_issue_to_doc_and_back() {
        let schema = build_issue_schema();
        let issue = IssueDoc::from_row(
            &IssueRow::new("I1", "P1", "F1")
                .with_message("Remove this unused import")
                .with_tags(["unused"]),
        );

        let doc = issue_to_doc(&schema, &issue).unwrap();

        let doc_id = doc.get_first(schema.doc_id).and_then(|v| v.as_str());
        assert_eq!(doc_id, Some("I1"));
        let routing = doc.get_first(schema.routing).and_then(|v| v.as_str());
        assert_eq!(routing, Some("P1"));

        let decoded = doc_to_issue(&schema, &doc).unwrap();
        assert_eq!(decoded.key, issue.key);
        assert_eq!(decoded.message, issue.message);
    }

    #[test]
    fn test_doc_without_source_is_an_error() {
        let schema = build_issue_schema();
        let doc = TantivyDocument::default();
        assert!(matches!(
            doc_to_issue(&schema, &doc),
            Err(SearchError::Serialization(_))
        ));
    }
}
