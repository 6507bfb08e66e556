//! Full-text search over issue messages.
//!
//! BM25 ranking over the `text` field with optional branch and tag filters.

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{IndexReader, TantivyDocument, Term};
use tracing::info;

use crate::error::SearchError;
use crate::index::IssueIndex;
use crate::schema::IssueSchema;

/// A search hit with relevance score.
#[derive(Debug, Clone)]
pub struct IssueHit {
    pub key: String,
    pub project_uuid: Option<String>,
    pub branch_uuid: Option<String>,
    pub component_uuid: Option<String>,
    /// BM25 relevance score
    pub score: f32,
}

/// Search options for filtering and limiting results.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub branch_uuid: Option<String>,
    pub tag: Option<String>,
    /// Maximum results to return
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            branch_uuid: None,
            tag: None,
            limit: 10,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_branch(mut self, branch_uuid: impl Into<String>) -> Self {
        self.branch_uuid = Some(branch_uuid.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

pub struct IssueSearcher {
    reader: IndexReader,
    schema: IssueSchema,
    query_parser: QueryParser,
}

impl IssueSearcher {
    pub fn new(index: &IssueIndex) -> Self {
        let schema = index.schema().clone();
        let query_parser = QueryParser::for_index(index.index(), vec![schema.text]);

        Self {
            reader: index.reader(),
            schema,
            query_parser,
        }
    }

    pub fn search(
        &self,
        query_str: &str,
        options: SearchOptions,
    ) -> Result<Vec<IssueHit>, SearchError> {
        if query_str.trim().is_empty() || options.limit == 0 {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, self.query_parser.parse_query(query_str)?)];
        if let Some(branch) = &options.branch_uuid {
            clauses.push((Occur::Must, self.term_query(self.schema.branch_uuid, branch)));
        }
        if let Some(tag) = &options.tag {
            clauses.push((Occur::Must, self.term_query(self.schema.tags, tag)));
        }
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(options.limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let text = |field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            hits.push(IssueHit {
                key: text(self.schema.doc_id).unwrap_or_default(),
                project_uuid: text(self.schema.project_uuid),
                branch_uuid: text(self.schema.branch_uuid),
                component_uuid: text(self.schema.component_uuid),
                score,
            });
        }

        info!(query = query_str, results = hits.len(), "Issue search complete");
        Ok(hits)
    }

    fn term_query(&self, field: tantivy::schema::Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }
}
