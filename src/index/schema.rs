//! Tantivy schema for log records.
//!
//! One schema is shared by every application index so that a combined
//! handle can query all of them with the same compiled clauses:
//! - Fast i64 `log_time` for range queries and ascending sort
//! - Raw-tokenized identity fields for exact-term filtering
//! - Multi-valued raw `log_level` (one token per set flag) so a flag filter
//!   is a plain term clause
//! - Stemmed `text` for full-text search
//! - Stored-only JSON `exception` payload

use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions,
};
use tantivy::tokenizer::TextAnalyzer;

/// Schema definition for log records in a per-application index.
#[derive(Clone, Debug)]
pub struct LogSchema {
    pub schema: Schema,
    pub log_type: Field,
    pub app_name: Field,
    pub monitor_id: Field,
    pub log_time: Field,
    pub previous_log_time: Field,
    pub previous_entry_type: Field,
    pub group_depth: Field,
    pub log_level: Field,
    pub text: Field,
    pub source_file_name: Field,
    pub line_number: Field,
    pub tags: Field,
    pub exception: Field,
    pub has_exception: Field,
}

impl LogSchema {
    /// Build the schema shared by all application indices.
    pub fn build() -> Self {
        let mut schema_builder = Schema::builder();

        let raw = || {
            TextOptions::default()
                .set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer("raw")
                        .set_index_option(IndexRecordOption::Basic),
                )
                .set_stored()
        };

        // Identity fields: exact matching only
        let log_type = schema_builder.add_text_field("log_type", raw());
        let app_name = schema_builder.add_text_field("app_name", raw());
        let monitor_id = schema_builder.add_text_field("monitor_id", raw());

        // Timestamp fields: i64 unix microseconds; log_time drives range
        // queries and the ascending result sort
        let log_time = schema_builder.add_i64_field(
            "log_time",
            NumericOptions::default().set_indexed().set_fast().set_stored(),
        );
        let previous_log_time = schema_builder
            .add_i64_field("previous_log_time", NumericOptions::default().set_stored());
        let previous_entry_type =
            schema_builder.add_text_field("previous_entry_type", TextOptions::default().set_stored());

        // Group depth: exact-term filtering plus fast access
        let group_depth = schema_builder.add_u64_field(
            "group_depth",
            NumericOptions::default().set_indexed().set_fast().set_stored(),
        );

        // Level: multi-valued, one raw token per set flag
        let log_level = schema_builder.add_text_field("log_level", raw());

        // Text: full-text searchable with positions for phrase queries
        let text = schema_builder.add_text_field(
            "text",
            TextOptions::default()
                .set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer("en_stem")
                        .set_index_option(IndexRecordOption::WithFreqsAndPositions),
                )
                .set_stored(),
        );

        let source_file_name = schema_builder.add_text_field("source_file_name", raw());
        let line_number = schema_builder
            .add_u64_field("line_number", NumericOptions::default().set_stored());

        // Tags: multi-valued raw tokens, queried by membership
        let tags = schema_builder.add_text_field("tags", raw());

        // Exception payload: stored JSON, never tokenized
        let exception =
            schema_builder.add_text_field("exception", TextOptions::default().set_stored());
        // Presence marker so want-all(Exception) is a single term clause
        let has_exception = schema_builder.add_text_field(
            "has_exception",
            TextOptions::default().set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("raw")
                    .set_index_option(IndexRecordOption::Basic),
            ),
        );

        Self {
            schema: schema_builder.build(),
            log_type,
            app_name,
            monitor_id,
            log_time,
            previous_log_time,
            previous_entry_type,
            group_depth,
            log_level,
            text,
            source_file_name,
            line_number,
            tags,
            exception,
            has_exception,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolve a projection/search field name to its tantivy field.
    /// Only text-searchable fields are resolvable here.
    pub fn text_field(&self, name: &str) -> Option<Field> {
        match name {
            "text" | "Text" => Some(self.text),
            "source_file_name" | "SourceFileName" | "FileName" => Some(self.source_file_name),
            "monitor_id" | "MonitorId" => Some(self.monitor_id),
            "app_name" | "AppName" => Some(self.app_name),
            "tags" | "Tags" => Some(self.tags),
            "log_level" | "LogLevel" => Some(self.log_level),
            _ => None,
        }
    }

    /// Register the tokenizers the schema refers to on a freshly opened index.
    pub fn configure_tokenizers(&self, index: &tantivy::Index) -> tantivy::Result<()> {
        let tokenizer_manager = index.tokenizers();

        tokenizer_manager.register(
            "en_stem",
            TextAnalyzer::builder(tantivy::tokenizer::SimpleTokenizer::default())
                .filter(tantivy::tokenizer::RemoveLongFilter::limit(40))
                .filter(tantivy::tokenizer::LowerCaser)
                .filter(tantivy::tokenizer::Stemmer::default())
                .build(),
        );

        tokenizer_manager.register(
            "raw",
            TextAnalyzer::builder(tantivy::tokenizer::RawTokenizer::default()).build(),
        );

        Ok(())
    }
}

impl Default for LogSchema {
    fn default() -> Self {
        Self::build()
    }
}
