// ABOUTME: Conversation log CSV export for the operator dashboard
// ABOUTME: Streams the full log as a UTF-8 BOM CSV attachment
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation export route.
//!
//! `GET /api/export_conversations` renders the whole conversation log as
//! CSV. The body starts with a UTF-8 BOM so spreadsheet tools open the
//! Japanese text correctly, and every field is double-quote escaped. An
//! empty log is a 404 rather than a headers-only file.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::database::ConversationLogRecord;
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;

/// Byte order mark prepended so Excel detects UTF-8
const UTF8_BOM: &str = "\u{feff}";

const CSV_HEADER: &str = "Timestamp,UserID,Question,Answer";

const EXPORT_FILENAME: &str = "conversation_history.csv";

/// Export routes implementation
pub struct ExportRoutes;

impl ExportRoutes {
    /// Create the export route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/export_conversations", get(Self::export_conversations))
            .with_state(resources)
    }

    /// Render the conversation log as a CSV attachment
    async fn export_conversations(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Response> {
        let records = resources.conversation_log.fetch_all().await?;

        if records.is_empty() {
            return Err(AppError::not_found("conversation log entries"));
        }

        info!(rows = records.len(), "exporting conversation log");
        let csv = render_csv(&records);

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILENAME}\""),
                ),
            ],
            csv,
        )
            .into_response())
    }
}

fn render_csv(records: &[ConversationLogRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 128);
    out.push_str(UTF8_BOM);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for record in records {
        out.push_str(&escape_field(&record.created_at));
        out.push(',');
        out.push_str(&escape_field(&record.user_id));
        out.push(',');
        out.push_str(&escape_field(&record.question));
        out.push(',');
        out.push_str(&escape_field(&record.answer));
        out.push('\n');
    }

    out
}

/// Wrap a field in double quotes, doubling any embedded quote
fn escape_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answer: &str) -> ConversationLogRecord {
        ConversationLogRecord {
            id: 1,
            user_id: "user-1".to_owned(),
            question: question.to_owned(),
            answer: answer.to_owned(),
            source: "ai".to_owned(),
            created_at: "2026-08-26T10:00:00+00:00".to_owned(),
        }
    }

    #[test]
    fn test_csv_starts_with_bom_and_header() {
        let csv = render_csv(&[record("q", "a")]);
        assert!(csv.starts_with("\u{feff}Timestamp,UserID,Question,Answer\n"));
    }

    #[test]
    fn test_fields_with_quotes_commas_and_newlines_are_escaped() {
        let csv = render_csv(&[record("he said \"hi\", twice", "line one\nline two")]);
        assert!(csv.contains("\"he said \"\"hi\"\", twice\""));
        assert!(csv.contains("\"line one\nline two\""));
    }

    #[test]
    fn test_one_row_per_record() {
        let csv = render_csv(&[record("q1", "a1"), record("q2", "a2")]);
        // header + 2 rows, the answers contain no newlines here
        assert_eq!(csv.lines().count(), 3);
    }
}
