//! Transcript import and action-item extraction.
//!
//! Fetches a meeting transcript through the MCP client and pulls candidate
//! action items out of the free text. The extraction is a line-oriented
//! heuristic over common bullet/checkbox/numbering conventions; it has no
//! knowledge of meeting structure beyond that.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::mcp::{McpClient, McpError};

const MIN_ITEM_LEN: usize = 3;
const MAX_ITEM_LEN: usize = 500;
const MAX_ITEMS: usize = 50;

static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").expect("valid regex"));
static ACTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:action|todo|task):\s*(.+)$").expect("valid regex"));

/// An imported transcript with extracted action items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TranscriptImport {
    pub title: String,
    pub content: String,
    pub action_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Fetch a transcript and extract its action items.
pub async fn import_transcript(
    client: &McpClient,
    document_id: &str,
) -> Result<TranscriptImport, McpError> {
    let transcript = client.get_transcript(document_id).await?;
    let action_items = parse_action_items(&transcript.content);

    Ok(TranscriptImport {
        title: transcript.title,
        content: transcript.content,
        action_items,
        created_at: transcript.created_at,
        updated_at: transcript.updated_at,
    })
}

/// Extract candidate action items from transcript text.
///
/// Per non-blank line: strip a bullet (`-`, `*`, `•`), a `[ ]` checkbox,
/// and a `N.` numbering marker; then take the `action:`/`todo:`/`task:`
/// payload when the line carries one, else the stripped remainder. Results
/// outside 3..=500 chars are dropped, duplicates removed preserving first
/// occurrence, capped at 50 items.
pub fn parse_action_items(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let stripped = strip_markers(line);
        let candidate = match ACTION_PREFIX.captures(stripped) {
            Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
            None => stripped,
        }
        .trim();

        let len = candidate.chars().count();
        if !(MIN_ITEM_LEN..=MAX_ITEM_LEN).contains(&len) {
            continue;
        }

        if seen.insert(candidate.to_string()) {
            items.push(candidate.to_string());
            if items.len() >= MAX_ITEMS {
                break;
            }
        }
    }

    items
}

fn strip_markers(line: &str) -> &str {
    let mut rest = line;

    for bullet in ["- ", "* ", "• "] {
        if let Some(after) = rest.strip_prefix(bullet) {
            rest = after.trim_start();
            break;
        }
    }

    if let Some(after) = rest.strip_prefix("[ ]") {
        rest = after.trim_start();
    }

    if let Some(matched) = NUMBERED_MARKER.find(rest) {
        rest = &rest[matched.end()..];
    }

    rest.trim()
}
