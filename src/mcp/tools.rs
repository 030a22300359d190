//! Tool-selection heuristics for operator-defined MCP catalogs.
//!
//! Remote servers expose arbitrary tool names, so selection runs a fixed
//! priority list first and falls back through progressively looser name
//! matching. Pure functions, unit-tested independently of any network call.

use serde_json::{Value, json};

/// Known-good list-tool names, in preference order.
const LIST_TOOL_PRIORITY: &[&str] = &[
    "search_meetings",
    "list_granola_documents",
    "list_meetings",
    "query_granola_meetings",
    "get_meetings",
    "search_granola_transcripts",
];

/// Known-good transcript-tool names, in preference order.
const TRANSCRIPT_TOOL_PRIORITY: &[&str] = &[
    "get_granola_transcript",
    "get_meeting_transcript",
    "get_granola_document",
];

/// Pick the tool used to list meetings.
///
/// Tiers, in order: explicit preference, fixed priority list, any
/// `list` + (`granola`|`meeting`) name, any verb + `meeting` name, any
/// `meeting` name that is not a transcript/document fetcher.
pub fn pick_list_tool<'a>(names: &'a [String], preferred: Option<&str>) -> Option<&'a str> {
    if let Some(preferred) = preferred
        && let Some(found) = names.iter().find(|name| name.as_str() == preferred)
    {
        return Some(found);
    }

    for candidate in LIST_TOOL_PRIORITY {
        if let Some(found) = names.iter().find(|name| name.as_str() == *candidate) {
            return Some(found);
        }
    }

    if let Some(found) = names.iter().find(|name| {
        name.contains("list") && (name.contains("granola") || name.contains("meeting"))
    }) {
        return Some(found);
    }

    if let Some(found) = names.iter().find(|name| {
        ["search", "list", "query", "get"]
            .iter()
            .any(|verb| name.contains(verb))
            && name.contains("meeting")
    }) {
        return Some(found);
    }

    names
        .iter()
        .find(|name| {
            name.contains("meeting")
                && !name.contains("transcript")
                && !name.contains("document")
        })
        .map(String::as_str)
}

/// Pick the tool used to fetch a single transcript.
pub fn pick_transcript_tool(names: &[String]) -> Option<&str> {
    for candidate in TRANSCRIPT_TOOL_PRIORITY {
        if let Some(found) = names.iter().find(|name| name.as_str() == *candidate) {
            return Some(found);
        }
    }

    names
        .iter()
        .find(|name| {
            name.contains("get")
                && (name.contains("granola")
                    || (name.contains("meeting") && name.contains("transcript")))
        })
        .map(String::as_str)
}

/// Arguments for a list call, matched to the tool's expected shape.
pub fn list_tool_arguments(tool: &str) -> Value {
    if tool == "search_meetings" {
        json!({"query": "", "limit": 100})
    } else if LIST_TOOL_PRIORITY.contains(&tool) {
        json!({"limit": 100})
    } else {
        json!({})
    }
}

/// Arguments for a transcript fetch; the id key depends on the tool name.
pub fn transcript_tool_arguments(tool: &str, document_id: &str) -> Value {
    if tool.contains("meeting") {
        json!({"meeting_id": document_id})
    } else {
        json!({"id": document_id})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preferred_tool_wins_when_present() {
        let catalog = names(&["search_meetings", "custom_tool"]);
        assert_eq!(
            pick_list_tool(&catalog, Some("custom_tool")),
            Some("custom_tool")
        );
        // Absent preference falls through to the priority list
        assert_eq!(
            pick_list_tool(&catalog, Some("missing_tool")),
            Some("search_meetings")
        );
    }

    #[test]
    fn test_priority_list_order() {
        let catalog = names(&["get_meetings", "list_meetings", "foo"]);
        assert_eq!(pick_list_tool(&catalog, None), Some("list_meetings"));

        let catalog = names(&["search_meetings", "foo"]);
        assert_eq!(pick_list_tool(&catalog, None), Some("search_meetings"));
    }

    #[test]
    fn test_loose_tiers() {
        // list + meeting
        assert_eq!(
            pick_list_tool(&names(&["list_team_meetings"]), None),
            Some("list_team_meetings")
        );
        // verb + meeting
        assert_eq!(
            pick_list_tool(&names(&["query_all_meetings_v2"]), None),
            Some("query_all_meetings_v2")
        );
        // bare meeting, excluding fetchers
        assert_eq!(
            pick_list_tool(&names(&["meeting_index", "meeting_transcript_fetch"]), None),
            Some("meeting_index")
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        assert_eq!(pick_list_tool(&names(&["foo", "bar"]), None), None);
        assert_eq!(pick_list_tool(&[], None), None);
    }

    #[test]
    fn test_transcript_tool_selection() {
        assert_eq!(
            pick_transcript_tool(&names(&["get_meeting_transcript", "get_granola_transcript"])),
            Some("get_granola_transcript")
        );
        assert_eq!(
            pick_transcript_tool(&names(&["fetch_stuff", "get_granola_notes"])),
            Some("get_granola_notes")
        );
        assert_eq!(
            pick_transcript_tool(&names(&["get_meeting_transcript_raw"])),
            Some("get_meeting_transcript_raw")
        );
        assert_eq!(pick_transcript_tool(&names(&["foo"])), None);
    }

    #[test]
    fn test_list_tool_arguments() {
        assert_eq!(
            list_tool_arguments("search_meetings"),
            json!({"query": "", "limit": 100})
        );
        assert_eq!(list_tool_arguments("list_meetings"), json!({"limit": 100}));
        assert_eq!(list_tool_arguments("meeting_index"), json!({}));
    }

    #[test]
    fn test_transcript_tool_arguments() {
        assert_eq!(
            transcript_tool_arguments("get_meeting_transcript", "doc-1"),
            json!({"meeting_id": "doc-1"})
        );
        assert_eq!(
            transcript_tool_arguments("get_granola_document", "doc-1"),
            json!({"id": "doc-1"})
        );
    }
}
