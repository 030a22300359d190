//! MCP client behavior against a mocked JSON-RPC endpoint, covering both
//! response framings and the error taxonomy.

use integrations::mcp::{McpClient, McpError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(mock_server: &MockServer, token: Option<&str>) -> McpClient {
    McpClient::new(
        reqwest::Client::new(),
        mock_server.uri(),
        token.map(str::to_string),
    )
}

/// Every conversation starts with initialize; responds to it generically.
async fn mount_initialize(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("\"initialize\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"protocolVersion": "2024-11-05", "capabilities": {}}
        })))
        .mount(mock_server)
        .await;
}

async fn mount_tools_list(mock_server: &MockServer, names: &[&str]) {
    let tools: Vec<_> = names.iter().map(|name| json!({"name": name})).collect();
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("tools/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"tools": tools}
        })))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_list_documents_plain_json_framing() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["search_meetings", "other_tool"]).await;

    let payload = json!({
        "documents": [
            {"id": "doc-1", "title": "Weekly sync"},
            {"meeting_id": "doc-2", "name": "Planning"},
        ]
    });
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("tools/call"))
        .and(body_string_contains("search_meetings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "content": [{"type": "text", "text": payload.to_string()}]
            }
        })))
        .mount(&mock_server)
        .await;

    let docs = client(&mock_server, None)
        .list_documents(None)
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "doc-1");
    assert_eq!(docs[0].title.as_deref(), Some("Weekly sync"));
    assert_eq!(docs[1].id, "doc-2");
    assert_eq!(docs[1].title.as_deref(), Some("Planning"));
}

#[tokio::test]
async fn test_list_documents_sse_framing() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["list_meetings"]).await;

    let payload = json!([{"id": "sse-doc", "title": "From the stream"}]);
    let rpc = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "result": {"content": [{"type": "text", "text": payload.to_string()}]}
    });
    let sse_body = format!("event: message\ndata: {}\n\n", rpc);

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let docs = client(&mock_server, None)
        .list_documents(None)
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "sse-doc");
}

#[tokio::test]
async fn test_bearer_token_is_sent_when_present() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer granola-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server, Some("granola-token"))
        .ensure_initialized()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_401_maps_to_authentication_required() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .ensure_initialized()
        .await
        .unwrap_err();
    assert!(matches!(error, McpError::AuthenticationRequired));
    let message = error.to_string();
    assert!(message.contains("OAuth"));
    assert!(message.contains("PROJECTOS_GRANOLA_MCP_TOKEN"));
}

#[tokio::test]
async fn test_406_maps_to_not_acceptable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(406))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .ensure_initialized()
        .await
        .unwrap_err();
    assert!(matches!(error, McpError::NotAcceptable));
    assert!(error.to_string().contains("text/event-stream"));
}

#[tokio::test]
async fn test_other_statuses_map_to_transport() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .ensure_initialized()
        .await
        .unwrap_err();
    match error {
        McpError::Transport { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_json_body_is_protocol_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .ensure_initialized()
        .await
        .unwrap_err();
    assert!(matches!(error, McpError::Protocol(_)));
    assert!(error.to_string().contains("invalid JSON response"));
}

#[tokio::test]
async fn test_jsonrpc_error_member_is_protocol_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "method not found"}
        })))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .ensure_initialized()
        .await
        .unwrap_err();
    match error {
        McpError::Protocol(message) => assert_eq!(message, "method not found"),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_suitable_list_tool_reports_catalog() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["alpha", "beta"]).await;

    let error = client(&mock_server, None)
        .list_documents(None)
        .await
        .unwrap_err();
    match &error {
        McpError::NoSuitableTool { available, .. } => {
            assert_eq!(available, &vec!["alpha".to_string(), "beta".to_string()]);
        }
        other => panic!("expected NoSuitableTool, got {other:?}"),
    }
    assert!(error.to_string().contains("alpha, beta"));
}

#[tokio::test]
async fn test_malformed_list_content_yields_empty_list() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["list_meetings"]).await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": "not valid json at all"}]}
        })))
        .mount(&mock_server)
        .await;

    let docs = client(&mock_server, None)
        .list_documents(None)
        .await
        .unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn test_get_transcript_uses_meeting_id_argument() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["get_meeting_transcript"]).await;

    let payload = json!({
        "title": "Kickoff",
        "content": "- Follow up with client\nTODO: send notes",
        "created_at": "2025-05-01T10:00:00Z"
    });
    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .and(body_string_contains("meeting_id"))
        .and(body_string_contains("doc-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": payload.to_string()}]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transcript = client(&mock_server, None)
        .get_transcript("doc-42")
        .await
        .unwrap();
    assert_eq!(transcript.title, "Kickoff");
    assert!(transcript.content.contains("Follow up"));
    assert_eq!(transcript.created_at.as_deref(), Some("2025-05-01T10:00:00Z"));
}

#[tokio::test]
async fn test_get_transcript_blank_title_gets_default() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["get_granola_document"]).await;

    let payload = json!({"title": "  ", "content": "hello"});
    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": payload.to_string()}]}
        })))
        .mount(&mock_server)
        .await;

    let transcript = client(&mock_server, None)
        .get_transcript("doc-7")
        .await
        .unwrap();
    assert_eq!(transcript.title, "Meeting transcript");
}

#[tokio::test]
async fn test_get_transcript_embedded_error_is_protocol_error() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["get_granola_transcript"]).await;

    let payload = json!({"error": "document not found"});
    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": [{"type": "text", "text": payload.to_string()}]}
        })))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .get_transcript("missing-doc")
        .await
        .unwrap_err();
    assert!(matches!(error, McpError::Protocol(_)));
    assert!(error.to_string().contains("document not found"));
}

#[tokio::test]
async fn test_get_transcript_with_no_content_block_is_protocol_error() {
    let mock_server = MockServer::start().await;
    mount_initialize(&mock_server).await;
    mount_tools_list(&mock_server, &["get_granola_transcript"]).await;

    Mock::given(method("POST"))
        .and(body_string_contains("tools/call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {"content": []}
        })))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, None)
        .get_transcript("doc-1")
        .await
        .unwrap_err();
    assert!(error.to_string().contains("no text content block"));
}
