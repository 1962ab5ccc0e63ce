//! OpenAI oracle against a canned local HTTP endpoint

use std::time::Duration;

use action_flow::{OracleError, PlanningOracle, RepairOracle, RepairRequest};
use softlight_cli::llm::{OpenAiConfig, OpenAiOracle};
use softlight_core_types::{Action, ActionKind, Plan};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

struct Captured {
    authorization: String,
    body: serde_json::Value,
}

/// Serve one canned `(status, body)` per connection, reporting each request
async fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/v1", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let captured = read_request(&mut stream).await;
            tx.send(captured).unwrap();
            let reply = format!(
                "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    });
    (base, rx)
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers");
        raw.extend_from_slice(&chunk[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let header = |name: &str| {
        head.lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
            })
            .unwrap_or_default()
    };
    let length: usize = header("content-length").parse().unwrap();
    while raw.len() < header_end + length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before body");
        raw.extend_from_slice(&chunk[..n]);
    }
    Captured {
        authorization: header("authorization"),
        body: serde_json::from_slice(&raw[header_end..header_end + length]).unwrap(),
    }
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7}
    })
    .to_string()
}

fn oracle(api_base: String, keys: &[&str]) -> OpenAiOracle {
    OpenAiOracle::new(OpenAiConfig {
        api_keys: keys.iter().map(|key| key.to_string()).collect(),
        model: "gpt-4o-mini".to_string(),
        api_base,
        temperature: 0.2,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn plan_request_carries_task_and_returns_text() {
    let reply = "```yaml\n- action: open\n  target: https://example.com\n```";
    let (base, mut requests) = serve(vec![(200, completion(reply))]).await;
    let oracle = oracle(base, &["sk-test"]);

    let text = oracle
        .generate_plan("check example.com", "EXAMPLE:\nA sample page.")
        .await
        .unwrap();
    assert_eq!(Plan::parse(&text).unwrap().len(), 1);

    let captured = requests.recv().await.unwrap();
    assert_eq!(captured.authorization, "Bearer sk-test");
    assert_eq!(captured.body["model"], "gpt-4o-mini");
    let user = captured.body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Task: check example.com"));
    assert!(user.contains("A sample page."));
}

#[tokio::test]
async fn rate_limited_key_falls_through_to_next() {
    let limited = r#"{"error":{"message":"Rate limit reached"}}"#.to_string();
    let (base, mut requests) = serve(vec![
        (429, limited),
        (200, completion("- action: wait_for")),
    ])
    .await;
    let oracle = oracle(base, &["first", "second"]);

    let request = RepairRequest {
        attempt: 1,
        app: "generic".to_string(),
        failed_step: 1,
        action: Action::new(ActionKind::FindAndClick, Some("#go"), None).unwrap(),
        error: "no clickable element".to_string(),
        plan: Plan::new(vec![Action::new(ActionKind::FindAndClick, Some("#go"), None).unwrap()]),
    };
    let text = oracle.repair(&request).await.unwrap();
    assert_eq!(text, "- action: wait_for");

    assert_eq!(requests.recv().await.unwrap().authorization, "Bearer first");
    let second = requests.recv().await.unwrap();
    assert_eq!(second.authorization, "Bearer second");
    let user = second.body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("no clickable element"));
}

#[tokio::test]
async fn blank_completion_is_empty_response() {
    let (base, _requests) = serve(vec![(200, completion("   "))]).await;
    let err = oracle(base, &["sk-test"])
        .generate_plan("anything", "")
        .await
        .unwrap_err();
    assert_eq!(err, OracleError::EmptyResponse);
}

#[tokio::test]
async fn server_error_is_request_failure() {
    let (base, _requests) = serve(vec![(500, "{}".to_string())]).await;
    let err = oracle(base, &["sk-test"])
        .generate_plan("anything", "")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Request(message) if message.contains("500")));
}
