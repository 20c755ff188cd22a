//! Command-line behavior that needs no model access

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::TcpListener;
use tempfile::TempDir;

/// A `conductor` command isolated from the caller's config and keys
fn conductor(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("conductor").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("NO_COLOR", "1")
        .env_remove("GEMINI_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("CONDUCTOR_PROTOCOL")
        .env_remove("CONDUCTOR_MODEL")
        .env_remove("CONDUCTOR_BASE_URL");
    cmd
}

/// Serve one canned Gemini answer on a local port and return its base URL
fn serve_gemini_answer(answer: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let body = serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": answer}]},
            "finishReason": "STOP"
        }]
    })
    .to_string();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + length {
                    break;
                }
            }
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .unwrap();
    });

    base_url
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    conductor(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-turns"))
        .stdout(predicate::str::contains("--trajectory-file"));
}

#[test]
fn test_tools_lists_catalog() {
    let dir = TempDir::new().unwrap();
    conductor(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("current_time"))
        .stdout(predicate::str::contains("read_file"));
}

#[test]
fn test_missing_configuration_fails() {
    let dir = TempDir::new().unwrap();
    conductor(&dir)
        .arg("What time is it?")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration found"));
}

#[test]
fn test_no_query_fails() {
    let dir = TempDir::new().unwrap();
    conductor(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No query given"));
}

#[test]
fn test_unreachable_model_fails_with_transcript() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("conductor.json"),
        serde_json::json!({
            "protocol": "google_ai",
            "api_key": "test-key",
            "base_url": "http://127.0.0.1:9",
            "orchestrator": {"max_model_retries": 0, "model_timeout_ms": 2000}
        })
        .to_string(),
    )
    .unwrap();
    let trajectory = dir.path().join("out").join("trajectory.json");

    conductor(&dir)
        .arg("--trajectory-file")
        .arg(&trajectory)
        .arg("What time is it?")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Model call failed"))
        .stderr(predicate::str::contains("Transcript (1 turns):"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&trajectory).unwrap()).unwrap();
    assert_eq!(saved["metadata"]["success"], false);
    assert_eq!(saved["metadata"]["query"], "What time is it?");
}

#[test]
fn test_env_api_key_reference_must_exist() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.json");
    std::fs::write(
        &config,
        r#"{"protocol": "openai_compat", "api_key": "env:CONDUCTOR_TEST_MISSING_KEY"}"#,
    )
    .unwrap();

    conductor(&dir)
        .env_remove("CONDUCTOR_TEST_MISSING_KEY")
        .arg("--config")
        .arg(&config)
        .arg("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONDUCTOR_TEST_MISSING_KEY"));
}

#[test]
fn test_answer_is_printed_when_trajectory_cannot_be_saved() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("conductor.json"),
        serde_json::json!({
            "protocol": "google_ai",
            "api_key": "test-key",
            "base_url": serve_gemini_answer("It is noon."),
            "orchestrator": {"max_model_retries": 0}
        })
        .to_string(),
    )
    .unwrap();
    // A regular file where the trajectory's parent directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    conductor(&dir)
        .arg("--trajectory-file")
        .arg(blocker.join("trajectory.json"))
        .arg("What time is it?")
        .assert()
        .success()
        .stdout(predicate::str::contains("It is noon."))
        .stderr(predicate::str::contains("Failed to save trajectory"));
}
