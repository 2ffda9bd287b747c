#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Starts the sidecar with `args`, never picking up endpoint settings from
/// the environment running the tests.
pub fn spawn_sidecar(args: &[&str]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .args(args)
        .env_remove("ATTENDANCE_ENDPOINT")
        .env_remove("ATTENDANCE_ACTIVE_DATE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send(stdin: &mut ChildStdin, id: &str, method: &str, params: serde_json::Value) {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
}

/// Next line on stdout, parsed.
pub fn read_line(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "sidecar closed stdout");
    serde_json::from_str(line.trim()).expect("parse response json")
}

/// Reads until the response for `id`, collecting notices seen on the way.
pub fn read_response(
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    notices: &mut Vec<serde_json::Value>,
) -> serde_json::Value {
    loop {
        let value = read_line(reader);
        if value.get("event").and_then(|v| v.as_str()) == Some("notice") {
            notices.push(value);
            continue;
        }
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        return value;
    }
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    send(stdin, id, method, params);
    let mut notices = Vec::new();
    read_response(reader, id, &mut notices)
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().unwrap_or_else(|| json!({}))
}

/// Two classrooms; s3 joined on 2024-01-11.
pub fn sample_roster() -> serde_json::Value {
    json!([
        {
            "id": "10001", "studentNumber": 2, "name": "Anan", "grade": "ม.5", "classroom": 1,
            "attendance": [
                { "date": "2024-01-09", "status": "มา" },
                { "date": "2024-01-10", "status": "ลา" },
                { "date": "2024-01-11", "status": "มา" }
            ]
        },
        {
            "id": "10002", "studentNumber": 1, "name": "Busaba", "grade": "ม.5", "classroom": 1,
            "attendance": [
                { "date": "2024-01-09", "status": "ขาด" },
                { "date": "2024-01-10", "status": "ขาด" },
                { "date": "2024-01-11", "status": "มา" }
            ]
        },
        {
            "id": "10003", "studentNumber": 1, "name": "Chai", "grade": "ม.5", "classroom": 2,
            "attendance": [
                { "date": "2024-01-11T00:00:00.000Z", "status": "กิจกรรม" }
            ]
        }
    ])
}

/// Backend double serving `roster` on GET /exec.
pub async fn sheet_server(roster: serde_json::Value) -> wiremock::MockServer {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/exec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(roster))
        .mount(&server)
        .await;
    server
}

pub fn endpoint_of(server: &wiremock::MockServer) -> String {
    format!("{}/exec", server.uri())
}
