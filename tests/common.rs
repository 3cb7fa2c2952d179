#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use parking_lot::Mutex;
use serde_json::json;
use user_api_harness::config::{SessionConfig, ToolFailurePolicy};
use user_api_harness::{DatabaseTool, DumpMode, HarnessError};

/// How the mock user service answers `/create/{username}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// 200 for new names, 409 for known ones.
    Correct,
    /// Like `Correct`, but the body carries an extra `id` field.
    ExtraField,
    /// Always 200, even for duplicates.
    AcceptDuplicates,
    /// 200 with an HTML body for new names, 409 for known ones.
    NotJson,
}

struct MockState {
    behavior: Behavior,
    users: Mutex<HashSet<String>>,
    requests: Mutex<usize>,
}

async fn create_user(path: web::Path<String>, state: web::Data<MockState>) -> HttpResponse {
    let username = path.into_inner();
    *state.requests.lock() += 1;

    let inserted = state.users.lock().insert(username.clone());
    if !inserted && state.behavior != Behavior::AcceptDuplicates {
        return HttpResponse::Conflict().json(json!({
            "error": "Conflict",
            "message": format!("username {} already exists", username),
        }));
    }

    if state.behavior == Behavior::NotJson {
        return HttpResponse::Ok()
            .content_type("text/html")
            .body("<html><body>created</body></html>");
    }

    let mut body = json!({
        "username": username,
        "password": "123456",
        "status": 1,
        "remark": "",
    });
    if state.behavior == Behavior::ExtraField {
        body["id"] = json!(42);
    }
    HttpResponse::Ok().json(body)
}

/// In-process user API bound to an ephemeral localhost port.
pub struct MockApi {
    pub root: String,
    state: web::Data<MockState>,
    handle: ServerHandle,
}

impl MockApi {
    pub async fn start(behavior: Behavior) -> Self {
        let state = web::Data::new(MockState {
            behavior,
            users: Mutex::new(HashSet::new()),
            requests: Mutex::new(0),
        });

        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .route("/api/user/create/{username}", web::get().to(create_user))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind mock API");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            root: format!("http://{}/api/user", addr),
            state,
            handle,
        }
    }

    pub fn request_count(&self) -> usize {
        *self.state.requests.lock()
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.state.users.lock().contains(username)
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

/// Which fake tool call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    FullDump,
    SchemaDump,
    SchemaReload,
    FullRestore,
}

const SCHEMA_LINE: &str = "CREATE TABLE user (username VARCHAR(64));";

/// Database tool backed by an in-memory row list. Dumps are real files
/// so the session's paths get exercised.
#[derive(Default)]
pub struct FakeDatabase {
    rows: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<FailOn>>,
}

impl FakeDatabase {
    pub fn with_rows(rows: &[&str]) -> Self {
        let db = Self::default();
        *db.rows.lock() = rows.iter().map(|r| r.to_string()).collect();
        db
    }

    pub fn fail_on(self, step: FailOn) -> Self {
        *self.fail_on.lock() = Some(step);
        self
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock() = None;
    }

    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().clone()
    }

    pub fn insert(&self, row: &str) {
        self.rows.lock().push(row.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn failure(&self, step: FailOn) -> Result<(), HarnessError> {
        if *self.fail_on.lock() == Some(step) {
            return Err(HarnessError::ToolExit {
                program: "fake".to_string(),
                code: 2,
            });
        }
        Ok(())
    }
}

impl DatabaseTool for FakeDatabase {
    fn dump(&self, mode: DumpMode, out: &Path) -> Result<(), HarnessError> {
        let (call, step) = match mode {
            DumpMode::Full => ("dump:full", FailOn::FullDump),
            DumpMode::SchemaOnly => ("dump:schema", FailOn::SchemaDump),
        };
        self.calls.lock().push(call.to_string());
        self.failure(step)?;

        let mut lines = vec![SCHEMA_LINE.to_string()];
        if mode == DumpMode::Full {
            lines.extend(self.rows());
        }
        fs::write(out, lines.join("\n")).map_err(|e| HarnessError::File {
            path: out.to_path_buf(),
            source: e,
        })
    }

    fn restore(&self, input: &Path) -> Result<(), HarnessError> {
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().push(format!("restore:{}", file_name));

        let step = if file_name == "_db_init.sql" {
            FailOn::SchemaReload
        } else {
            FailOn::FullRestore
        };
        self.failure(step)?;

        let content = fs::read_to_string(input).map_err(|e| HarnessError::File {
            path: input.to_path_buf(),
            source: e,
        })?;
        *self.rows.lock() = content
            .lines()
            .filter(|line| *line != SCHEMA_LINE && !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(())
    }
}

pub fn session_config(root: &Path, policy: ToolFailurePolicy) -> SessionConfig {
    SessionConfig {
        lock_path: root.join(".lock"),
        work_dir: root.join("tmp"),
        failure_policy: policy,
    }
}

/// Executable stand-in for `mysql` that ignores its arguments and appends
/// whatever arrives on stdin to `capture`.
#[cfg(unix)]
pub fn capture_client(dir: &Path, capture: &Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-mysql");
    fs::write(&script, format!("#!/bin/sh\ncat >> '{}'\n", capture.display()))
        .expect("Failed to write client script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
        .expect("Failed to make client script executable");
    script.to_string_lossy().into_owned()
}
