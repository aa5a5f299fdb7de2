//! In-process fake of the metadata service and the mail API.
//!
//! Serves both APIs from one listener: metadata under `/meta`, mail under
//! `/v1.0/me`. State is shared so tests can seed data, inject failures and
//! inspect the requests that were made.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// One request as seen by the server, with the path percent-decoded.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub raw_target: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub customer_profile: String,
    pub object_name: String,
    pub folder_name: String,
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub profiles: BTreeMap<String, Profile>,
    pub listings: BTreeMap<String, Vec<Value>>,
    /// Mail folders as `(id, displayName)`.
    pub folders: Vec<(String, String)>,
    /// Folders per listing page; 0 means one page.
    pub folder_page_size: usize,
    /// Any request whose decoded path contains one of these gets a 500.
    pub fail_paths: Vec<String>,
    /// Drafts as `(draft id, source id, comment)`.
    pub drafts: Vec<(String, String, String)>,
    /// Moves as `(draft id, folder id)`.
    pub moves: Vec<(String, String)>,
    pub deleted: HashSet<String>,
    pub requests: Vec<RecordedRequest>,
    next_id: u64,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

pub struct FakeBackend {
    port: u16,
    state: Arc<Mutex<BackendState>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeBackend {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake backend");
        let port = listener.local_addr().unwrap().port();
        listener
            .set_nonblocking(true)
            .expect("set_nonblocking on listener");

        let state = Arc::new(Mutex::new(BackendState::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let state = state.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || Self::serve(listener, state, shutdown, port))
        };

        FakeBackend {
            port,
            state,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn metadata_url(&self) -> String {
        format!("http://127.0.0.1:{}/meta", self.port)
    }

    pub fn mail_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1.0/me", self.port)
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn add_profile(&self, email_id: &str, profile: &str, object: &str, folder: &str) {
        self.state().profiles.insert(
            email_id.to_string(),
            Profile {
                customer_profile: profile.to_string(),
                object_name: object.to_string(),
                folder_name: folder.to_string(),
            },
        );
    }

    pub fn add_listing(&self, folder: &str, emails: &[(&str, f64)]) {
        let emails = emails
            .iter()
            .map(|(id, rating)| {
                json!({ "outlookEmailId": id, "customerProfile": "", "rating": rating })
            })
            .collect();
        self.state().listings.insert(folder.to_string(), emails);
    }

    pub fn add_folder(&self, id: &str, display_name: &str) {
        self.state()
            .folders
            .push((id.to_string(), display_name.to_string()));
    }

    pub fn fail_path(&self, fragment: &str) {
        self.state().fail_paths.push(fragment.to_string());
    }

    pub fn requests_matching(&self, fragment: &str) -> Vec<RecordedRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.path.contains(fragment))
            .cloned()
            .collect()
    }

    fn serve(
        listener: TcpListener,
        state: Arc<Mutex<BackendState>>,
        shutdown: Arc<AtomicBool>,
        port: u16,
    ) {
        while !shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .expect("set blocking on stream");
                    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
                    let state = state.clone();
                    thread::spawn(move || Self::handle_connection(stream, &state, port));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    }

    fn handle_connection(mut stream: TcpStream, state: &Mutex<BackendState>, port: u16) {
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }

        let mut content_length: usize = 0;
        let mut authorized = false;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).is_err() {
                return;
            }
            let trimmed = header.trim();
            if trimmed.is_empty() {
                break;
            }
            let Some((name, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("authorization") {
                authorized = value.starts_with("Bearer ") && value.len() > "Bearer ".len();
            }
        }

        let body = if content_length > 0 {
            let mut buf = vec![0u8; content_length];
            if reader.read_exact(&mut buf).is_err() {
                return;
            }
            serde_json::from_slice(&buf).unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            return;
        }
        let method = parts[0].to_string();
        let raw_target = parts[1].to_string();
        let (raw_path, raw_query) = raw_target
            .split_once('?')
            .unwrap_or((raw_target.as_str(), ""));
        let segments: Vec<String> = raw_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(percent_decode)
            .collect();
        let query: BTreeMap<String, String> = raw_query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (percent_decode(k), percent_decode(&v.replace('+', " "))))
            .collect();
        let path = format!("/{}", segments.join("/"));

        let (status, response) = {
            let mut state = state.lock().unwrap();
            state.requests.push(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                raw_target: raw_target.clone(),
                body: body.clone(),
            });

            if state.fail_paths.iter().any(|f| path.contains(f.as_str())) {
                ("500 Internal Server Error", Some(json!({"error": "injected"})))
            } else {
                let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
                match segs.as_slice() {
                    ["meta", endpoint] if method == "GET" => {
                        Self::handle_metadata(&state, endpoint, &query)
                    }
                    ["v1.0", "me", ..] if !authorized => {
                        ("401 Unauthorized", Some(json!({"error": "unauthorized"})))
                    }
                    ["v1.0", "me", rest @ ..] => {
                        Self::handle_mail(&mut state, &method, rest, &query, &body, port)
                    }
                    _ => ("404 Not Found", Some(json!({"error": "not found"}))),
                }
            }
        };

        let body = response.map(|v| v.to_string()).unwrap_or_default();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    }

    fn handle_metadata(
        state: &BackendState,
        endpoint: &str,
        query: &BTreeMap<String, String>,
    ) -> (&'static str, Option<Value>) {
        let not_found = ("404 Not Found", Some(json!({"error": "unknown"})));
        if endpoint == "fetchEmailsByFolderName" {
            let Some(folder) = query.get("folderName") else {
                return ("400 Bad Request", Some(json!({"error": "missing folderName"})));
            };
            return match state.listings.get(folder) {
                Some(emails) => ("200 OK", Some(Value::Array(emails.clone()))),
                None => not_found,
            };
        }

        let Some(profile) = query
            .get("outlookEmailId")
            .and_then(|id| state.profiles.get(id))
        else {
            return not_found;
        };
        match endpoint {
            "fetchCustomerProfile" => (
                "200 OK",
                Some(json!({ "customerProfile": profile.customer_profile })),
            ),
            "fetchName" => ("200 OK", Some(json!({ "objectname": profile.object_name }))),
            "fetchFolderName" => ("200 OK", Some(json!({ "folderName": profile.folder_name }))),
            _ => not_found,
        }
    }

    fn handle_mail(
        state: &mut BackendState,
        method: &str,
        rest: &[&str],
        query: &BTreeMap<String, String>,
        body: &Value,
        port: u16,
    ) -> (&'static str, Option<Value>) {
        match (method, rest) {
            ("GET", ["mailFolders"]) => {
                let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
                let size = if state.folder_page_size == 0 {
                    state.folders.len().max(1)
                } else {
                    state.folder_page_size
                };
                let value: Vec<Value> = state
                    .folders
                    .iter()
                    .skip(page * size)
                    .take(size)
                    .map(|(id, name)| json!({ "id": id, "displayName": name }))
                    .collect();
                let mut response = json!({ "value": value });
                if (page + 1) * size < state.folders.len() {
                    response["@odata.nextLink"] = json!(format!(
                        "http://127.0.0.1:{}/v1.0/me/mailFolders?page={}",
                        port,
                        page + 1
                    ));
                }
                ("200 OK", Some(response))
            }
            ("POST", ["mailFolders"]) => {
                let Some(name) = body.get("displayName").and_then(Value::as_str) else {
                    return ("400 Bad Request", Some(json!({"error": "missing displayName"})));
                };
                let id = state.next_id("folder");
                state.folders.push((id.clone(), name.to_string()));
                ("201 Created", Some(json!({ "id": id, "displayName": name })))
            }
            ("POST", ["messages", source, "createReply"]) => {
                if state.deleted.contains(*source) {
                    return ("404 Not Found", Some(json!({"error": "message deleted"})));
                }
                let comment = body
                    .get("comment")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let id = state.next_id("draft");
                state
                    .drafts
                    .push((id.clone(), source.to_string(), comment));
                ("201 Created", Some(json!({ "id": id })))
            }
            ("POST", ["messages", draft, "move"]) => {
                let Some(destination) = body.get("destinationId").and_then(Value::as_str) else {
                    return ("400 Bad Request", Some(json!({"error": "missing destinationId"})));
                };
                if !state.folders.iter().any(|(id, _)| id == destination) {
                    return ("404 Not Found", Some(json!({"error": "no such folder"})));
                }
                state.moves.push((draft.to_string(), destination.to_string()));
                let id = state.next_id("moved");
                ("201 Created", Some(json!({ "id": id })))
            }
            ("DELETE", ["messages", source]) => {
                if !state.deleted.insert(source.to_string()) {
                    return ("404 Not Found", Some(json!({"error": "already deleted"})));
                }
                ("204 No Content", None)
            }
            _ => ("404 Not Found", Some(json!({"error": "not found"}))),
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
