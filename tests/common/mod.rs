//! In-process stand-in for an sqscpp server: just enough of the SQS JSON
//! protocol to drive the client end to end, plus a request log and
//! per-action response stubs.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use sqscpp_cli::{Action, SqsClient};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const ACCOUNT_ID: &str = "000000000000";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub status: u16,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn action(&self) -> Option<Action> {
        self.header("x-amz-target").and_then(Action::from_target)
    }
}

#[derive(Debug, Default)]
pub struct Queue {
    pub attributes: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub messages: VecDeque<(String, String)>,
    pub in_flight: HashMap<String, (String, String)>,
}

#[derive(Default)]
struct Store {
    queues: BTreeMap<String, Queue>,
    requests: Vec<RecordedRequest>,
    stubs: HashMap<Action, (u16, String)>,
    next_id: u64,
}

#[derive(Clone)]
struct ServerState {
    addr: SocketAddr,
    state: Arc<Mutex<Store>>,
}

pub struct FakeSqs {
    addr: SocketAddr,
    state: Arc<Mutex<Store>>,
    handle: JoinHandle<()>,
}

impl FakeSqs {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(Store::default()));

        // Every action is a POST to the root path; the target header picks
        // the handler.
        let app = Router::new()
            .route("/", post(dispatch))
            .with_state(ServerState {
                addr,
                state: state.clone(),
            });

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn client(&self) -> SqsClient {
        SqsClient::new("127.0.0.1", self.port()).unwrap()
    }

    pub fn queue_url(&self, name: &str) -> String {
        queue_url(self.addr, name)
    }

    /// Makes every subsequent call to `action` answer with `status` and a raw
    /// `body` instead of being handled.
    pub fn stub(&self, action: Action, status: u16, body: &str) {
        self.state
            .lock()
            .unwrap()
            .stubs
            .insert(action, (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.requests()
            .iter()
            .filter_map(RecordedRequest::action)
            .collect()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.state.lock().unwrap().queues.keys().cloned().collect()
    }

    pub fn with_queue<R>(&self, name: &str, f: impl FnOnce(&Queue) -> R) -> Option<R> {
        self.state.lock().unwrap().queues.get(name).map(f)
    }
}

impl Drop for FakeSqs {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn queue_url(addr: SocketAddr, name: &str) -> String {
    format!("http://{}/{}/{}", addr, ACCOUNT_ID, name)
}

async fn dispatch(
    State(server): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let action = headers
        .get("x-amz-target")
        .and_then(|target| Action::from_target(target));

    let (status, response) = {
        let mut state = server.state.lock().unwrap();
        let (status, response) = match action {
            Some(action) => match state.stubs.get(&action) {
                Some((status, raw)) => (*status, raw.clone()),
                None => {
                    let (status, value) = handle(&mut state, server.addr, action, &body);
                    (status, value.to_string())
                }
            },
            None => (
                400,
                json!({"__type": "InvalidAction", "Message": "Unknown target"}).to_string(),
            ),
        };
        state.requests.push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            headers,
            body,
            status,
        });
        (status, response)
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/x-amz-json-1.0")],
        response,
    )
        .into_response()
}

fn bad_request(kind: &str, message: &str) -> (u16, Value) {
    (400, json!({"__type": kind, "Message": message}))
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn handle(state: &mut Store, addr: SocketAddr, action: Action, body: &Value) -> (u16, Value) {
    let queue_name = body["QueueName"].as_str().unwrap_or_default().to_string();
    let url_name = body["QueueUrl"]
        .as_str()
        .and_then(|url| url.rsplit('/').next())
        .unwrap_or_default()
        .to_string();

    match action {
        Action::CreateQueue => {
            if queue_name.is_empty() {
                return bad_request("MissingParameter", "QueueName is required");
            }
            let queue = state.queues.entry(queue_name.clone()).or_default();
            queue.attributes = string_map(&body["Attributes"]);
            (200, json!({"QueueUrl": queue_url(addr, &queue_name)}))
        }
        Action::GetQueueUrl => {
            if state.queues.contains_key(&queue_name) {
                (200, json!({"QueueUrl": queue_url(addr, &queue_name)}))
            } else {
                bad_request("QueueDoesNotExist", "The specified queue does not exist")
            }
        }
        Action::ListQueues => {
            let urls: Vec<String> = state
                .queues
                .keys()
                .map(|name| queue_url(addr, name))
                .collect();
            (200, json!({"QueueUrls": urls}))
        }
        Action::DeleteQueue => match state.queues.remove(&url_name) {
            Some(_) => (200, json!({})),
            None => bad_request("QueueDoesNotExist", "The specified queue does not exist"),
        },
        _ => {
            let next_id = state.next_id;
            let Some(queue) = state.queues.get_mut(&url_name) else {
                return bad_request("QueueDoesNotExist", "The specified queue does not exist");
            };
            let (status, value, consumed_ids) = handle_queue_action(queue, action, body, next_id);
            state.next_id += consumed_ids;
            (status, value)
        }
    }
}

fn handle_queue_action(
    queue: &mut Queue,
    action: Action,
    body: &Value,
    next_id: u64,
) -> (u16, Value, u64) {
    match action {
        Action::ListQueueTags => (200, json!({"Tags": queue.tags}), 0),
        Action::TagQueue => {
            queue.tags.extend(string_map(&body["Tags"]));
            (200, json!({}), 0)
        }
        Action::UntagQueue => {
            for key in body["TagKeys"].as_array().into_iter().flatten() {
                if let Some(key) = key.as_str() {
                    queue.tags.remove(key);
                }
            }
            (200, json!({}), 0)
        }
        Action::SendMessage => match body["MessageBody"].as_str() {
            Some(message_body) if !message_body.is_empty() => {
                let id = format!("msg-{}", next_id);
                queue
                    .messages
                    .push_back((id.clone(), message_body.to_string()));
                (200, json!({"MessageId": id}), 1)
            }
            _ => {
                let (status, value) = bad_request("MissingParameter", "MessageBody is required");
                (status, value, 0)
            }
        },
        Action::PurgeQueue => {
            queue.messages.clear();
            (200, json!({}), 0)
        }
        Action::ReceiveMessage => {
            let max = body["MaxNumberOfMessages"].as_u64().unwrap_or(1) as usize;
            let mut messages = Vec::new();
            let mut consumed = 0;
            while messages.len() < max {
                let Some((id, message_body)) = queue.messages.pop_front() else {
                    break;
                };
                let receipt_handle = format!("rh-{}", next_id + consumed);
                consumed += 1;
                messages.push(json!({
                    "MessageId": id,
                    "ReceiptHandle": receipt_handle,
                    "Body": message_body,
                }));
                queue
                    .in_flight
                    .insert(receipt_handle, (id, message_body));
            }
            if messages.is_empty() {
                (200, json!({}), consumed)
            } else {
                (200, json!({"Messages": messages}), consumed)
            }
        }
        Action::DeleteMessage => {
            let handle = body["ReceiptHandle"].as_str().unwrap_or_default();
            match queue.in_flight.remove(handle) {
                Some(_) => (200, json!({}), 0),
                None => {
                    let (status, value) =
                        bad_request("ReceiptHandleIsInvalid", "The receipt handle is invalid");
                    (status, value, 0)
                }
            }
        }
        _ => {
            let (status, value) = bad_request("InvalidAction", "Unsupported action");
            (status, value, 0)
        }
    }
}
