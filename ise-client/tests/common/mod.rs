//! In-process mock of the assessment service
//!
//! Accepts a single WebSocket connection, records every inbound frame and
//! answers according to a scripted behaviour.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use ise_client::network::ServiceEndpoint;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;

pub const SENTENCE_MARKUP: &str = r#"<xml_result><read_sentence><rec_paper><read_sentence total_score="87.3" fluency_score="90.0" integrity_score="85.0" phone_score="88.0" tone_score="86.0" is_rejected="false"/></rec_paper></read_sentence></xml_result>"#;

/// How the mock answers
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Ack the control frame, answer the last audio frame with the final result
    Complete { markup: String },

    /// Like `Complete`, but send a malformed frame first
    CompleteWithNoise { markup: String },

    /// Send the final result right after the control frame
    CompleteEarly { markup: String },

    /// Send an error frame after `after` inbound frames, then keep recording
    Fail {
        after: usize,
        code: i64,
        message: String,
    },

    /// Send `frame` verbatim after `after` inbound frames, then keep recording
    SendRaw { after: usize, frame: String },

    /// Close the connection after `after` inbound frames
    CloseAfter { after: usize },

    /// Never answer
    Silent,

    /// Refuse the handshake with the given HTTP status
    RejectHandshake { status: u16 },
}

pub struct MockIseServer {
    addr: SocketAddr,
    frames: Arc<Mutex<Vec<Value>>>,
    request_uri: Arc<Mutex<Option<String>>>,
    handle: JoinHandle<()>,
}

impl MockIseServer {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let frames = Arc::new(Mutex::new(Vec::new()));
        let request_uri = Arc::new(Mutex::new(None));

        let handle = tokio::spawn(serve(
            listener,
            behaviour,
            Arc::clone(&frames),
            Arc::clone(&request_uri),
        ));

        Self {
            addr,
            frames,
            request_uri,
            handle,
        }
    }

    /// Endpoint pointing at this server over plain `ws`
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(self.addr.to_string()).with_scheme("ws")
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the connection to end and return the recorded frames
    pub async fn finish(self) -> (Vec<Value>, Option<String>) {
        let handle = self.handle;
        if tokio::time::timeout(Duration::from_secs(3), handle).await.is_err() {
            println!("mock server still running, returning frames recorded so far");
        }

        let frames = self.frames.lock().unwrap().clone();
        let uri = self.request_uri.lock().unwrap().clone();
        (frames, uri)
    }
}

async fn serve(
    listener: TcpListener,
    behaviour: Behaviour,
    frames: Arc<Mutex<Vec<Value>>>,
    request_uri: Arc<Mutex<Option<String>>>,
) {
    let (stream, _) = listener.accept().await.unwrap();

    let reject = match behaviour {
        Behaviour::RejectHandshake { status } => Some(status),
        _ => None,
    };

    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        *request_uri.lock().unwrap() = Some(req.uri().to_string());
        match reject {
            Some(status) => Err(http::Response::builder()
                .status(status)
                .body(Some("rejected".to_string()))
                .unwrap()),
            None => Ok(resp),
        }
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let (mut write, mut read) = ws_stream.split();

    let mut count = 0usize;

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let frame: Value = serde_json::from_str(&text).unwrap();
        let is_control = frame["business"]["cmd"] == "ssb";
        let is_last_audio = frame["business"]["aus"] == 4;
        frames.lock().unwrap().push(frame);
        count += 1;

        let replies = match &behaviour {
            Behaviour::Complete { markup } if is_last_audio => {
                vec![intermediate(1), final_result(markup)]
            }
            Behaviour::CompleteWithNoise { markup } if is_last_audio => vec![
                "{not json".to_string(),
                intermediate(1),
                final_result(markup),
            ],
            Behaviour::Complete { .. } | Behaviour::CompleteWithNoise { .. } if is_control => {
                vec![intermediate(0)]
            }
            Behaviour::CompleteEarly { markup } if is_control => vec![final_result(markup)],
            Behaviour::Fail {
                after,
                code,
                message,
            } if count == *after => vec![error_frame(*code, message)],
            Behaviour::SendRaw { after, frame } if count == *after => vec![frame.clone()],
            Behaviour::CloseAfter { after } if count == *after => {
                let _ = write.close().await;
                break;
            }
            _ => Vec::new(),
        };

        for reply in replies {
            if write.send(Message::Text(reply.into())).await.is_err() {
                return;
            }
        }
    }
}

pub fn intermediate(status: u8) -> String {
    json!({
        "code": 0,
        "message": "success",
        "sid": "ise-mock-0001",
        "data": { "status": status }
    })
    .to_string()
}

pub fn final_result(markup: &str) -> String {
    json!({
        "code": 0,
        "message": "success",
        "sid": "ise-mock-0001",
        "data": { "status": 2, "data": STANDARD.encode(markup) }
    })
    .to_string()
}

pub fn error_frame(code: i64, message: &str) -> String {
    json!({
        "code": code,
        "message": message,
        "sid": "ise-mock-0001"
    })
    .to_string()
}

/// Deterministic PCM test signal of `len` bytes
pub fn pcm(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Concatenate the decoded payloads of the recorded audio frames
pub fn decoded_audio(frames: &[Value]) -> Vec<u8> {
    frames
        .iter()
        .filter(|f| f["business"]["cmd"] == "auw")
        .flat_map(|f| STANDARD.decode(f["data"]["data"].as_str().unwrap()).unwrap())
        .collect()
}
