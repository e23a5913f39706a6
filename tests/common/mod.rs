//! A hand-written HTTP/1.1 upstream for relay and client tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Chunked event stream that ends cleanly.
    Stream(Vec<Vec<u8>>),
    /// Chunked event stream cut off before the terminating chunk.
    Truncated(Vec<Vec<u8>>),
    /// Chunked event stream that stays open after the given chunks.
    Hang(Vec<Vec<u8>>),
    /// Plain response with a status code and text body.
    Status(u16, String),
}

#[derive(Debug)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct MockUpstream {
    pub url: String,
    pub requests: mpsc::UnboundedReceiver<CapturedRequest>,
}

/// Serves one reply per accepted connection, in order.
pub async fn spawn(replies: Vec<Reply>) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);
            tokio::spawn(write_reply(socket, reply));
        }
    });

    MockUpstream {
        url: format!("http://{}/ai/chat", addr),
        requests: rx,
    }
}

/// Splits an SSE transcript into network chunks at the given byte offsets.
pub fn chunks_at(text: &str, cuts: &[usize]) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buffer = Vec::new();
    let header_end = loop {
        let mut chunk = [0u8; 1024];
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0u8; 1024];
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        path,
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    }
}

async fn write_reply(mut socket: TcpStream, reply: Reply) {
    match reply {
        Reply::Status(code, text) => {
            let response = format!(
                "HTTP/1.1 {} Mock\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                code,
                text.len(),
                text
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        Reply::Stream(chunks) => {
            write_chunks(&mut socket, &chunks).await;
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
        Reply::Truncated(chunks) => {
            write_chunks(&mut socket, &chunks).await;
            let _ = socket.shutdown().await;
        }
        Reply::Hang(chunks) => {
            write_chunks(&mut socket, &chunks).await;
            sleep(Duration::from_secs(30)).await;
        }
    }
}

async fn write_chunks(socket: &mut TcpStream, chunks: &[Vec<u8>]) {
    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n";
    let _ = socket.write_all(head.as_bytes()).await;

    for chunk in chunks {
        let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
        frame.extend_from_slice(chunk);
        frame.extend_from_slice(b"\r\n");
        let _ = socket.write_all(&frame).await;
        let _ = socket.flush().await;
        sleep(Duration::from_millis(20)).await;
    }
}
