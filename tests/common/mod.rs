#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! - `FakeNode`: an in-memory chain + block store answering real envelopes
//! - `serve_http`: a one-thread HTTP server answering a fixed number of requests

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use block_file_transport::test_utils::ScriptedTransport;
use block_file_transport::{Service, TransportError};
use block_file_types::block_store::{
    block_store_request, BlockItem, BlockStoreRequest, BlockStoreResponse,
};
use block_file_types::chain::{
    chain_request, chain_response, ChainRequest, ChainResponse, GetHeadInfoResponse,
    SubmitBlockResponse,
};
use block_file_types::{Block, BlockHeader, BlockTopology};
use prost::Message;

pub fn block(height: u64) -> Block {
    Block {
        id: [&[0x12, 0x20][..], &height.to_be_bytes()].concat(),
        header: Some(BlockHeader {
            previous: [&[0x12, 0x20][..], &height.saturating_sub(1).to_be_bytes()].concat(),
            height,
            timestamp: 1_600_000_000_000 + height * 3000,
            signer: vec![0x00, 0x01, 0x02],
            ..Default::default()
        }),
        transactions: vec![vec![0x0a, 0x02, 0x08, height as u8]],
        signature: vec![0x20; 65],
    }
}

pub fn head_info_response(lib: u64) -> ChainResponse {
    ChainResponse {
        response: Some(chain_response::Response::GetHeadInfo(GetHeadInfoResponse {
            head_topology: Some(BlockTopology {
                id: block(lib).id,
                height: lib,
                previous: Vec::new(),
            }),
            last_irreversible_block: lib,
            ..Default::default()
        })),
    }
}

pub fn submit_ok_response() -> ChainResponse {
    ChainResponse {
        response: Some(chain_response::Response::SubmitBlock(SubmitBlockResponse::default())),
    }
}

/// Chain of `height` blocks whose last irreversible block is `lib`.
#[derive(Clone)]
pub struct FakeNode {
    pub height: u64,
    pub lib: u64,
    /// Submissions of this height time out.
    pub timeout_at: Option<u64>,
    submitted: Arc<Mutex<Vec<u64>>>,
}

impl FakeNode {
    pub fn new(height: u64, lib: u64) -> Self {
        Self {
            height,
            lib,
            timeout_at: None,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn timing_out_at(mut self, height: u64) -> Self {
        self.timeout_at = Some(height);
        self
    }

    /// Heights accepted by `submit_block`, in order.
    pub fn submitted(&self) -> Vec<u64> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn transport(&self) -> ScriptedTransport {
        let node = self.clone();
        ScriptedTransport::new(move |service, request| node.answer(service, request))
    }

    fn answer(&self, service: Service, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        match service {
            Service::Chain => {
                let request = ChainRequest::decode(request).unwrap();
                let response = match request.request {
                    Some(chain_request::Request::GetHeadInfo(_)) => head_info_response(self.lib),
                    Some(chain_request::Request::SubmitBlock(req)) => {
                        let height = req.block.and_then(|b| b.height()).unwrap();
                        if self.timeout_at == Some(height) {
                            return Err(TransportError::Timeout {
                                service,
                                timeout: Duration::from_secs(600),
                            });
                        }
                        self.submitted.lock().unwrap().push(height);
                        submit_ok_response()
                    }
                    Some(chain_request::Request::Reserved(_)) | None => ChainResponse::default(),
                };
                Ok(response.encode_to_vec())
            }
            Service::BlockStore => {
                let request = BlockStoreRequest::decode(request).unwrap();
                let Some(block_store_request::Request::GetBlocksByHeight(req)) = request.request
                else {
                    return Ok(BlockStoreResponse::error("unsupported").encode_to_vec());
                };
                let end = req
                    .ancestor_start_height
                    .saturating_add(u64::from(req.num_blocks))
                    .min(self.height + 1);
                let items = (req.ancestor_start_height..end)
                    .map(|h| BlockItem::from_block(block(h)))
                    .collect();
                Ok(BlockStoreResponse::blocks(items).encode_to_vec())
            }
        }
    }
}

/// A request seen by [`serve_http`].
#[derive(Debug)]
pub struct HttpRequest {
    pub path: String,
    pub body: Vec<u8>,
}

fn read_request(stream: &TcpStream) -> HttpRequest {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    HttpRequest { path, body }
}

/// Serve `count` requests on a local port, answering each with `respond`.
///
/// Returns the endpoint URL and a handle yielding the requests seen.
pub fn serve_http<F>(count: usize, respond: F) -> (String, JoinHandle<Vec<HttpRequest>>)
where
    F: Fn(&HttpRequest) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0..count {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&stream);
            let body = respond(&request);
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(&body).unwrap();
            seen.push(request);
        }
        seen
    });
    (endpoint, handle)
}
