//! Scripted transport for exercising the client without a server.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Method;

use settee::client::{
    ClientConfig, CouchRequest, CouchResponse, RequestBody, StreamingResponse, Transport,
};
use settee::{CouchClient, Result};

pub enum Scripted {
    Response(CouchResponse),
    Stream { status: u16, chunks: Vec<Bytes> },
}

/// One request as the transport saw it, with the body collected.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub long_lived: bool,
}

/// Transport that answers from a queue of scripted responses and records
/// every request it is handed.
pub struct MockTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, response: CouchResponse) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Response(response));
    }

    pub fn push_stream(&self, status: u16, chunks: Vec<&'static str>) {
        self.responses.lock().unwrap().push_back(Scripted::Stream {
            status,
            chunks: chunks
                .into_iter()
                .map(|c| Bytes::from_static(c.as_bytes()))
                .collect(),
        });
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, index: usize) -> Recorded {
        self.requests()[index].clone()
    }

    async fn record(&self, request: CouchRequest) {
        let body = match request.body {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Full(bytes) => bytes,
            RequestBody::Stream { mut body, .. } => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = body.next().await {
                    buf.extend_from_slice(&chunk.expect("scripted upload chunk"));
                }
                buf.freeze()
            }
        };
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            path: request.path,
            headers: request.headers,
            content_type: request.content_type,
            body,
            long_lived: request.long_lived,
        });
    }

    fn next_scripted(&self) -> Scripted {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("more requests issued than responses scripted")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn issue(&self, request: CouchRequest) -> Result<CouchResponse> {
        self.record(request).await;
        match self.next_scripted() {
            Scripted::Response(response) => Ok(response),
            Scripted::Stream { .. } => panic!("scripted a stream for a buffered request"),
        }
    }

    async fn issue_streaming(&self, request: CouchRequest) -> Result<StreamingResponse> {
        self.record(request).await;
        match self.next_scripted() {
            Scripted::Response(response) => Ok(StreamingResponse {
                status: response.status,
                headers: response.headers,
                body: futures::stream::once(async move { Ok(response.body) }).boxed(),
            }),
            Scripted::Stream { status, chunks } => Ok(StreamingResponse {
                status,
                headers: BTreeMap::new(),
                body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
            }),
        }
    }
}

pub fn client_over(mock: Arc<MockTransport>) -> CouchClient {
    CouchClient::with_transport(mock, ClientConfig::default())
}
