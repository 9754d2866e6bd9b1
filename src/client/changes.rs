//! Continuous change feed handle.
//!
//! `feed=continuous` keeps one response stream open; the server writes one
//! JSON object per line, with blank lines as heartbeats. The reader task
//! owns the stream and parses entries as chunks arrive, a logically
//! unbounded sequence until the caller closes the handle or the server
//! ends the stream. The connection is released on explicit
//! [`close`](ContinuousChanges::close), on drop, or when the stream
//! terminates, whichever comes first.

use crate::error::{CouchError, Result};
use crate::types::changes::ChangeEntry;
use crate::types::document::Document;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::transport::ByteStream;

enum Sink<D> {
    Channel(async_channel::Sender<Result<ChangeEntry<D>>>),
    Callback(Box<dyn Fn(ChangeEntry<D>) + Send + Sync>),
}

impl<D> Sink<D> {
    async fn deliver(&self, entry: ChangeEntry<D>) -> bool {
        match self {
            Sink::Channel(tx) => tx.send(Ok(entry)).await.is_ok(),
            Sink::Callback(callback) => {
                callback(entry);
                true
            }
        }
    }

    async fn fail(&self, error: CouchError) {
        match self {
            Sink::Channel(tx) => {
                let _ = tx.send(Err(error)).await;
            }
            Sink::Callback(_) => {
                tracing::warn!(%error, "continuous change feed failed");
            }
        }
    }
}

/// Handle over an open continuous change feed.
///
/// Pull entries with [`next`](ContinuousChanges::next), or construct the
/// feed with a callback (see
/// [`CouchDatabase::get_continuous_changes_with`](crate::client::CouchDatabase::get_continuous_changes_with))
/// and let the reader task deliver each entry as it is parsed.
pub struct ContinuousChanges<D = Document> {
    receiver: Option<async_channel::Receiver<Result<ChangeEntry<D>>>>,
    reader: JoinHandle<()>,
}

impl<D: DeserializeOwned + Send + 'static> ContinuousChanges<D> {
    /// Spawn a reader over `stream` delivering entries into a channel.
    pub(crate) fn spawn(stream: ByteStream) -> Self {
        let (tx, rx) = async_channel::bounded(100);
        let reader = tokio::spawn(read_feed(stream, Sink::Channel(tx)));
        ContinuousChanges {
            receiver: Some(rx),
            reader,
        }
    }

    /// Spawn a reader over `stream` invoking `callback` per entry.
    pub(crate) fn spawn_with<F>(stream: ByteStream, callback: F) -> Self
    where
        F: Fn(ChangeEntry<D>) + Send + Sync + 'static,
    {
        let reader = tokio::spawn(read_feed(stream, Sink::Callback(Box::new(callback))));
        ContinuousChanges {
            receiver: None,
            reader,
        }
    }
}

impl<D> ContinuousChanges<D> {
    /// Next change entry, or `None` once the feed is closed.
    ///
    /// Always `None` for a callback-driven feed.
    pub async fn next(&mut self) -> Option<Result<ChangeEntry<D>>> {
        match &self.receiver {
            Some(rx) => rx.recv().await.ok(),
            None => None,
        }
    }

    /// Close the feed and release the underlying connection.
    pub fn close(&self) {
        self.reader.abort();
        if let Some(rx) = &self.receiver {
            rx.close();
        }
    }

    /// Whether the reader (and therefore the connection) has finished.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished()
    }

    /// Wait until the server ends the stream or the feed is closed.
    pub async fn until_closed(mut self) {
        let _ = (&mut self.reader).await;
    }
}

impl<D> std::fmt::Debug for ContinuousChanges<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuousChanges")
            .field("channel", &self.receiver.is_some())
            .field("closed", &self.reader.is_finished())
            .finish()
    }
}

impl<D> Drop for ContinuousChanges<D> {
    fn drop(&mut self) {
        // Dropping the handle must not leak the connection.
        self.reader.abort();
    }
}

/// Read loop: buffer chunks, split on newlines, parse each non-empty line
/// as one change entry. Lines carrying only `last_seq` mark the end of
/// the feed on the server side.
async fn read_feed<D: DeserializeOwned>(mut stream: ByteStream, sink: Sink<D>) {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                buffer.extend_from_slice(&bytes);
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line = buffer.split_to(pos + 1);
                    let line = &line[..line.len() - 1];
                    if !deliver_line(line, &sink).await {
                        return;
                    }
                }
            }
            Err(err) => {
                sink.fail(err).await;
                return;
            }
        }
    }
    // Stream ended; a trailing line without a newline still counts.
    if buffer.has_remaining() {
        let line = buffer.split_to(buffer.len());
        let _ = deliver_line(&line, &sink).await;
    }
}

async fn deliver_line<D: DeserializeOwned>(line: &[u8], sink: &Sink<D>) -> bool {
    let line = trim_ascii(line);
    // Blank lines are heartbeats.
    if line.is_empty() {
        return true;
    }
    match serde_json::from_slice::<ChangeEntry<D>>(line) {
        Ok(entry) => sink.deliver(entry).await,
        Err(_) => {
            // The terminating {"last_seq": ...} line is not an entry.
            if serde_json::from_slice::<serde_json::Value>(line)
                .map(|v| v.get("last_seq").is_some())
                .unwrap_or(false)
            {
                return false;
            }
            sink.fail(CouchError::ChangesClosed).await;
            false
        }
    }
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace());
    match start {
        Some(start) => {
            let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).unwrap_or(start);
            &line[start..=end]
        }
        None => &[],
    }
}
