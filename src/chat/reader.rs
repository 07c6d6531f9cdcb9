use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::demux::{ChatReply, Demultiplexer, StreamEvent};

/// Decodes UTF-8 across chunk boundaries, holding back incomplete sequences.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => bail!("invalid UTF-8 in response stream: {}", e),
        };
        let rest = self.pending.split_off(valid);
        let decoded = String::from_utf8(std::mem::replace(&mut self.pending, rest))?;
        Ok(decoded)
    }

    fn finish(&self) -> Result<()> {
        if !self.pending.is_empty() {
            bail!(
                "response stream ended inside a UTF-8 sequence ({} dangling bytes)",
                self.pending.len()
            );
        }
        Ok(())
    }
}

/// How long the source segment may sit idle before the reply is finalized.
pub const SOURCES_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Pull-based reader over a streamed answer.
///
/// Each call to [`next_event`](Self::next_event) reads at most one chunk from
/// the transport. Stop calling it to cancel; [`cancel`](Self::cancel) hands
/// back what has accumulated so far.
pub struct ChatStreamReader<S> {
    stream: S,
    decoder: Utf8Decoder,
    demux: Option<Demultiplexer>,
    queue: VecDeque<StreamEvent>,
    drain_timeout: Duration,
}

impl<S, B> ChatStreamReader<S>
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Utf8Decoder::default(),
            demux: Some(Demultiplexer::new()),
            queue: VecDeque::new(),
            drain_timeout: SOURCES_DRAIN_TIMEOUT,
        }
    }

    /// Override [`SOURCES_DRAIN_TIMEOUT`].
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Answer text accumulated so far.
    pub fn text(&self) -> &str {
        self.demux.as_ref().map(|d| d.text()).unwrap_or_default()
    }

    /// Next event, or `None` once [`StreamEvent::Finished`] has been returned.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            let demux = self.demux.as_mut()?;

            // After `[SOURCES]` only the source segment remains; stop waiting
            // once the transport goes quiet.
            let next = if demux.is_terminal() {
                match tokio::time::timeout(self.drain_timeout, self.stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!("source segment idle, closing answer stream");
                        self.finalize(Demultiplexer::finish);
                        continue;
                    }
                }
            } else {
                self.stream.next().await
            };

            match next {
                Some(Ok(bytes)) => match self.decoder.decode(bytes.as_ref()) {
                    Ok(chunk) => self.queue.extend(demux.push(&chunk)),
                    Err(e) => {
                        warn!("Failed to decode chat stream: {:#}", e);
                        self.finalize(|d| d.fail(format!("{:#}", e)));
                    }
                },
                Some(Err(e)) => {
                    warn!("Error while reading chat stream: {:#}", e);
                    self.finalize(|d| d.fail(format!("{:#}", e)));
                }
                None => match self.decoder.finish() {
                    Ok(()) => self.finalize(Demultiplexer::finish),
                    Err(e) => {
                        warn!("Chat stream truncated: {:#}", e);
                        self.finalize(|d| d.fail(format!("{:#}", e)));
                    }
                },
            }
        }
    }

    /// Stop reading and return what has accumulated. A reply that was
    /// finalized but not yet yielded is returned as-is. Returns `None` once
    /// [`StreamEvent::Finished`] has been handed out.
    pub fn cancel(mut self) -> Option<ChatReply> {
        if let Some(demux) = self.demux.take() {
            return Some(demux.cancel());
        }
        self.queue.into_iter().find_map(|event| match event {
            StreamEvent::Finished(reply) => Some(reply),
            _ => None,
        })
    }

    fn finalize(&mut self, close: impl FnOnce(Demultiplexer) -> ChatReply) {
        let Some(demux) = self.demux.take() else {
            return;
        };
        let seen_id = demux.chat_id();
        let reply = close(demux);
        // A chat id can still surface while the source segment is closed.
        if let (None, Some(id)) = (seen_id, reply.chat_id) {
            self.queue.push_back(StreamEvent::ChatId(id));
        }
        self.queue.push_back(StreamEvent::Finished(reply));
    }
}

/// Drive a streamed answer to completion, forwarding every event to `on_event`.
///
/// Always returns a reply: transport failures finalize with the partial answer
/// (or the fallback notice) instead of surfacing as errors.
pub async fn read_stream<S, B, F>(stream: S, on_event: F) -> ChatReply
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(&StreamEvent),
{
    read_stream_until(stream, on_event, futures::future::pending()).await
}

/// Like [`read_stream`], but stops reading as soon as `cancel` resolves.
///
/// A cancelled answer keeps the text received so far and is still reported
/// to `on_event` as [`StreamEvent::Finished`].
pub async fn read_stream_until<S, B, F, C>(stream: S, mut on_event: F, cancel: C) -> ChatReply
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(&StreamEvent),
    C: Future<Output = ()>,
{
    let mut reader = ChatStreamReader::new(stream);
    tokio::pin!(cancel);

    loop {
        let next = tokio::select! {
            event = reader.next_event() => Some(event),
            _ = &mut cancel => None,
        };
        match next {
            Some(Some(StreamEvent::Finished(reply))) => {
                on_event(&StreamEvent::Finished(reply.clone()));
                return reply;
            }
            Some(Some(event)) => on_event(&event),
            // next_event only returns None after Finished has been yielded.
            Some(None) => return Demultiplexer::new().fail("chat stream ended without a reply"),
            None => {
                debug!(received = reader.text().len(), "chat stream cancelled");
                let reply = reader
                    .cancel()
                    .unwrap_or_else(|| Demultiplexer::new().cancel());
                on_event(&StreamEvent::Finished(reply.clone()));
                return reply;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::demux::{ReplyStatus, FALLBACK_REPLY};
    use futures::stream;

    fn ok_chunks(chunks: &[&[u8]]) -> impl Stream<Item = Result<Vec<u8>>> + Unpin {
        let items: Vec<Result<Vec<u8>>> = chunks.iter().map(|c| Ok(c.to_vec())).collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_read_stream_full_answer() {
        let chunks: &[&[u8]] = &[
            b"Momentum is ",
            b"mass times velocity.[CHA",
            b"T_ID] 12\n[SOURCES]\nch3.pdf\n",
            b"ch4.pdf\n",
        ];
        let mut events = Vec::new();
        let reply = read_stream(ok_chunks(chunks), |e| events.push(e.clone())).await;

        assert_eq!(reply.text, "Momentum is mass times velocity.");
        assert_eq!(reply.chat_id, Some(12));
        assert_eq!(reply.sources, vec!["ch3.pdf", "ch4.pdf"]);
        assert_eq!(reply.status, ReplyStatus::Complete);

        let finished = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
        assert!(matches!(events.last(), Some(StreamEvent::Finished(_))));
        assert!(events.contains(&StreamEvent::ChatId(12)));
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let text = "Énergie cinétique";
        let bytes = text.as_bytes();
        // Split inside the two-byte 'É'.
        let chunks: &[&[u8]] = &[&bytes[..1], &bytes[1..]];
        let reply = read_stream(ok_chunks(chunks), |_| {}).await;
        assert_eq!(reply.text, text);
        assert_eq!(reply.status, ReplyStatus::Complete);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial() {
        let items: Vec<Result<Vec<u8>>> = vec![
            Ok(b"Partial answer".to_vec()),
            Err(anyhow::anyhow!("connection reset")),
            Ok(b" never read".to_vec()),
        ];
        let reply = read_stream(stream::iter(items), |_| {}).await;
        assert_eq!(reply.text, "Partial answer");
        assert_eq!(reply.error(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_transport_error_before_text_uses_fallback() {
        let items: Vec<Result<Vec<u8>>> = vec![Err(anyhow::anyhow!("refused"))];
        let mut finished = 0;
        let reply = read_stream(stream::iter(items), |e| {
            if matches!(e, StreamEvent::Finished(_)) {
                finished += 1;
            }
        })
        .await;
        assert_eq!(reply.text, FALLBACK_REPLY);
        assert_eq!(finished, 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_transport_failure() {
        let chunks: &[&[u8]] = &[b"Good start ", &[0xff, 0xfe], b"tail"];
        let reply = read_stream(ok_chunks(chunks), |_| {}).await;
        assert_eq!(reply.text, "Good start");
        assert!(reply.error().is_some());
    }

    #[tokio::test]
    async fn test_truncated_utf8_at_end() {
        let bytes = "ü".as_bytes();
        let chunks: &[&[u8]] = &[b"abc", &bytes[..1]];
        let reply = read_stream(ok_chunks(chunks), |_| {}).await;
        assert_eq!(reply.text, "abc");
        assert!(reply.error().is_some());
    }

    #[tokio::test]
    async fn test_cancel_returns_accumulated_text() {
        let chunks: &[&[u8]] = &[b"First part. ", b"Second part."];
        let mut reader = ChatStreamReader::new(ok_chunks(chunks));
        let first = reader.next_event().await;
        assert!(matches!(first, Some(StreamEvent::Partial { .. })));
        assert_eq!(reader.text(), "First part. ");

        let reply = reader.cancel().unwrap();
        assert_eq!(reply.text, "First part.");
        assert_eq!(reply.status, ReplyStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_reader_exhausts_after_finished() {
        let chunks: &[&[u8]] = &[b"done"];
        let mut reader = ChatStreamReader::new(ok_chunks(chunks));
        let mut saw_finished = false;
        while let Some(event) = reader.next_event().await {
            saw_finished |= matches!(event, StreamEvent::Finished(_));
        }
        assert!(saw_finished);
        assert!(reader.next_event().await.is_none());
        assert!(reader.cancel().is_none());
    }

    #[tokio::test]
    async fn test_idle_source_segment_finishes() {
        let head = stream::iter(vec![Ok::<_, anyhow::Error>(
            b"Answer.[SOURCES]\na.pdf\n".to_vec(),
        )]);
        let open_forever = Box::pin(head.chain(stream::pending()));
        let mut reader =
            ChatStreamReader::new(open_forever).with_drain_timeout(Duration::from_millis(20));

        let mut finished = None;
        while let Some(event) = reader.next_event().await {
            if let StreamEvent::Finished(reply) = event {
                finished = Some(reply);
            }
        }
        let reply = finished.unwrap();
        assert_eq!(reply.text, "Answer.");
        assert_eq!(reply.sources, vec!["a.pdf"]);
        assert_eq!(reply.status, ReplyStatus::Complete);
    }

    #[tokio::test]
    async fn test_cancel_after_finalize_keeps_reply() {
        let chunks: &[&[u8]] = &[b"All of it.[CHAT_ID] 4"];
        let mut reader = ChatStreamReader::new(ok_chunks(chunks));
        // Partial, then the transport ends and the reply is queued.
        assert!(matches!(reader.next_event().await, Some(StreamEvent::Partial { .. })));
        assert!(matches!(reader.next_event().await, Some(StreamEvent::ChatId(4))));

        let reply = reader.cancel().unwrap();
        assert_eq!(reply.text, "All of it.");
        assert_eq!(reply.status, ReplyStatus::Complete);
    }

    #[tokio::test]
    async fn test_read_stream_until_cancelled() {
        let head = stream::iter(vec![Ok::<_, anyhow::Error>(b"Partial answer".to_vec())]);
        let stalled = head.chain(stream::pending());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let mut events = Vec::new();
        let mut tx = Some(tx);
        let reply = read_stream_until(
            Box::pin(stalled),
            |e| {
                if matches!(e, StreamEvent::Partial { .. }) {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                }
                events.push(e.clone());
            },
            async {
                let _ = rx.await;
            },
        )
        .await;

        assert_eq!(reply.text, "Partial answer");
        assert_eq!(reply.status, ReplyStatus::Cancelled);
        assert!(matches!(events.last(), Some(StreamEvent::Finished(_))));
    }
}
