//! Server-Sent Events decoding shared by the streaming backends

use std::pin::pin;

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::Response;
use tokio::sync::mpsc;
use tracing::debug;

use super::GenerationError;

/// Read an SSE response to the end, decoding each event's data and sending
/// the resulting text fragments in arrival order.
pub(crate) async fn forward_fragments<F>(
    response: Response,
    chunk_tx: &mpsc::Sender<String>,
    decode: F,
) -> Result<(), GenerationError>
where
    F: FnMut(&str) -> Result<Option<String>, GenerationError> + Send,
{
    forward_events(response.bytes_stream(), chunk_tx, decode).await
}

async fn forward_events<S, B, F>(
    bytes: S,
    chunk_tx: &mpsc::Sender<String>,
    mut decode: F,
) -> Result<(), GenerationError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send,
    B: AsRef<[u8]>,
    F: FnMut(&str) -> Result<Option<String>, GenerationError> + Send,
{
    let mut events = pin!(bytes.eventsource());
    let mut fragments = 0usize;

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Err(GenerationError::Network(e)),
            Err(e) => return Err(GenerationError::InvalidResponse(format!("event stream: {e}"))),
        };
        if event.data.is_empty() || event.data == "[DONE]" {
            continue;
        }

        if let Some(fragment) = decode(&event.data)?
            && !fragment.is_empty()
        {
            fragments += 1;
            if chunk_tx.send(fragment).await.is_err() {
                debug!("Fragment receiver dropped, stopping stream");
                return Ok(());
            }
        }
    }

    debug!(fragments, "Stream finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn collect(chunks: &[&str]) -> Result<Vec<String>, GenerationError> {
        let bytes = futures::stream::iter(
            chunks
                .iter()
                .map(|chunk| Ok::<_, reqwest::Error>(chunk.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        );
        let (tx, mut rx) = mpsc::channel(16);
        forward_events(bytes, &tx, |data| {
            let value: Value = serde_json::from_str(data)
                .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
            Ok(value["text"].as_str().map(str::to_string))
        })
        .await?;
        drop(tx);

        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }
        Ok(fragments)
    }

    #[tokio::test]
    async fn test_events_split_across_chunks() {
        let fragments = collect(&[
            "event: message\ndata: {\"text\":",
            "\"Day 1: \"}\r\n\r\ndata: {\"text\":\"Louvre\"}\n\n",
            ": keep-alive\n\n",
            "data: [DONE]\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(fragments, vec!["Day 1: ", "Louvre"]);
    }

    #[tokio::test]
    async fn test_multi_line_data_is_one_event() {
        let fragments = collect(&["data: {\"text\":\ndata: \"Orsay\"}\n\n"]).await.unwrap();
        assert_eq!(fragments, vec!["Orsay"]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let line = "data: {\"text\":\"Café\"}\n\n";
        let split = line.find('é').unwrap() + 1;
        let bytes = futures::stream::iter(vec![
            Ok::<_, reqwest::Error>(line.as_bytes()[..split].to_vec()),
            Ok(line.as_bytes()[split..].to_vec()),
        ]);
        let (tx, mut rx) = mpsc::channel(4);
        forward_events(bytes, &tx, |data| {
            let value: Value = serde_json::from_str(data)
                .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
            Ok(value["text"].as_str().map(str::to_string))
        })
        .await
        .unwrap();
        drop(tx);
        assert_eq!(rx.recv().await.as_deref(), Some("Café"));
    }

    #[tokio::test]
    async fn test_undecodable_event_aborts() {
        let err = collect(&["data: {\"text\":\n\n"]).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }
}
