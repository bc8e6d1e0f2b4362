use bytes::{Bytes, BytesMut};
use futures_util::{pin_mut, Stream, StreamExt};

use crate::{Result, ScribeError};

/// Drain a byte stream into one contiguous buffer.
///
/// The first stream error aborts collection. With `limit` set, collection stops as soon as
/// the running total exceeds it.
pub async fn collect_stream<S, E>(stream: S, limit: Option<u64>) -> Result<Bytes>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<anyhow::Error>,
{
    pin_mut!(stream);

    let mut buffer = BytesMut::new();
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            let err: anyhow::Error = e.into();
            err.context("Audio stream failed")
        })?;
        chunks += 1;

        if let Some(limit) = limit {
            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(ScribeError::AudioTooLarge { limit }.into());
            }
        }

        buffer.extend_from_slice(&chunk);
    }

    tracing::debug!(bytes = buffer.len(), chunks, "Collected audio stream");

    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;

    fn chunks(parts: &[&'static [u8]]) -> Vec<io::Result<Bytes>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    #[tokio::test]
    async fn test_concatenates_chunks_in_order() {
        let source = stream::iter(chunks(&[b"ab", b"", b"cde"]));
        let buffer = collect_stream(source, None).await.unwrap();
        assert_eq!(&buffer[..], b"abcde");
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_buffer() {
        let source = stream::iter(Vec::<io::Result<Bytes>>::new());
        let buffer = collect_stream(source, None).await.unwrap();
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_rejects() {
        let mut items = chunks(&[b"ab"]);
        items.push(Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset")));
        items.extend(chunks(&[b"never"]));

        let err = collect_stream(stream::iter(items), None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection reset"));
    }

    #[tokio::test]
    async fn test_limit_allows_exact_size() {
        let source = stream::iter(chunks(&[b"abc", b"de"]));
        let buffer = collect_stream(source, Some(5)).await.unwrap();
        assert_eq!(buffer.len(), 5);
    }

    #[tokio::test]
    async fn test_limit_exceeded() {
        let source = stream::iter(chunks(&[b"abc", b"def"]));
        let err = collect_stream(source, Some(5)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::AudioTooLarge { limit: 5 })
        ));
    }
}
