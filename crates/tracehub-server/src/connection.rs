//! Per-connection message loop.
//!
//! Frames are read with `read_exact`, so a message split across many TCP
//! segments is reassembled and several messages arriving back-to-back are
//! processed independently, in arrival order. A malformed message is logged
//! and skipped, and a storage failure drops only the offending entry.
//! Framing and I/O errors end this connection and nothing else.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracehub_store::TraceStore;
use tracehub_wire::frame::{decode_frame_len, FRAME_HEADER_BYTES};
use tracehub_wire::{deserialize_entry, WireError};
use tracing::{debug, warn};

use crate::notifier::{EntryNotifier, StoredTraceEntry};

pub(crate) async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: TraceStore,
    notifier: EntryNotifier,
    max_frame_bytes: usize,
) -> Result<(), WireError> {
    loop {
        let payload = match read_frame(&mut stream, max_frame_bytes).await? {
            Some(payload) => payload,
            None => {
                debug!(%peer, "trace connection closed");
                return Ok(());
            }
        };

        let entry = match deserialize_entry(&payload) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%peer, %err, "discarding malformed trace message");
                continue;
            }
        };

        let record_store = store.clone();
        let to_store = entry.clone();
        let stored = tokio::task::spawn_blocking(move || record_store.record(&to_store)).await;
        let stored = match stored {
            Ok(Ok(stored)) => stored,
            Ok(Err(err)) => {
                warn!(%peer, %err, "dropping trace entry after storage failure");
                continue;
            }
            Err(err) => {
                warn!(%peer, %err, "storage worker failed");
                continue;
            }
        };

        notifier.publish(StoredTraceEntry {
            entry_id: stored.entry_id,
            entry,
        });
    }
}

/// Read one length-prefixed frame. Returns `Ok(None)` on a clean close at a
/// frame boundary; a connection dying mid-frame discards the incomplete
/// message by erroring out.
pub(crate) async fn read_frame<R>(
    stream: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Vec<u8>>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_BYTES];
    match stream.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = decode_frame_len(header, max_frame_bytes)?;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tracehub_wire::frame::{encode_frame, DEFAULT_MAX_FRAME_BYTES};

    #[tokio::test]
    async fn reads_one_frame() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let framed = encode_frame(b"payload", DEFAULT_MAX_FRAME_BYTES).unwrap();
        client.write_all(&framed).await.unwrap();

        let payload = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, b"payload");
    }

    #[tokio::test]
    async fn reassembles_frame_split_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let framed = encode_frame(b"split me", DEFAULT_MAX_FRAME_BYTES).unwrap();

        let reader = tokio::spawn(async move {
            read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
                .await
                .unwrap()
                .unwrap()
        });

        for chunk in framed.chunks(3) {
            client.write_all(chunk).await.unwrap();
            client.flush().await.unwrap();
            tokio::task::yield_now().await;
        }

        assert_eq!(reader.await.unwrap(), b"split me");
    }

    #[tokio::test]
    async fn splits_two_frames_from_one_write() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let mut both = encode_frame(b"first", DEFAULT_MAX_FRAME_BYTES).unwrap();
        both.extend(encode_frame(b"second", DEFAULT_MAX_FRAME_BYTES).unwrap());
        client.write_all(&both).await.unwrap();

        let one = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .unwrap();
        let two = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one, b"first");
        assert_eq!(two, b"second");
    }

    #[tokio::test]
    async fn clean_eof_at_frame_boundary_is_none() {
        let (client, mut server) = tokio::io::duplex(256);
        drop(client);

        let result = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let framed = encode_frame(b"never finished", DEFAULT_MAX_FRAME_BYTES).unwrap();
        client.write_all(&framed[..6]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Io(_)));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_BYTES)
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { .. }));
    }
}
