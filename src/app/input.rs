//! Newline-delimited JSON record source used by the binary.

use crate::domain::RawRecord;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Decodes one `RawRecord` per line from `reader` and forwards it to `tx`.
/// Blank and undecodable lines are skipped. Returns the number of records
/// forwarded once the input ends or the receiver goes away.
pub async fn forward_records<R>(
    mut reader: R,
    tx: mpsc::Sender<RawRecord>,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);
    let mut forwarded = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        // invalid UTF-8 is rejected here like any other malformed line
        match serde_json::from_slice::<RawRecord>(line) {
            Ok(record) => {
                if tx.send(record).await.is_err() {
                    debug!("ingestion loop stopped, no longer reading input");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!(error = %e, "skipping undecodable input line"),
        }
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forwards_valid_lines_and_skips_the_rest() {
        let input = concat!(
            r#"{"data":"one","time":"2024-01-01T00:00:00Z","source":"stdout"}"#,
            "\n\nnot json at all\n",
            r#"{"data":"{\"a\":1}","time":"2024-01-01T00:00:01Z"}"#,
            "\n"
        );
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = forward_records(input.as_bytes(), tx).await.unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await.unwrap().data, "one");
        assert_eq!(rx.recv().await.unwrap().data, r#"{"a":1}"#);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"data":"before","time":"2024-01-01T00:00:00Z"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"data":"after","time":"2024-01-01T00:00:01Z"}"#);
        input.push(b'\n');
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = forward_records(input.as_slice(), tx).await.unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await.unwrap().data, "before");
        assert_eq!(rx.recv().await.unwrap().data, "after");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stops_when_receiver_is_dropped() {
        let input = r#"{"data":"one","time":"2024-01-01T00:00:00Z"}"#;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let forwarded = forward_records(input.as_bytes(), tx).await.unwrap();
        assert_eq!(forwarded, 0);
    }
}
