//! Line-by-line draining of subprocess output.
//!
//! A watcher runs on its own task, feeds every line to a sink in the order
//! it was read, and signals completion exactly once. Bytes that are not valid
//! UTF-8 are replaced, never treated as the end of the stream. It cannot be cancelled:
//! closing or exhausting the stream is the only way to stop it.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;

/// What a watcher saw before its stream ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Number of complete lines delivered to the sink.
    pub lines: usize,
    /// Read error that ended the stream, if any.
    pub error: Option<String>,
}

/// Handle to a running watcher.
#[derive(Debug)]
pub struct OutputWatcher {
    done: oneshot::Receiver<WatchSummary>,
}

impl OutputWatcher {
    /// Start draining `reader` into `sink` on a new task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, F>(reader: R, mut sink: F) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        F: FnMut(String) + Send + 'static,
    {
        let (tx, done) = oneshot::channel();

        tokio::spawn(async move {
            tracing::debug!("Output watcher started");

            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            let mut summary = WatchSummary::default();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        summary.lines += 1;
                        sink(decode_line(&buf));
                    }
                    Err(e) => {
                        sink(format!("error reading input: {e}"));
                        summary.error = Some(e.to_string());
                        break;
                    }
                }
            }

            tracing::debug!(lines = summary.lines, "Output watcher finished");
            // The receiver may already be gone; nobody is waiting then.
            let _ = tx.send(summary);
        });

        Self { done }
    }

    /// Wait until the stream has ended.
    pub async fn wait(self) -> WatchSummary {
        self.done.await.unwrap_or_else(|_| WatchSummary {
            lines: 0,
            error: Some("watcher task ended without signalling".into()),
        })
    }
}

/// Strip the line terminator (`\n` or `\r\n`) and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    fn collecting_sink() -> (Arc<Mutex<Vec<String>>>, impl FnMut(String) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        (seen, move |line| sink_seen.lock().unwrap().push(line))
    }

    /// Yields one chunk, then fails every read.
    struct FailingReader {
        chunk: Option<&'static [u8]>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.chunk.take() {
                Some(chunk) => {
                    buf.put_slice(chunk);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))),
            }
        }
    }

    #[tokio::test]
    async fn test_lines_arrive_in_order() {
        let (seen, sink) = collecting_sink();

        let summary = OutputWatcher::spawn(&b"a\nb\nc\n"[..], sink).wait().await;

        assert_eq!(*seen.lock().unwrap(), ["a", "b", "c"]);
        assert_eq!(summary, WatchSummary { lines: 3, error: None });
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let (seen, sink) = collecting_sink();

        OutputWatcher::spawn(&b"first\nlast"[..], sink).wait().await;

        assert_eq!(*seen.lock().unwrap(), ["first", "last"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_end_stream() {
        let (seen, sink) = collecting_sink();

        let summary = OutputWatcher::spawn(&b"a\n\xffb\nc\n"[..], sink).wait().await;

        assert_eq!(*seen.lock().unwrap(), ["a", "\u{fffd}b", "c"]);
        assert_eq!(summary, WatchSummary { lines: 3, error: None });
    }

    #[tokio::test]
    async fn test_crlf_terminators_are_stripped() {
        let (seen, sink) = collecting_sink();

        OutputWatcher::spawn(&b"one\r\ntwo\r\n"[..], sink).wait().await;

        assert_eq!(*seen.lock().unwrap(), ["one", "two"]);
    }

    #[tokio::test]
    async fn test_read_error_emits_one_diagnostic() {
        let (seen, sink) = collecting_sink();
        let reader = FailingReader {
            chunk: Some(b"partial\n"),
        };

        let summary = OutputWatcher::spawn(reader, sink).wait().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], "partial");
        assert_eq!(seen[1], "error reading input: pipe closed");
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.error.as_deref(), Some("pipe closed"));
    }

    #[tokio::test]
    async fn test_completes_when_writer_closes() {
        let (seen, sink) = collecting_sink();
        let (mut writer, reader) = tokio::io::duplex(64);

        let watcher = OutputWatcher::spawn(reader, sink);

        tokio::io::AsyncWriteExt::write_all(&mut writer, b"x\ny\n")
            .await
            .unwrap();
        drop(writer);

        let summary = watcher.wait().await;
        assert_eq!(summary.lines, 2);
        assert_eq!(*seen.lock().unwrap(), ["x", "y"]);
    }
}
