use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn label(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Raw bytes read from one of the task's pipes.
#[derive(Debug)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub bytes: Vec<u8>,
}

/// Forward everything read from `rd` to `tx` until EOF. Resolves to the byte
/// count.
pub fn pump<R>(
    mut rd: R,
    stream: OutputStream,
    tx: mpsc::Sender<OutputChunk>,
) -> JoinHandle<Result<u64, WorkerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| WorkerError::StreamIo {
                stream: stream.label(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            total += n as u64;

            let chunk = OutputChunk {
                stream,
                bytes: buf[..n].to_vec(),
            };
            if tx.send(chunk).await.is_err() {
                // Consumer gone; keep draining so the child never blocks on a full pipe.
                continue;
            }
        }

        Ok(total)
    })
}
