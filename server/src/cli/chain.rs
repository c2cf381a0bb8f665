use std::process::Stdio;

use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::cli::Command;

const CHUNK_SIZE: usize = 64 * 1024;

// an ordered list of commands where the stdout of each stage feeds the stdin
// of the next; the final stdout is the chain's output
#[derive(Clone, Debug, Default)]
pub struct CommandChain {
    commands: Vec<Command>,
}

impl CommandChain {
    pub fn new() -> Self {
        CommandChain::default()
    }

    pub fn add(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    // spawns every stage eagerly and wires the pipes.  each inter-stage pump
    // is its own task, so backpressure flows from the consumer of the final
    // stdout all the way back through the os pipes
    #[instrument(skip(self))]
    pub fn execute(self) -> Result<RunningChain> {
        anyhow::ensure!(
            !self.commands.is_empty(),
            "cannot execute an empty command chain"
        );

        let mut children: Vec<Child> = Vec::new();
        let mut pumps: Vec<JoinHandle<std::io::Result<()>>> = Vec::new();
        let mut prev_stdout: Option<ChildStdout> = None;

        for command in &self.commands {
            debug!(base = command.base(), args = ?command.argv(), "spawning chain stage");

            // kill_on_drop ensures that no stage outlives the request, even
            // when the client disconnects mid-stream
            let mut child = tokio::process::Command::new(command.base())
                .args(command.argv())
                .stdin(if prev_stdout.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("failed to spawn {}", command.base()))?;

            if let Some(mut src) = prev_stdout.take() {
                let mut dst = child
                    .stdin
                    .take()
                    .context("chain stage stdin was not piped")?;

                pumps.push(tokio::spawn(async move {
                    tokio::io::copy(&mut src, &mut dst).await?;
                    dst.shutdown().await?;
                    Ok(())
                }));
            }

            prev_stdout = child.stdout.take();
            children.push(child);
        }

        let stdout = prev_stdout.context("chain stage stdout was not piped")?;

        Ok(RunningChain {
            children,
            pumps,
            stdout,
        })
    }
}

// a spawned chain.  dropping this kills and reaps every stage
pub struct RunningChain {
    children: Vec<Child>,
    pumps: Vec<JoinHandle<std::io::Result<()>>>,
    stdout: ChildStdout,
}

impl RunningChain {
    // drains the chain's output into memory, ignoring stage exit statuses.
    // used by the header and read-length probes, where an upstream stage may
    // be cut short by a downstream 'head' closing the pipe
    pub async fn collect_stdout(mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();

        self.stdout
            .read_to_end(&mut buffer)
            .await
            .context("failed to read command chain output")?;

        for pump in self.pumps.drain(..) {
            let _ = pump.await;
        }
        for mut child in self.children.drain(..) {
            let _ = child.wait().await;
        }

        Ok(buffer)
    }

    // drains the chain's output into a writer, returning the byte count.
    // stage exit statuses are ignored, as with collect_stdout
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        let written = tokio::io::copy(&mut self.stdout, writer)
            .await
            .context("failed to copy command chain output")?;

        for pump in self.pumps.drain(..) {
            let _ = pump.await;
        }
        for mut child in self.children.drain(..) {
            let _ = child.wait().await;
        }

        Ok(written)
    }

    // turns the chain into a byte stream.  once the final stdout reaches eof,
    // every stage is reaped; a non-zero exit surfaces as the stream's
    // terminal error, after all produced bytes have been yielded
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> + Send {
        struct ChainParts {
            stdout: ChildStdout,
            children: Vec<Child>,
            pumps: Vec<JoinHandle<std::io::Result<()>>>,
        }

        let parts = ChainParts {
            stdout: self.stdout,
            children: self.children,
            pumps: self.pumps,
        };

        futures::stream::try_unfold(parts, |mut parts| async move {
            let mut buf = BytesMut::with_capacity(CHUNK_SIZE);

            let n = parts.stdout.read_buf(&mut buf).await?;
            if n > 0 {
                return Ok(Some((buf.freeze(), parts)));
            }

            // eof: reap the stages.  pump failures are broken pipes from a
            // stage exiting early, which the exit status check covers
            for pump in parts.pumps.drain(..) {
                let _ = pump.await;
            }

            for child in parts.children.iter_mut() {
                let status = child.wait().await?;
                if !status.success() {
                    return Err(std::io::Error::other(format!(
                        "command chain stage exited with {status}"
                    )));
                }
            }

            Ok(None)
        })
    }
}
