//! Stdio transport for MCP server communication.
//!
//! Spawns a child process and exchanges newline-delimited JSON-RPC messages
//! over its stdin/stdout. Requests are multiplexed by id, so many calls may
//! be in flight at once.

use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Async stdio transport for communicating with an MCP server process.
pub struct StdioTransport {
    server: String,
    next_id: AtomicU64,
    write_tx: std::sync::Mutex<Option<mpsc::Sender<String>>>,
    pending: PendingMap,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
    child: Arc<Mutex<Child>>,
    timeout_ms: u64,
    closed: AtomicBool,
    /// Set by the reader task once stdout hits EOF, under the `pending` lock.
    eof: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Spawn a child process and start background reader/writer tasks.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout_ms: u64,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: command.to_string(),
            source: e,
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::Protocol(format!(
                "Child process for '{server}' has no piped stdio"
            )));
        };

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        // Writer task: drains channel and writes to child stdin
        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);
        let writer_handle = tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(msg) = write_rx.recv().await {
                if stdin.write_all(msg.as_bytes()).await.is_err()
                    || stdin.write_all(b"\n").await.is_err()
                    || stdin.flush().await.is_err()
                {
                    break;
                }
            }
        });

        // Reader task: reads lines from stdout, parses JSON-RPC, dispatches by id
        let pending_for_reader = Arc::clone(&pending);
        let eof = Arc::new(AtomicBool::new(false));
        let eof_for_reader = Arc::clone(&eof);
        let server_for_reader = server.to_string();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let resp: JsonRpcResponse = match serde_json::from_str(&line) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(
                            "Unparseable line from MCP server '{server_for_reader}': {e}: {line}"
                        );
                        continue;
                    }
                };
                // Server-initiated notifications carry no id and are ignored
                if let Some(id) = resp.id {
                    if let Some(tx) = pending_for_reader.lock().await.remove(&id) {
                        let _ = tx.send(resp);
                    }
                }
            }
            // stdout closed: fail every waiter instead of letting it time out
            let mut pending = pending_for_reader.lock().await;
            eof_for_reader.store(true, Ordering::SeqCst);
            pending.clear();
            drop(pending);
            tracing::debug!("MCP server '{server_for_reader}' closed its stdout");
        });

        Ok(Self {
            server: server.to_string(),
            next_id: AtomicU64::new(1),
            write_tx: std::sync::Mutex::new(Some(write_tx)),
            pending,
            reader_handle,
            writer_handle,
            child: Arc::new(Mutex::new(child)),
            timeout_ms,
            closed: AtomicBool::new(false),
            eof,
        })
    }

    fn sender(&self) -> Result<mpsc::Sender<String>, McpError> {
        let guard = self.write_tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or_else(|| McpError::ServerNotRunning {
            name: self.server.clone(),
        })
    }

    /// Send a JSON-RPC request and wait for the response.
    ///
    /// Cancelling `cancel` abandons only this request: its pending slot is
    /// released and the server is sent `notifications/cancelled`.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let serialized = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        let sender = self.sender()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.eof.load(Ordering::SeqCst) {
                return Err(McpError::ServerNotRunning {
                    name: self.server.clone(),
                });
            }
            pending.insert(id, tx);
        }

        if sender.send(serialized).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(McpError::ServerNotRunning {
                name: self.server.clone(),
            });
        }

        let timeout = Duration::from_millis(self.timeout_ms);
        tokio::select! {
            _ = cancel.cancelled() => {
                self.pending.lock().await.remove(&id);
                let params = serde_json::json!({"requestId": id, "reason": "cancelled by caller"});
                if let Err(e) = self.send_notification("notifications/cancelled", Some(params)).await {
                    tracing::debug!("Could not notify '{}' of cancellation: {e}", self.server);
                }
                Err(McpError::Cancelled { method: method.to_string() })
            }
            outcome = tokio::time::timeout(timeout, rx) => match outcome {
                Ok(Ok(resp)) => Ok(resp),
                Ok(Err(_)) => Err(McpError::Protocol(format!(
                    "MCP server '{}' closed before answering '{method}'",
                    self.server
                ))),
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    Err(McpError::Timeout {
                        name: self.server.clone(),
                        method: method.to_string(),
                        timeout_ms: self.timeout_ms,
                    })
                }
            },
        }
    }

    /// Send a JSON-RPC notification (fire-and-forget).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let serialized = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.sender()?
            .send(serialized)
            .await
            .map_err(|_| McpError::ServerNotRunning {
                name: self.server.clone(),
            })
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close stdin, give the child 5 seconds to exit, then kill it.
    ///
    /// Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropping the last sender ends the writer task, which closes stdin
        drop(
            self.write_tx
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take(),
        );

        let graceful = tokio::time::timeout(Duration::from_secs(5), async {
            let _ = self.child.lock().await.wait().await;
        })
        .await;

        if graceful.is_err() {
            tracing::warn!("MCP server '{}' did not exit, killing it", self.server);
            let _ = self.child.lock().await.kill().await;
        }

        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}
