//! Boundary with the authenticated transport layer.
//!
//! The real deployment front (SSH key exchange, session encryption,
//! host identity) lives outside this crate; what it hands over is a
//! client identity and a bidirectional byte channel, and what it calls
//! are the `SessionBootstrap` entry points below. A minimal plain-TCP
//! front is included so the service runs end to end: it prompts for a
//! username and password in the clear and then behaves exactly like an
//! authenticated channel.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::jail::Jail;
use crate::shell::ShellSession;
use crate::throttle::Throttle;

/// Bidirectional byte stream handed over by the transport layer once a
/// client is authenticated. Owned exclusively by one session.
#[async_trait]
pub trait ByteChannel: Send {
    async fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Next byte from the peer; `None` means the stream was closed.
    async fn recv_byte(&mut self) -> io::Result<Option<u8>>;

    async fn close(&mut self);
}

pub struct TcpByteChannel {
    stream: TcpStream,
}

impl TcpByteChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl ByteChannel for TcpByteChannel {
    async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await
    }

    async fn recv_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.stream.read(&mut buf).await? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Entry points the transport layer calls once it has a client.
///
/// Authentication policy: every password attempt is accepted. The
/// purpose of the service is to capture credentials, not to gate
/// access.
pub struct SessionBootstrap {
    jail: Arc<Jail>,
    sink: Arc<AuditSink>,
    config: Config,
}

impl SessionBootstrap {
    pub fn new(config: Config, jail: Arc<Jail>, sink: Arc<AuditSink>) -> Self {
        Self { jail, sink, config }
    }

    /// Records the attempt on both the command and credential trails,
    /// then accepts. Always returns true.
    pub async fn auth_attempt(&self, client: &str, username: &str, password: &str) -> bool {
        self.sink
            .command(&format!(
                "Client {client} attempted connection with username: {username}, password: {password}"
            ))
            .await;
        self.sink
            .credential(&format!("{client}, {username}, {password}"))
            .await;
        true
    }

    /// Interactive shell request — runs the full session loop until the
    /// channel closes.
    pub async fn shell_request(&self, mut channel: Box<dyn ByteChannel>, client: &str) {
        let throttle = Throttle::new(
            self.config.throttle.initial(),
            self.config.throttle.increment(),
            self.config.throttle.ceiling(),
        );
        let session = ShellSession::new(
            client.to_string(),
            self.jail.clone(),
            self.sink.clone(),
            throttle,
            self.config.server.banner.clone(),
            self.config.sandbox.prompt(),
            self.config.sandbox.username.clone(),
        );
        session.run(channel.as_mut()).await;
    }

    /// Exec-style (non-interactive) request: captured on the command
    /// trail, never executed against the jail.
    pub async fn exec_request(&self, client: &str, command: &str) {
        self.sink
            .command(&format!("Command execution requested: {command} by {client}"))
            .await;
    }

    /// PTY allocation is always granted.
    pub fn pty_request(&self) -> bool {
        true
    }
}

/// Drives one accepted TCP connection through the plain-TCP front:
/// credential prompt, bootstrap, shell.
pub async fn handle_connection(
    bootstrap: Arc<SessionBootstrap>,
    stream: TcpStream,
    client: String,
) -> anyhow::Result<()> {
    let mut channel = TcpByteChannel::new(stream);

    channel.send(b"login: ").await?;
    let username = read_line(&mut channel, true).await?;
    channel.send(b"Password: ").await?;
    let password = read_line(&mut channel, false).await?;

    bootstrap.auth_attempt(&client, &username, &password).await;
    info!("{client} authenticated as {username}");

    bootstrap.shell_request(Box::new(channel), &client).await;
    Ok(())
}

/// Reads one CR/LF-terminated line with minimal editing (backspace).
/// Echo is disabled while the password is typed.
async fn read_line(channel: &mut dyn ByteChannel, echo: bool) -> io::Result<String> {
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        let byte = match channel.recv_byte().await? {
            Some(b) => b,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed during login",
                ))
            }
        };
        match byte {
            b'\r' | b'\n' => {
                if byte == b'\r' || !buffer.is_empty() {
                    channel.send(b"\r\n").await?;
                    return Ok(String::from_utf8_lossy(&buffer).trim().to_string());
                }
                // Stray LF from a CRLF pair already handled — skip it
            }
            0x08 | 0x7f => {
                if buffer.pop().is_some() && echo {
                    channel.send(b"\x08 \x08").await?;
                }
            }
            b => {
                buffer.push(b);
                if echo {
                    channel.send(&[b]).await?;
                }
            }
        }
    }
}
