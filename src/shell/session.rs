//! Per-connection interactive shell session.
//!
//! Owns the per-session mutable state: client identity, current
//! directory, tarpit throttle. The loop reads one byte at a time and
//! echoes as a real terminal would — character echo, backspace erase,
//! CRLF on return. A completed line is audited, throttled, dispatched
//! through the interpreter, audited again with its response, and
//! answered. Nothing the interpreter does can end the session; only
//! channel closure can.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::AuditSink;
use crate::jail::Jail;
use crate::shell::interpreter::Interpreter;
use crate::throttle::Throttle;
use crate::transport::ByteChannel;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const CARRIAGE_RETURN: u8 = 0x0d;
/// Terminal erase sequence: step back, blank the cell, step back.
const ERASE: &[u8] = b"\x08 \x08";

pub struct ShellSession {
    client: String,
    cwd: PathBuf,
    throttle: Throttle,
    interpreter: Interpreter,
    sink: Arc<AuditSink>,
    banner: Vec<u8>,
    prompt: Vec<u8>,
}

impl ShellSession {
    pub fn new(
        client: String,
        jail: Arc<Jail>,
        sink: Arc<AuditSink>,
        throttle: Throttle,
        banner: String,
        prompt: String,
        username: String,
    ) -> Self {
        let cwd = jail.root().to_path_buf();
        Self {
            client,
            cwd,
            throttle,
            interpreter: Interpreter::new(jail, username),
            sink,
            banner: format!("{banner}\r\n\r\n").into_bytes(),
            prompt: prompt.into_bytes(),
        }
    }

    /// Runs the line-editing loop until the peer disconnects or types
    /// `exit`. The channel is closed exactly once, on the way out.
    pub async fn run(mut self, channel: &mut dyn ByteChannel) {
        info!("Shell session started for {}", self.client);

        if channel.send(&self.banner).await.is_err()
            || channel.send(&self.prompt).await.is_err()
        {
            channel.close().await;
            return;
        }

        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let byte = match channel.recv_byte().await {
                Ok(Some(byte)) => byte,
                Ok(None) | Err(_) => break,
            };

            match byte {
                BACKSPACE | DELETE => {
                    // Only erase when there is something to erase
                    if buffer.pop().is_some() && channel.send(ERASE).await.is_err() {
                        break;
                    }
                }
                CARRIAGE_RETURN => {
                    if channel.send(b"\r\n").await.is_err() {
                        break;
                    }
                    let line = String::from_utf8_lossy(&buffer).trim().to_string();
                    buffer.clear();

                    if !self.process_line(channel, &line).await {
                        break;
                    }
                }
                byte => {
                    buffer.push(byte);
                    if channel.send(&[byte]).await.is_err() {
                        break;
                    }
                }
            }
        }

        channel.close().await;
        info!("Shell session ended for {}", self.client);
    }

    /// Audits, throttles, dispatches and answers one completed line.
    /// Returns false when the session must end (exit, or send failure).
    async fn process_line(&mut self, channel: &mut dyn ByteChannel, line: &str) -> bool {
        self.sink
            .command(&format!("{} executed command: {}", self.client, line))
            .await;

        // Tarpit: blocks this session's task only
        tokio::time::sleep(self.throttle.next_delay()).await;

        let output = self.interpreter.execute(line, &mut self.cwd).await;
        debug!(
            "{} -> {} ({} response bytes)",
            self.client,
            line,
            output.bytes.len()
        );
        self.sink
            .command(&format!(
                "{} executed command: {}, response: {}",
                self.client,
                line,
                String::from_utf8_lossy(&output.bytes).trim()
            ))
            .await;

        if channel.send(&output.bytes).await.is_err() {
            return false;
        }
        if output.terminate {
            self.sink
                .command(&format!("{} exited the shell", self.client))
                .await;
            return false;
        }
        channel.send(&self.prompt).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::transport::testing::ScriptedChannel;
    use std::path::Path;
    use std::time::Duration;

    fn session_in(dir: &Path) -> ShellSession {
        let root = dir.join("root");
        std::fs::create_dir_all(root.join("home/admin")).unwrap();
        let jail = Arc::new(Jail::new(root, "home/admin"));
        let sink = Arc::new(AuditSink::open(&AuditConfig {
            dir: dir.to_path_buf(),
            max_bytes: 1_000_000,
            backups: 2,
        }));
        ShellSession::new(
            "10.0.0.5".to_string(),
            jail,
            sink,
            Throttle::new(Duration::ZERO, Duration::ZERO, Duration::ZERO),
            "Welcome!".to_string(),
            "admin@host:~# ".to_string(),
            "admin".to_string(),
        )
    }

    fn output_text(channel: &ScriptedChannel) -> String {
        String::from_utf8_lossy(&channel.output).to_string()
    }

    #[tokio::test]
    async fn test_banner_and_prompt_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.starts_with("Welcome!\r\n\r\nadmin@host:~# "));
        assert!(channel.closed);
    }

    #[tokio::test]
    async fn test_characters_echo_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"ls");
        session_in(dir.path()).run(&mut channel).await;
        // No carriage return: characters echoed, command never ran
        let out = output_text(&channel);
        assert!(out.ends_with("ls"));
    }

    #[tokio::test]
    async fn test_backspace_edits_line() {
        let dir = tempfile::tempdir().unwrap();
        // a, b, DEL, c, CR — edits to "ac", which is not a command
        let mut channel = ScriptedChannel::new(b"ab\x7fc\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.contains("\x08 \x08"));
        assert!(out.contains("ac: command not found"));
        assert!(!out.contains("ab: command not found"));
    }

    #[tokio::test]
    async fn test_backspace_on_empty_buffer_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"\x7f\x7fpwd\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(!out.contains("\x08 \x08"));
        assert!(out.contains("\n/\r\n"));
    }

    #[tokio::test]
    async fn test_exit_closes_after_farewell() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"exit\rpwd\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.contains(" Goodbye!"));
        // Nothing is processed after exit
        assert!(!out.contains("\n/\r\n"));
        assert!(channel.closed);
    }

    #[tokio::test]
    async fn test_interpreter_failure_does_not_end_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"cat ghost\rpwd\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.contains("File not found"));
        // The session kept going and answered the next command
        assert!(out.contains("\n/\r\n"));
    }

    #[tokio::test]
    async fn test_buffer_cleared_between_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"frob\rnicate\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.contains("frob: command not found"));
        assert!(out.contains("nicate: command not found"));
        assert!(!out.contains("frobnicate"));
    }

    #[tokio::test]
    async fn test_command_trail_records_line_and_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"whoami\r");
        session_in(dir.path()).run(&mut channel).await;

        let trail = std::fs::read_to_string(dir.path().join("cmd_audits.log")).unwrap();
        assert!(trail.contains("10.0.0.5 executed command: whoami"));
        assert!(trail.contains("response: admin"));
    }

    #[tokio::test]
    async fn test_session_state_survives_across_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ScriptedChannel::new(b"mkdir d\rcd d\rpwd\r");
        session_in(dir.path()).run(&mut channel).await;
        let out = output_text(&channel);
        assert!(out.contains("\n/d\r\n"));
    }
}
