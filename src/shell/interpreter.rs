//! Command parsing and dispatch.
//!
//! A line is parsed into a tagged `Command`; each variant carries the
//! argument shape its verb requires, so arity problems surface at parse
//! time and execution never sees a malformed argument list. Every jail
//! failure is converted here into one-line shell-style response text —
//! nothing propagates past the interpreter as a fault.
//!
//! Responses are raw bytes with explicit CRLF framing: a leading `\n`,
//! the payload, a trailing `\r\n`. Terminal clients need the CRLFs; the
//! framing matches what a real remote shell echoes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::jail::{Jail, JailError};

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Pwd,
    Whoami,
    Ls,
    Cd(String),
    Cat(String),
    Mkdir(String),
    Touch(String),
    Rm(String),
    /// `echo <content> > <file>` — the only supported redirection.
    Echo { content: String, file: String },
    Cp { src: String, dest: String },
    Mv { src: String, dest: String },
    /// Recognized verb with a malformed argument list.
    Invalid(&'static str),
    /// Anything else — echoed back as `<line>: command not found`.
    Unknown(String),
}

impl Command {
    /// Parses one trimmed input line. Zero-argument verbs match
    /// exactly; argument-taking verbs match on their `verb ` prefix.
    pub fn parse(line: &str) -> Command {
        match line {
            "exit" => return Command::Exit,
            "pwd" => return Command::Pwd,
            "whoami" => return Command::Whoami,
            "ls" => return Command::Ls,
            _ => {}
        }
        if let Some(arg) = line.strip_prefix("cd ") {
            return Command::Cd(arg.to_string());
        }
        if let Some(arg) = line.strip_prefix("cat ") {
            return Command::Cat(arg.to_string());
        }
        if let Some(arg) = line.strip_prefix("mkdir ") {
            return Command::Mkdir(arg.to_string());
        }
        if let Some(arg) = line.strip_prefix("touch ") {
            return Command::Touch(arg.to_string());
        }
        if let Some(arg) = line.strip_prefix("rm ") {
            return Command::Rm(arg.to_string());
        }
        if let Some(rest) = line.strip_prefix("echo ") {
            // Exactly one `>` separates content from target file
            let parts: Vec<&str> = rest.split('>').collect();
            if parts.len() == 2 {
                return Command::Echo {
                    content: parts[0].trim().to_string(),
                    file: parts[1].trim().to_string(),
                };
            }
            return Command::Invalid("Invalid echo command");
        }
        if let Some(rest) = line.strip_prefix("cp ") {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if let [src, dest] = parts[..] {
                return Command::Cp {
                    src: src.to_string(),
                    dest: dest.to_string(),
                };
            }
            return Command::Invalid("Invalid cp command");
        }
        if let Some(rest) = line.strip_prefix("mv ") {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if let [src, dest] = parts[..] {
                return Command::Mv {
                    src: src.to_string(),
                    dest: dest.to_string(),
                };
            }
            return Command::Invalid("Invalid mv command");
        }
        Command::Unknown(line.to_string())
    }
}

/// Outcome of one dispatched command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Raw response bytes, CRLF-framed, sent to the client verbatim.
    pub bytes: Vec<u8>,
    /// True when the session must close the channel after sending.
    pub terminate: bool,
}

impl CommandOutput {
    fn line(text: &str) -> Self {
        Self {
            bytes: format!("\n{text}\r\n").into_bytes(),
            terminate: false,
        }
    }

    /// Silent success — just the newline before the next prompt.
    fn quiet() -> Self {
        Self {
            bytes: b"\n".to_vec(),
            terminate: false,
        }
    }
}

pub struct Interpreter {
    jail: Arc<Jail>,
    username: String,
}

impl Interpreter {
    pub fn new(jail: Arc<Jail>, username: String) -> Self {
        Self { jail, username }
    }

    /// Executes one command line. `cwd` is the session's current
    /// directory; only `cd` mutates it.
    pub async fn execute(&self, line: &str, cwd: &mut PathBuf) -> CommandOutput {
        match Command::parse(line) {
            Command::Exit => CommandOutput {
                bytes: b"\n Goodbye!\n".to_vec(),
                terminate: true,
            },
            Command::Pwd => CommandOutput::line(&self.jail.display_path(cwd)),
            Command::Whoami => CommandOutput::line(&self.username),
            Command::Ls => match self.jail.list(cwd).await {
                Ok(names) => CommandOutput::line(&names.join(" ")),
                Err(_) => CommandOutput::line("Directory not found"),
            },
            Command::Cd(arg) => self.change_dir(&arg, cwd).await,
            Command::Cat(name) => self.read_file(&name, cwd).await,
            Command::Mkdir(name) => match self.step(cwd, &name) {
                Ok(path) => self
                    .quiet_or(self.jail.create_dir(&path).await, "create directory"),
                Err(e) => fail("create directory", &e),
            },
            Command::Touch(name) => match self.step(cwd, &name) {
                Ok(path) => self.quiet_or(self.jail.touch(&path).await, "create file"),
                Err(e) => fail("create file", &e),
            },
            Command::Rm(name) => match self.step(cwd, &name) {
                Ok(path) => self.quiet_or(self.jail.remove_file(&path).await, "remove file"),
                Err(e) => fail("remove file", &e),
            },
            Command::Echo { content, file } => match self.step(cwd, &file) {
                Ok(path) => self
                    .quiet_or(self.jail.write_text(&path, &content).await, "write to file"),
                Err(e) => fail("write to file", &e),
            },
            Command::Cp { src, dest } => {
                match (self.step(cwd, &src), self.step(cwd, &dest)) {
                    (Ok(src), Ok(dest)) => {
                        self.quiet_or(self.jail.copy(&src, &dest).await, "copy file")
                    }
                    (Err(e), _) | (_, Err(e)) => fail("copy file", &e),
                }
            }
            Command::Mv { src, dest } => {
                match (self.step(cwd, &src), self.step(cwd, &dest)) {
                    (Ok(src), Ok(dest)) => {
                        self.quiet_or(self.jail.rename(&src, &dest).await, "move file")
                    }
                    (Err(e), _) | (_, Err(e)) => fail("move file", &e),
                }
            }
            Command::Invalid(message) => CommandOutput::line(message),
            Command::Unknown(line) => CommandOutput::line(&format!("{line}: command not found")),
        }
    }

    /// `cd` resolves against the jail; `/`, the empty argument and a
    /// bare `..` always land on a jail-defined directory, everything
    /// else must name an existing directory.
    async fn change_dir(&self, arg: &str, cwd: &mut PathBuf) -> CommandOutput {
        match self.jail.resolve(cwd, arg) {
            Ok(path) => {
                let always_valid = arg == "/" || arg.is_empty() || arg == "..";
                if always_valid || self.jail.is_dir(&path).await {
                    *cwd = path;
                    CommandOutput::quiet()
                } else {
                    CommandOutput::line("Directory not found")
                }
            }
            Err(_) => CommandOutput::line("Directory not found"),
        }
    }

    async fn read_file(&self, name: &str, cwd: &Path) -> CommandOutput {
        let path = match self.step(cwd, name) {
            Ok(path) => path,
            Err(_) => return CommandOutput::line("File not found"),
        };
        match self.jail.read_file(&path).await {
            Ok(content) => {
                let mut bytes = Vec::with_capacity(content.len() + 3);
                bytes.push(b'\n');
                bytes.extend_from_slice(&content);
                bytes.extend_from_slice(b"\r\n");
                CommandOutput {
                    bytes,
                    terminate: false,
                }
            }
            Err(JailError::NotFound) => CommandOutput::line("File not found"),
            Err(JailError::IsDirectory) => CommandOutput::line("Is a directory"),
            Err(JailError::Io(e)) => CommandOutput::line(&format!("Failed to read file: {e}")),
        }
    }

    fn step(&self, cwd: &Path, arg: &str) -> Result<PathBuf, JailError> {
        self.jail.resolve(cwd, arg)
    }

    fn quiet_or(&self, result: Result<(), JailError>, action: &str) -> CommandOutput {
        match result {
            Ok(()) => CommandOutput::quiet(),
            Err(e) => fail(action, &e),
        }
    }
}

fn fail(action: &str, error: &JailError) -> CommandOutput {
    CommandOutput::line(&format!("Failed to {action}: {error}"))
}
