pub mod interpreter;
pub mod session;

pub use interpreter::{Command, CommandOutput, Interpreter};
pub use session::ShellSession;
