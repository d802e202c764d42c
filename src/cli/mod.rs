//! CLI components.

pub mod commands;
pub mod completion_reedline;
pub mod renderer;
pub mod repl;
pub mod runner;
pub mod spinner;
pub mod stream_view;

pub use completion_reedline::{create_reedline, AbdoCompleter, AbdoPrompt, COMMANDS};
pub use renderer::TerminalRenderer;
pub use repl::Repl;
pub use runner::{run_interactive, run_single_prompt};
pub use spinner::{Spinner, SpinnerHandle};
