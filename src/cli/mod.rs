pub mod commands;

pub use commands::{Cli, CliHandler, Commands};
