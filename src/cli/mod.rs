mod commands;
mod handlers;

pub use commands::{Cli, Commands};
pub use handlers::{handle_mix, handle_save, init_tracing};
