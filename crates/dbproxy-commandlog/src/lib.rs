mod command;
mod log;

pub use command::{Command, CommandError, Values};
pub use log::{CommandLog, LogError};
