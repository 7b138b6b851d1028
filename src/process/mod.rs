//! Engine process handling
//!
//! - [`CommandFactory`] turns a [`crate::RunRequest`] into an [`EngineCommand`];
//!   [`RcloneCommandFactory`] is the rclone CLI implementation
//! - [`SubprocessSupervisor`] launches the command, hands out its diagnostic
//!   stream, waits for exit and kills it on demand

mod command;
mod supervisor;

pub use command::{CommandFactory, EngineCommand, RcloneCommandFactory};
pub use supervisor::SubprocessSupervisor;
