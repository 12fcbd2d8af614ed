//! External command execution
//!
//! Every interaction with `docker-machine` and `docker` goes through a
//! [`CommandRunner`]. Commands that must reach a specific engine carry a
//! [`RemoteContext`](crate::machine::RemoteContext) which is applied to the
//! child process only, never to this process' environment.

pub mod command;
pub mod runner;
pub mod testing;

pub use command::{CommandOutput, ExternalCommand};
pub use runner::{CommandRunner, ProcessRunner};
