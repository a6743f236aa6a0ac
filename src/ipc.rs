//! Background daemon: frame reader, engine thread and the control socket.

mod dispatch;
mod pipeline;
mod runtime;
mod server;

pub use server::{client_request, run_daemon};
