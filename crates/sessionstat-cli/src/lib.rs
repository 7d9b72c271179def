// NOTE: sessionstat process layout
//
// transport (axum) --events--> correlator thread --sessions--> registrar thread
//                 <--------------- durations query ----------------/
//
// - Both buffers are bounded; a full buffer is reported to the caller, never waited on
// - The registrar thread is the only owner of the sliding window
// - Statistics are computed on the transport side from the returned durations

mod args;
mod commands;
mod handlers;
pub mod logging;
pub mod server;

pub use args::{Cli, Commands, ConfigCommand, LogLevel, ServeArgs};
pub use commands::run;
