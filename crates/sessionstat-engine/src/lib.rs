// Engine module - core logic (statistics, retention window, start/end pairing)
// This layer owns no threads and performs no I/O; the runtime crate drives it.

pub mod correlator;
pub mod registrar;
pub mod stats;

pub use correlator::{Correlation, SessionCorrelator};
pub use registrar::Registrar;
pub use stats::{StatKind, mean, median};
