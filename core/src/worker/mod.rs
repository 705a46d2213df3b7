mod io_pump;
mod run;

pub use io_pump::{pump, OutputChunk, OutputStream};
pub use run::{run_worker, WorkerOutcome, WorkerRequest, WorkerSettings};
