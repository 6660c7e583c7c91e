pub mod process;
pub mod probe;

pub use process::{ProcessRecord, SupervisionRequest};
pub use probe::{ProbeResult, ReadinessOutcome, ReadinessProbe};
