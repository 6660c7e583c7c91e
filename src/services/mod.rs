pub mod clock;
pub mod launcher;
pub mod process_checker;
pub mod process_table;
pub mod readiness;
pub mod supervisor;
pub mod terminator;

pub use clock::TokioClock;
pub use launcher::ProcessLauncher;
pub use process_checker::ProcessMatcher;
pub use process_table::SystemTable;
pub use readiness::HttpProber;
pub use supervisor::{Supervisor, SystemSupervisor};
pub use terminator::SystemTerminator;
