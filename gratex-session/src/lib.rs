pub mod log;
pub mod session;
pub mod shuffle;

pub use log::PresentationLog;
pub use session::{
    OrderPolicy, Presentation, SessionConfig, SessionOutcome, export_results, run_on_trigger,
    run_ordered, scan_animations,
};
pub use shuffle::hashed_order;
