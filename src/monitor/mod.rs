//! Live monitoring: background sampling, reclamation scheduling and rendering

pub mod coordinator;
pub mod dashboard;

pub use coordinator::{Coordinator, ReclamationEvent, SamplingHandle};
pub use dashboard::{render_cleanup_report, render_dashboard, render_step, render_window_summary, WindowStats};
