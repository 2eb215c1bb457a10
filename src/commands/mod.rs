pub mod config;
pub mod debug;
pub mod diff;
pub mod diff_output;
pub mod export;
pub mod plan;
pub mod validate;

// Re-export all command functions
pub use config::cmd_config;
pub use debug::cmd_debug_dependencies;
pub use diff::cmd_diff;
pub use export::{ExportArgs, cmd_export};
pub use plan::{PlanArgs, cmd_plan};
pub use validate::cmd_validate;
