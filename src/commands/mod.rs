pub mod analyze;
pub mod check;
pub mod serve;

pub use analyze::{handle_command as handle_analyze_command, AnalyzeOptions};
pub use check::handle_command as handle_check_command;
pub use serve::handle_command as handle_serve_command;
