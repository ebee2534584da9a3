// Command implementation for the single interactive install flow.
pub mod install;

pub use install::run_install;
