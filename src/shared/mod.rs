// Shared infrastructure used by the install flow.
pub mod cancel;
pub mod chart;
pub mod helm;
pub mod interrupt;
pub mod prompt;
pub mod runner;
