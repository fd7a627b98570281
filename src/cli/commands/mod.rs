mod charts;
mod clean;
mod export;
mod fetch;

pub use charts::cmd_charts;
pub use clean::cmd_clean;
pub use export::cmd_export;
pub use fetch::cmd_fetch;
