pub mod config;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{Deskpilot, PlannerMode, Services};
