pub mod config;
pub mod constants;

pub use config::{LinkConfig, load_link_config, parse_link_config};
