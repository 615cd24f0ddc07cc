pub mod config;
pub mod plate_detection;
pub mod utils;
