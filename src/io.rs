pub mod config;
pub mod exporter;
pub mod obj_loader;
