#[allow(clippy::module_inception)]
pub mod models;
pub mod views;
