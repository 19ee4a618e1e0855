//! Terminal renderers for the service's views

pub mod manage;
pub mod prices;
pub mod setup;
pub mod summary;
pub mod ui;
