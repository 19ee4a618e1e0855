//! Portfolio store backends

pub mod disk;
pub mod memory;

pub use disk::DiskPortfolioStore;
pub use memory::MemoryPortfolioStore;
