mod capacity;
pub use capacity::CapacityConfig;
