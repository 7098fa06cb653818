pub mod areas;
pub mod collect;
pub mod reproject;

// Re-export command functions for convenience
pub use areas::areas;
pub use collect::collect;
pub use reproject::reproject;
