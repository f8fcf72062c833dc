pub mod models;
pub mod services;

// Re-export the core types for external use
pub use models::*;
pub use services::*;
