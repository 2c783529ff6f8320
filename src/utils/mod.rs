// Utility functions
pub mod retry;

pub use retry::RetryPolicy;
