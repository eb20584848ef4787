// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod engine;
pub mod recovery;
pub mod registry;

// Re-exports
pub use constants::BATCH_LIMIT;
pub use engine::QueueEngine;
pub use recovery::{RecoveryReport, RecoveryService};
pub use registry::{QueueRegistry, QueueSlot};
