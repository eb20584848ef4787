// Engine constants (no magic values)

/// Maximum number of messages returned by one receive call
pub const BATCH_LIMIT: usize = 10;
