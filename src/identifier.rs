use ulid::Ulid;

use crate::error::Result;

/// Generates file ids. Every call must return a fresh, collision-free id.
pub trait Identifier: Send + Sync {
    fn generate_id(&self) -> Result<String>;
}

/// ULID based ids: 26 chars, lexicographically sortable by creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidIdentifier;

impl Identifier for UlidIdentifier {
    fn generate_id(&self) -> Result<String> {
        Ok(Ulid::new().to_string())
    }
}
