//! Storage helpers shared by the repositories.

use uuid::Uuid;

#[cfg(test)]
pub mod memory;

/// Ids arrive as raw path/body strings; anything that is not a UUID is treated as "no such row".
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}
