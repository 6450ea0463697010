/// Bounded LRU cache tables with idle expiry.
pub mod lru;
/// Single-flight population slots.
pub mod once_backed;
