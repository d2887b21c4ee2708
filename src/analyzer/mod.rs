// Analyzer module: decides which newly seen items are worth a notification.

pub mod relevance;

pub use relevance::partition;
