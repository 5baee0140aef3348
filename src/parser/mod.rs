//! Markup → candidate records: markers and records are scanned from the same
//! document, joined by offset, then filtered by parent membership.
pub mod associate;
pub mod clean;
pub mod markers;
pub mod records;
pub mod resolve;
