//! Domain layer: plaque records and the pure rules that govern them.

pub mod entities;
pub mod error;
pub mod plaques;
pub mod slug;
pub mod types;
