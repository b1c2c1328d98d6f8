//! Application services layer: repository contracts, collaborators and the
//! services the HTTP adapter and CLI drive.

pub mod collaborators;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod moderation;
pub mod pagination;
pub mod repos;
pub mod selection;
pub mod syndication;
