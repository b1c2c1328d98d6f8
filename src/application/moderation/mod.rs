//! Plaque lifecycle: submission, edits, approval, deletion, featuring and
//! the maintenance jobs that keep secondary stores aligned.

mod commands;
mod effects;
mod maintenance;
mod service;
mod types;

pub use service::{ModerationDeps, ModerationService};
pub use types::{
    APPROVE_ALL_LIMIT, Actor, AddCommentCommand, BackfillReport, EditPlaqueCommand, ImageUpload,
    ModerationError, ModerationOptions, PlaqueFields, REINDEX_BATCH_SIZE, ReindexReport,
    SubmitPlaqueCommand,
};

pub(crate) use effects::METRIC_CLEANUP_FAILURE_TOTAL;
