mod chrome;
mod lookup;
mod random;
mod service;
pub mod types;

pub use random::SAMPLE_ATTEMPTS;
pub(crate) use random::METRIC_RANDOM_SAMPLE_ATTEMPTS;
pub use service::SelectionService;
pub use types::{
    CHROME_ITEMS, ChromeValues, MAX_PER_PAGE, PagesSummary, PlaquePage, Resolved, SelectionError,
    SelectionOptions,
};
