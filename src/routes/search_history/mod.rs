mod handler;
mod model;

pub use handler::{clear_search_history, list_search_history, record_search};
pub use model::SearchHistoryEntry;
