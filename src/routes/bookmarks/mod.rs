mod handler;
mod model;

pub use handler::{add_bookmark, list_bookmarks, remove_bookmark};
pub use model::Bookmark;
