mod handler;
mod model;

pub use handler::{get_preferences, update_preferences};
pub use model::{UserPreferences, default_preferences};
