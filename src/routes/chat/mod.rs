mod handler;
mod model;

pub use handler::{chat_completion, get_usage};
pub use model::{ChatRequest, fallback_completion, rate_limited_body};
