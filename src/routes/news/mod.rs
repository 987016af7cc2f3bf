mod handler;
mod model;

pub use handler::get_news;
pub use model::{NewsArticle, NewsResponse, fallback_news};
