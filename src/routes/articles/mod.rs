mod handler;
mod model;

pub use handler::{create_article, get_article, list_articles, transition_article};
pub use model::{Article, ArticleAction, ArticleError, ArticleStatus};
