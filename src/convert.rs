//! Markdown news articles → JSON documents for the frontend.
//!
//! A manifest maps each markdown file to its category and image metadata.
//! Each article becomes `<name>.json`, and `all_articles.json` collects them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_AUTHOR: &str = "TimeOut Dubai";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const COLLECTION_FILE: &str = "all_articles.json";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize article: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub image_alt: String,
    #[serde(default)]
    pub image_credit: String,
}

/// 文件名 → 元数据，按文件名排序输出
pub type Manifest = BTreeMap<String, ManifestEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDocument {
    pub headline: String,
    pub content: String,
    pub image_path: String,
    pub image_alt: String,
    pub image_credit: String,
    pub category: String,
    pub publish_date: String,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleCollection {
    pub articles: Vec<ArticleDocument>,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub manifest: Option<PathBuf>,
    pub author: String,
    pub publish_date: String,
}

/// 第一行去掉前导 `#` 和空格作为标题
pub fn extract_headline(markdown: &str) -> String {
    markdown
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches(['#', ' '])
        .trim()
        .to_string()
}

pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn render_article(
    markdown: &str,
    entry: &ManifestEntry,
    publish_date: &str,
    author: &str,
) -> ArticleDocument {
    ArticleDocument {
        headline: extract_headline(markdown),
        content: render_html(markdown),
        image_path: format!("images/{}", entry.image),
        image_alt: entry.image_alt.clone(),
        image_credit: entry.image_credit.clone(),
        category: entry.category.clone(),
        publish_date: publish_date.to_string(),
        author: author.to_string(),
    }
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ConvertError> {
    let raw = fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConvertError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConvertError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn convert_directory(options: &ConvertOptions) -> Result<Vec<ArticleDocument>, ConvertError> {
    let manifest_path = options
        .manifest
        .clone()
        .unwrap_or_else(|| options.input_dir.join(MANIFEST_FILE));
    let manifest = load_manifest(&manifest_path)?;

    fs::create_dir_all(&options.output_dir).map_err(|source| ConvertError::Write {
        path: options.output_dir.clone(),
        source,
    })?;

    let mut articles = Vec::with_capacity(manifest.len());
    for (file_name, entry) in &manifest {
        let path = options.input_dir.join(file_name);
        let markdown = fs::read_to_string(&path).map_err(|source| ConvertError::Read {
            path: path.clone(),
            source,
        })?;

        let article = render_article(&markdown, entry, &options.publish_date, &options.author);

        let output_name = Path::new(file_name).with_extension("json");
        write_json(&options.output_dir.join(output_name), &article)?;
        tracing::debug!("Converted {} -> {:?}", file_name, article.headline);

        articles.push(article);
    }

    let collection = ArticleCollection { articles };
    write_json(&options.output_dir.join(COLLECTION_FILE), &collection)?;

    Ok(collection.articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ManifestEntry {
        ManifestEntry {
            category: "News".into(),
            image: "june-fuel-prices.jpg".into(),
            image_alt: "ADNOC fuel station".into(),
            image_credit: "Oil & Gas Middle East".into(),
        }
    }

    #[test]
    fn headline_strips_heading_markers() {
        assert_eq!(extract_headline("# June fuel prices\n\nBody"), "June fuel prices");
        assert_eq!(extract_headline("## #Tagged title  \n"), "Tagged title");
        assert_eq!(extract_headline("Plain first line"), "Plain first line");
        assert_eq!(extract_headline(""), "");
    }

    #[test]
    fn renders_markdown_to_html() {
        let html = render_html("# Title\n\nSome **bold** text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn article_uses_manifest_metadata() {
        let doc = render_article("# Fuel\n\ntext", &entry(), "2025-06-01", DEFAULT_AUTHOR);
        assert_eq!(doc.headline, "Fuel");
        assert_eq!(doc.image_path, "images/june-fuel-prices.jpg");
        assert_eq!(doc.category, "News");
        assert_eq!(doc.publish_date, "2025-06-01");
        assert_eq!(doc.author, "TimeOut Dubai");
    }

    #[test]
    fn converts_directory_and_writes_collection() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        fs::write(input.path().join("june-fuel-prices.md"), "# June fuel prices\n\nUp 5 fils.").unwrap();
        fs::write(input.path().join("summer-dining-deals.md"), "# Summer dining deals\n").unwrap();
        fs::write(
            input.path().join(MANIFEST_FILE),
            r#"{
                "june-fuel-prices.md": {"category": "News", "image": "june-fuel-prices.jpg"},
                "summer-dining-deals.md": {"category": "Food & Drink", "image": "summer-dining-deals.jpg",
                    "image_alt": "Prime68 interior", "image_credit": "Marriott"}
            }"#,
        )
        .unwrap();

        let options = ConvertOptions {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().join("out"),
            manifest: None,
            author: DEFAULT_AUTHOR.into(),
            publish_date: "2025-06-21".into(),
        };
        let articles = convert_directory(&options).unwrap();
        assert_eq!(articles.len(), 2);

        let single: ArticleDocument = serde_json::from_str(
            &fs::read_to_string(output.path().join("out/june-fuel-prices.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(single.headline, "June fuel prices");

        let collection: ArticleCollection = serde_json::from_str(
            &fs::read_to_string(output.path().join("out").join(COLLECTION_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(collection.articles.len(), 2);
        assert_eq!(collection.articles[1].image_alt, "Prime68 interior");
    }

    #[test]
    fn missing_article_reports_path() {
        let input = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join(MANIFEST_FILE),
            r#"{"missing.md": {"category": "News", "image": "x.jpg"}}"#,
        )
        .unwrap();

        let options = ConvertOptions {
            input_dir: input.path().to_path_buf(),
            output_dir: input.path().join("out"),
            manifest: None,
            author: DEFAULT_AUTHOR.into(),
            publish_date: "2025-06-21".into(),
        };
        let err = convert_directory(&options).unwrap_err();
        assert!(matches!(err, ConvertError::Read { ref path, .. } if path.ends_with("missing.md")));
    }
}
