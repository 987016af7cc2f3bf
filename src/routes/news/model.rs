use serde::{Deserialize, Serialize};

pub const DEFAULT_QUERY: &str = "Dubai";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    /// 按字符串接收，非法值回退到默认值
    pub page_size: Option<String>,
}

impl NewsQuery {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsSource {
    pub id: Option<String>,
    pub name: String,
}

/// NewsAPI 文章结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: NewsSource,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub error: bool,
}

// (标题, 分类, 摘要, 图片)
const FALLBACK_ARTICLES: &[(&str, &str, &str, &str)] = &[
    (
        "Dubai trials a four-day work week for government employees",
        "News",
        "Selected public sector departments move to a compressed schedule over the summer months.",
        "dubai-four-day-workweek.jpg",
    ),
    (
        "June fuel prices announced for the UAE",
        "News",
        "The UAE Fuel Price Committee has published the new per-litre rates for Super 98, Special 95 and diesel.",
        "june-fuel-prices.jpg",
    ),
    (
        "Islamic New Year: long weekend confirmed for residents",
        "News",
        "Private and public sector employees get a paid day off for the Hijri New Year.",
        "islamic-new-year-weekend.jpg",
    ),
    (
        "The biggest concerts coming to Dubai this year",
        "Things to Do",
        "From Coca-Cola Arena headliners to open-air shows, here is the live music calendar.",
        "dubai-concerts-2025.jpg",
    ),
    (
        "Summer dining deals worth booking in Dubai",
        "Food & Drink",
        "Set menus and early-bird offers at some of the city's best restaurants.",
        "summer-dining-deals.jpg",
    ),
    (
        "New Year's Eve at Soho Garden",
        "Nightlife",
        "Multiple stages, international DJs and a countdown to midnight at Meydan.",
        "nye-soho-garden.jpg",
    ),
];

pub fn fallback_news(category: Option<&str>, page_size: u32) -> NewsResponse {
    let published_at = chrono::Utc::now().format("%Y-%m-%dT00:00:00Z").to_string();

    let articles: Vec<NewsArticle> = FALLBACK_ARTICLES
        .iter()
        .filter(|(_, cat, _, _)| category.is_none_or(|c| cat.eq_ignore_ascii_case(c)))
        .take(page_size as usize)
        .map(|(title, _, description, image)| NewsArticle {
            source: NewsSource {
                id: None,
                name: "TimeOut Dubai".into(),
            },
            author: Some("TimeOut Dubai".into()),
            title: title.to_string(),
            description: Some(description.to_string()),
            url: "https://www.timeoutdubai.com/news".into(),
            url_to_image: Some(format!("images/{}", image)),
            published_at: published_at.clone(),
            content: None,
        })
        .collect();

    NewsResponse {
        status: "ok".into(),
        total_results: articles.len() as u64,
        articles,
        message: None,
        fallback: true,
        error: true,
    }
}
