use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub categories: Vec<String>,
}

/// Payload handed to the frontend: `{"news": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewsFeed {
    pub news: Vec<Article>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub news: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentsArticle {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub published: Option<String>,
}

impl Article {
    pub(crate) fn from_currents(raw: CurrentsArticle) -> Self {
        let mut categories: Vec<String> = Vec::with_capacity(raw.category.len());
        for cat in raw.category {
            let cat = cat.trim();
            if !cat.is_empty() && !categories.iter().any(|c| c == cat) {
                categories.push(cat.to_owned());
            }
        }

        Self {
            id: raw.id,
            title: raw.title.trim().to_owned(),
            url: raw.url,
            author: non_blank(raw.author),
            published_at: raw.published.as_deref().and_then(parse_published),
            description: non_blank(raw.description),
            // Currents sends the literal string "None" when there is no image.
            image_url: non_blank(raw.image).filter(|img| img != "None"),
            categories,
        }
    }

    pub fn source(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown")
    }
}

impl From<Vec<Article>> for NewsFeed {
    fn from(news: Vec<Article>) -> Self {
        Self { news }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Accepts `2024-01-15 10:30:00 +0000`, the same without offset, and RFC 3339.
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
