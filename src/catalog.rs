use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env;

const TVMAZE_BASE: &str = "https://api.tvmaze.com";

#[derive(Debug, Clone)]
pub struct TvMazeClient {
    client: Client,
    base_url: String,
}

/// Read-only view of the external catalog. All calls are single
/// fire-and-await requests with no retry and no deadline; callers decide how
/// to degrade on failure.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_shows(&self) -> Result<Vec<Show>>;
    async fn fetch_show(&self, id: i64) -> Result<Option<Show>>;
    async fn fetch_episodes(&self, show_id: i64) -> Result<Vec<Episode>>;
    async fn fetch_cast(&self, show_id: i64) -> Result<Vec<CastMember>>;
    async fn fetch_episode(&self, id: i64) -> Result<Option<Episode>>;
    async fn search_shows(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// A show as the catalog returns it. Image and summary may be absent; shows
/// that were never rated carry an empty rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub name: String,
    pub image: Option<Image>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub genres: Vec<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub medium: Option<String>,
    pub original: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rating {
    pub average: Option<f64>,
}

/// An episode record. The summary is an HTML fragment and is passed through
/// untouched; specials may lack a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub name: Option<String>,
    pub season: i64,
    pub number: Option<i64>,
    pub airdate: Option<String>,
    pub runtime: Option<f32>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub person: Person,
    pub character: Character,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: Option<f64>,
    pub show: Show,
}

impl TvMazeClient {
    pub fn from_env() -> Self {
        let base_url = env::var("TVMAZE_API_BASE").unwrap_or_else(|_| TVMAZE_BASE.to_string());
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }

    /// Like `get_json`, but an upstream 404 means "record absent", not a
    /// failure.
    async fn get_json_opt<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<Option<T>> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl CatalogApi for TvMazeClient {
    async fn list_shows(&self) -> Result<Vec<Show>> {
        let url = format!("{}/shows", self.base_url);
        self.get_json(&url).await
    }

    async fn fetch_show(&self, id: i64) -> Result<Option<Show>> {
        let url = format!("{}/shows/{}", self.base_url, id);
        self.get_json_opt(&url).await
    }

    async fn fetch_episodes(&self, show_id: i64) -> Result<Vec<Episode>> {
        let url = format!("{}/shows/{}/episodes", self.base_url, show_id);
        self.get_json(&url).await
    }

    async fn fetch_cast(&self, show_id: i64) -> Result<Vec<CastMember>> {
        let url = format!("{}/shows/{}/cast", self.base_url, show_id);
        self.get_json(&url).await
    }

    async fn fetch_episode(&self, id: i64) -> Result<Option<Episode>> {
        let url = format!("{}/episodes/{}", self.base_url, id);
        self.get_json_opt(&url).await
    }

    async fn search_shows(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/search/shows?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        self.get_json(&url).await
    }
}

/// Drops shows without a rating average and orders the rest best-first. Ties
/// keep the upstream order.
pub fn rank_by_rating(mut shows: Vec<Show>) -> Vec<Show> {
    shows.retain(|show| show.rating.average.is_some());
    shows.sort_by(|a, b| {
        b.rating
            .average
            .partial_cmp(&a.rating.average)
            .unwrap_or(Ordering::Equal)
    });
    shows
}

/// Strips markup from a show summary for plain-text display.
pub fn plain_summary(html: &str) -> String {
    nanohtml2text::html2text(html).trim().to_string()
}
