use crate::error::Result;
use crate::model::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;
use url::Url;

pub const API_BASE_ENV: &str = "LIBRARY_SEARCH_API";
pub const EXPORT_DIR_ENV: &str = "LIBRARY_SEARCH_EXPORT_DIR";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_PAGE_URL: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 6;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base of the search API; `/search`, `/index/stats` and
    /// `/recommendations/query` are joined onto it.
    pub api_base: Url,
    /// URL of the host page, used to seed the form and rewritten after each search.
    pub page_url: Url,
    pub page_size: u32,
    pub recommendation_limit: u32,
    pub export_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: normalize_base(DEFAULT_API_BASE).expect("default api base is valid"),
            page_url: Url::parse(DEFAULT_PAGE_URL).expect("default page url is valid"),
            page_size: DEFAULT_PAGE_SIZE,
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
            export_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `LIBRARY_SEARCH_API` and `LIBRARY_SEARCH_EXPORT_DIR`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(base) = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config = config.with_api_base(&base)?;
        }
        if let Some(dir) = std::env::var_os(EXPORT_DIR_ENV) {
            config.export_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, base: &str) -> Result<Self> {
        self.api_base = normalize_base(base)?;
        Ok(self)
    }

    pub fn with_page_url(mut self, page_url: &str) -> Result<Self> {
        self.page_url = Url::parse(page_url.trim())?;
        Ok(self)
    }
}

/// Parses a base URL and guarantees a trailing slash so relative joins
/// append to the path instead of replacing its last segment.
pub fn normalize_base(base: &str) -> Result<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{trimmed}/")
    } else {
        format!("http://{trimmed}/")
    };
    Ok(Url::parse(&candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_adds_scheme_and_slash() {
        let url = normalize_base("localhost:9000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/");
        let url = normalize_base("https://books.example/api///").unwrap();
        assert_eq!(url.as_str(), "https://books.example/api/");
    }

    #[test]
    fn defaults_match_page_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.recommendation_limit, 6);
        assert_eq!(config.api_base.as_str(), "http://127.0.0.1:8000/api/");
    }

    #[test]
    fn with_page_url_rejects_garbage() {
        assert!(ClientConfig::default().with_page_url("not a url").is_err());
    }
}
