//! Links into the hosting site.

use crate::routes::statistics::STYLESHEET_PATH;

/// Builds links to pages of the hosting site.
pub trait UrlBuilder: Send + Sync {
    /// URL of the public article page of a submission.
    fn article_view_url(&self, tenant_path: &str, best_id: &str) -> String;
}

/// Builds `{base_url}/{tenant_path}/article/view/{best_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrlBuilder {
    base_url: String,
}

impl PageUrlBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the page stylesheet served by this service.
    pub fn stylesheet_url(&self) -> String {
        format!("{}{}", self.base_url, STYLESHEET_PATH)
    }
}

impl UrlBuilder for PageUrlBuilder {
    fn article_view_url(&self, tenant_path: &str, best_id: &str) -> String {
        format!(
            "{}/{}/article/view/{}",
            self.base_url,
            urlencoding::encode(tenant_path),
            urlencoding::encode(best_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_view_url() {
        let urls = PageUrlBuilder::new("https://journals.example.org/");
        assert_eq!(
            urls.article_view_url("jbio", "42"),
            "https://journals.example.org/jbio/article/view/42"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let urls = PageUrlBuilder::new("http://localhost:3000");
        assert_eq!(
            urls.article_view_url("j bio", "a/b?c"),
            "http://localhost:3000/j%20bio/article/view/a%2Fb%3Fc"
        );
    }

    #[test]
    fn test_stylesheet_url() {
        let urls = PageUrlBuilder::new("http://localhost:3000");
        assert_eq!(
            urls.stylesheet_url(),
            "http://localhost:3000/statistics/siteStatistics.css"
        );
    }
}
