//! Page rendering.

use serde_json::Value;
use sitestats_core::{RenderError, SiteStatsResult};
use tera::{Context, Tera};

/// Name of the statistics page template.
pub const STATISTICS_TEMPLATE: &str = "siteStatistics.html";

const STATISTICS_TEMPLATE_SOURCE: &str = include_str!("../templates/siteStatistics.html");

/// Turns a template name and a JSON object of bindings into a document.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, bindings: &Value) -> SiteStatsResult<String>;
}

/// Tera-based renderer holding the built-in templates.
///
/// HTML autoescaping is on for every template, so titles and names coming
/// from the data stores are escaped.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new() -> SiteStatsResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        tera.add_raw_template(STATISTICS_TEMPLATE, STATISTICS_TEMPLATE_SOURCE)
            .map_err(|e| RenderError::RenderFailed {
                template: STATISTICS_TEMPLATE.to_string(),
                reason: format!("Invalid Tera template: {}", e),
            })?;
        Ok(Self { tera })
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, bindings: &Value) -> SiteStatsResult<String> {
        if !self.tera.get_template_names().any(|name| name == template) {
            return Err(RenderError::TemplateNotFound {
                name: template.to_string(),
            }
            .into());
        }

        let failed = |reason: String| RenderError::RenderFailed {
            template: template.to_string(),
            reason,
        };
        let context = Context::from_value(bindings.clone()).map_err(|e| failed(e.to_string()))?;
        let html = self
            .tera
            .render(template, &context)
            .map_err(|e| failed(format!("Template rendering failed: {}", e)))?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitestats_core::SiteStatsError;

    fn bindings(title: &str) -> Value {
        json!({
            "siteName": "Open Journals",
            "journalCount": 3,
            "issueCount": 2,
            "submissionCount": 5,
            "allTimeDownloads": 1000,
            "allTimeMostRead": [
                { "url": "http://localhost/jbio/article/view/1", "title": title, "tenant_name": "Biology", "metric": 500 }
            ],
            "lastMonthMostRead": [],
            "stylesheetUrl": "http://localhost/statistics/siteStatistics.css",
            "lastUpdated": "2024-06-15T10:00:00Z",
            "labels": {
                "title": "Site Statistics",
                "journals": "Journals",
                "issues": "Issues",
                "articles": "Articles",
                "downloads": "Downloads",
                "allTimeMostRead": "Most Read of All Time",
                "lastMonthMostRead": "Most Read Last Month",
                "noneAvailable": "No statistics available yet.",
                "lastUpdated": "Last updated"
            },
            "locale": "en_US"
        })
    }

    #[test]
    fn test_render_statistics_page() {
        let renderer = TeraRenderer::new().unwrap();
        let html = renderer.render(STATISTICS_TEMPLATE, &bindings("Cell Walls")).unwrap();

        assert!(html.contains("<h1>Open Journals</h1>"));
        assert!(html.contains("Cell Walls"));
        assert!(html.contains(r#"<span class="count">1000</span>"#));
        assert!(html.contains("No statistics available yet."));
        assert!(html.contains(r#"lang="en-US""#));
    }

    #[test]
    fn test_titles_are_escaped() {
        let renderer = TeraRenderer::new().unwrap();
        let html = renderer
            .render(STATISTICS_TEMPLATE, &bindings("<script>alert(1)</script>"))
            .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unknown_template() {
        let renderer = TeraRenderer::new().unwrap();
        let err = renderer.render("missing.html", &json!({})).unwrap_err();
        assert!(matches!(
            err,
            SiteStatsError::Render(RenderError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_binding_fails() {
        let renderer = TeraRenderer::new().unwrap();
        let err = renderer.render(STATISTICS_TEMPLATE, &json!({})).unwrap_err();
        assert!(matches!(
            err,
            SiteStatsError::Render(RenderError::RenderFailed { .. })
        ));
    }
}
