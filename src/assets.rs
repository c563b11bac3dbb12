use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::config::{Config, DEFAULT_REDIRECT_BASE_URL};

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Assets;

/// Cosmetic values substituted into the bundled pages.
#[derive(Debug, Clone)]
pub struct UiSettings {
    pub site_title: String,
    pub site_subtitle: String,
    pub header_link_text: String,
    pub header_link_href: String,
    pub redirect_base_url: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            site_title: "Microbin Console".to_string(),
            site_subtitle: "Create custom-path short links (301 redirect)".to_string(),
            header_link_text: "link.microbin.dev".to_string(),
            header_link_href: DEFAULT_REDIRECT_BASE_URL.to_string(),
            redirect_base_url: DEFAULT_REDIRECT_BASE_URL.to_string(),
        }
    }
}

impl UiSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            site_title: cfg.site_title.clone(),
            site_subtitle: cfg.site_subtitle.clone(),
            header_link_text: cfg.header_link_text.clone(),
            header_link_href: cfg.header_link_href.clone(),
            redirect_base_url: cfg.redirect_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn render(&self, template: &str) -> String {
        template
            .replace("{{SITE_TITLE}}", &escape_html(&self.site_title))
            .replace("{{SITE_SUBTITLE}}", &escape_html(&self.site_subtitle))
            .replace("{{HEADER_LINK_TEXT}}", &escape_html(&self.header_link_text))
            .replace("{{HEADER_LINK_HREF}}", &escape_html(&self.header_link_href))
            .replace("{{REDIRECT_BASE_URL}}", &escape_html(&self.redirect_base_url))
    }
}

/// Serves a bundled HTML page with the UI settings filled in.
pub fn page(name: &str, ui: &UiSettings) -> Response {
    let Some(file) = Assets::get(name) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let template = String::from_utf8_lossy(file.data.as_ref());
    Html(ui.render(&template)).into_response()
}

/// Serves a bundled file verbatim, or `None` if it is not bundled.
pub fn file(name: &str) -> Option<Response> {
    let file = Assets::get(name)?;
    Some(
        (
            [(header::CONTENT_TYPE, content_type(name))],
            file.data.into_owned(),
        )
            .into_response(),
    )
}

fn content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
