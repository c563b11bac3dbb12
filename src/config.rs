use clap::Parser;

pub const DEFAULT_REDIRECT_BASE_URL: &str = "https://link.microbin.dev";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "link-console",
    version,
    about = "Admin console for short-link redirect rules"
)]
pub struct Config {
    /// Host/IP to bind (default: localhost only)
    #[arg(long, default_value = "127.0.0.1", env = "CONSOLE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000, env = "CONSOLE_PORT")]
    pub port: u16,

    /// Shared admin password
    #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Origin of the upstream admin API, e.g. https://api.example.com
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Bearer token forwarded to the upstream admin API
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Mark the session cookie `Secure` (serve behind TLS)
    #[arg(long, env = "CONSOLE_PRODUCTION")]
    pub production: bool,

    /// Timeout for a single upstream call, in seconds
    #[arg(long, default_value_t = 15, env = "CONSOLE_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,

    /// Upstream deletes kept in flight during a batch delete
    #[arg(long, default_value_t = 4, env = "CONSOLE_BATCH_CONCURRENCY")]
    pub batch_concurrency: usize,

    /// Public redirect domain, used to render short URLs in the UI
    #[arg(
        long,
        default_value = DEFAULT_REDIRECT_BASE_URL,
        env = "NEXT_PUBLIC_REDIRECT_BASE_URL"
    )]
    pub redirect_base_url: String,

    #[arg(long, default_value = "Microbin Console", env = "NEXT_PUBLIC_SITE_TITLE")]
    pub site_title: String,

    #[arg(
        long,
        default_value = "Create custom-path short links (301 redirect)",
        env = "NEXT_PUBLIC_SITE_SUBTITLE"
    )]
    pub site_subtitle: String,

    #[arg(
        long,
        default_value = "link.microbin.dev",
        env = "NEXT_PUBLIC_HEADER_LINK_TEXT"
    )]
    pub header_link_text: String,

    #[arg(
        long,
        default_value = DEFAULT_REDIRECT_BASE_URL,
        env = "NEXT_PUBLIC_HEADER_LINK_HREF"
    )]
    pub header_link_href: String,
}

impl Config {
    pub fn password(&self) -> Option<&str> {
        non_blank(self.password.as_deref())
    }

    pub fn api_base_url(&self) -> Option<&str> {
        non_blank(self.api_base_url.as_deref())
    }

    pub fn admin_token(&self) -> Option<&str> {
        non_blank(self.admin_token.as_deref())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Blank values are treated the same as unset ones.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
