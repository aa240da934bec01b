//! Web technology fingerprinting collaborator
//!
//! The batch pipeline only depends on the [`Fingerprinter`] trait: URL in,
//! free-text report out. [`HttpFingerprinter`] is the production
//! implementation - it fetches the page over HTTPS and derives technologies
//! from response headers, session cookie names, the generator meta tag, and
//! a small table of body signatures. Tests substitute scripted
//! implementations of the trait.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;
use crate::report::{TECH_END_MARKER, TECH_START_MARKER};

/// Failure classes at the collaborator boundary.
///
/// The executor retries `Connection` and records everything else as a
/// permanent per-domain failure.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected content type '{0}' (expected text/html)")]
    WrongContentType(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// URL in, webtech-style free-text report out.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn scan(&self, url: &str) -> Result<String, ScanError>;
}

/// Body signatures: first match per technology wins
static BODY_SIGNATURES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r#"(?i)data-reactroot|react(?:\.production)?(?:\.min)?\.js"#, "React"),
        (r#"(?i)data-v-app|vue(?:\.runtime)?(?:\.global)?(?:\.min)?\.js"#, "Vue.js"),
        (r#"(?i)ng-version="#, "Angular"),
        (r#"(?i)jquery[.\-][\d.]*(?:min\.)?js"#, "jQuery"),
        (r#"(?i)/wp-content/|/wp-includes/"#, "WordPress"),
        (r#"(?i)bootstrap(?:\.bundle)?(?:\.min)?\.(?:css|js)"#, "Bootstrap"),
        (r#"(?i)cdn\.shopify\.com"#, "Shopify"),
        (r#"(?i)__NEXT_DATA__"#, "Next.js"),
        (r#"(?i)window\.__NUXT__"#, "Nuxt.js"),
        (r#"(?i)Drupal\.settings|/sites/default/files/"#, "Drupal"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("static signature regex"), name))
    .collect()
});

/// Cookie-name prefixes that identify the framework which set them
const COOKIE_SIGNATURES: &[(&str, &str)] = &[
    ("wordpress_", "WordPress"),
    ("wp-settings", "WordPress"),
    ("phpsessid", "PHP"),
    ("laravel_session", "Laravel"),
    ("csrftoken", "Django"),
    ("jsessionid", "Java"),
    ("asp.net_sessionid", "ASP.NET"),
    ("_shopify_", "Shopify"),
];

/// Response headers that carry no fingerprinting signal and are not worth
/// reporting in the custom headers section
const COMMON_HEADERS: &[&str] = &[
    "date",
    "content-type",
    "content-length",
    "content-encoding",
    "connection",
    "transfer-encoding",
    "vary",
    "cache-control",
    "expires",
    "etag",
    "last-modified",
    "accept-ranges",
    "set-cookie",
    "strict-transport-security",
    "alt-svc",
    "age",
    "pragma",
    "link",
    "location",
];

/// Production fingerprinter backed by a shared reqwest client
pub struct HttpFingerprinter {
    client: reqwest::Client,
}

impl HttpFingerprinter {
    pub fn new(http: &HttpConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(http.request_timeout())
            .user_agent(http.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScanError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// Derive technology names from headers and body, de-duplicated in
    /// detection order.
    fn detect(headers: &reqwest::header::HeaderMap, body: &str) -> Vec<String> {
        let mut technologies: Vec<String> = Vec::new();
        let mut push = |name: String| {
            if !name.is_empty() && !technologies.iter().any(|t| *t == name) {
                technologies.push(name);
            }
        };

        if let Some(server) = header_str(headers, "server") {
            // "nginx/1.24.0 (Ubuntu)" -> "Nginx 1.24.0"
            push(normalize_product_token(server));
        }
        if let Some(powered) = header_str(headers, "x-powered-by") {
            push(normalize_product_token(powered));
        }
        if let Some(generator) = header_str(headers, "x-generator") {
            push(generator.trim().to_string());
        }

        for cookie in headers.get_all("set-cookie") {
            if let Some(name) = cookie_name(cookie) {
                for (prefix, tech) in COOKIE_SIGNATURES {
                    if name.starts_with(prefix) {
                        push((*tech).to_string());
                    }
                }
            }
        }

        if let Some(generator) = meta_generator(body) {
            push(generator);
        }

        for (regex, name) in BODY_SIGNATURES.iter() {
            if regex.is_match(body) {
                push((*name).to_string());
            }
        }

        technologies
    }

    /// Render the free-text report the extractor understands
    fn render_report(url: &str, technologies: &[String], custom_headers: &[(String, String)]) -> String {
        let mut report = format!("Target URL: {}\n", url);

        report.push_str(TECH_START_MARKER);
        report.push('\n');
        for tech in technologies {
            report.push_str(&format!("\t- {}\n", tech));
        }

        if !custom_headers.is_empty() {
            report.push_str(TECH_END_MARKER);
            report.push('\n');
            for (name, value) in custom_headers {
                report.push_str(&format!("\t- {}: {}\n", name, value));
            }
        }

        report
    }
}

#[async_trait]
impl Fingerprinter for HttpFingerprinter {
    async fn scan(&self, url: &str) -> Result<String, ScanError> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(classify_reqwest_error)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty() && !content_type.starts_with("text/html") {
            return Err(ScanError::WrongContentType(content_type));
        }

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(classify_reqwest_error)?;

        let technologies = Self::detect(&headers, &body);
        let custom_headers = interesting_headers(&headers);

        debug!("{}: {} technologies detected", url, technologies.len());
        Ok(Self::render_report(url, &technologies, &custom_headers))
    }
}

/// Map a reqwest error onto the collaborator failure taxonomy. Timeouts are
/// connection-level: the request never produced a usable response.
fn classify_reqwest_error(e: reqwest::Error) -> ScanError {
    if e.is_connect() || e.is_timeout() {
        ScanError::Connection(e.to_string())
    } else {
        ScanError::Request(e.to_string())
    }
}

fn header_str<'a>(headers: &'a reqwest::header::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Lowercased cookie name from a Set-Cookie header value
fn cookie_name(value: &reqwest::header::HeaderValue) -> Option<String> {
    let text = value.to_str().ok()?;
    let name = text.split('=').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Non-standard response headers worth surfacing in the report
fn interesting_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    let mut interesting = Vec::new();
    for (name, value) in headers {
        let name_lower = name.as_str().to_lowercase();
        if COMMON_HEADERS.contains(&name_lower.as_str()) {
            continue;
        }
        // Detection headers already contributed to the technology list
        if matches!(name_lower.as_str(), "server" | "x-powered-by" | "x-generator") {
            continue;
        }
        if let Ok(value) = value.to_str() {
            interesting.push((name.as_str().to_string(), value.to_string()));
        }
    }
    interesting
}

/// Pull the `<meta name="generator">` content out of the page
fn meta_generator(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse(r#"meta[name="generator"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Normalize a product token like "nginx/1.24.0 (Ubuntu)" to "Nginx 1.24.0"
fn normalize_product_token(token: &str) -> String {
    let first = token.split_whitespace().next().unwrap_or("");
    let (product, version) = match first.split_once('/') {
        Some((p, v)) => (p, Some(v)),
        None => (first, None),
    };
    if product.is_empty() {
        return String::new();
    }

    let mut chars = product.chars();
    let capitalized = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };

    match version {
        Some(v) if !v.is_empty() => format!("{} {}", capitalized, v),
        _ => capitalized,
    }
}
