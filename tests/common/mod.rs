use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use stackscan::config::{AppConfig, BatchConfig, BatchMode, HttpConfig, RetryConfig};
use stackscan::fingerprint::{Fingerprinter, ScanError};

/// Per-URL behavior for the scripted fingerprinter
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeed with a report listing these technologies
    Technologies(Vec<&'static str>),
    /// Fail with a connection error on every attempt
    ConnectionError,
    /// Fail with a wrong-content-type error
    WrongContentType,
}

/// Deterministic in-memory stand-in for the HTTP fingerprinter. URLs without
/// a script fall back to `default_script`; every call is counted.
pub struct ScriptedFingerprinter {
    scripts: HashMap<String, Script>,
    default_script: Script,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedFingerprinter {
    pub fn new(default_script: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default_script,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn call_count(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn render_report(url: &str, technologies: &[&str]) -> String {
        let mut report = format!("Target URL: {}\nDetected technologies:\n", url);
        for tech in technologies {
            report.push_str(&format!("\t- {}\n", tech));
        }
        report.push_str("Detected the following interesting custom headers:\n\t- X-Request-Id: test\n");
        report
    }
}

#[async_trait]
impl Fingerprinter for ScriptedFingerprinter {
    async fn scan(&self, url: &str) -> Result<String, ScanError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let script = self.scripts.get(url).unwrap_or(&self.default_script);
        match script {
            Script::Technologies(technologies) => Ok(Self::render_report(url, technologies)),
            Script::ConnectionError => Err(ScanError::Connection("connection refused".to_string())),
            Script::WrongContentType => {
                Err(ScanError::WrongContentType("application/pdf".to_string()))
            }
        }
    }
}

/// Pipeline config with zero retry delay so failure-path tests run fast
pub fn test_config(mode: BatchMode) -> AppConfig {
    AppConfig {
        http: HttpConfig {
            user_agent: "stackscan-test/0.3".to_string(),
            request_timeout_secs: 6,
        },
        retry: RetryConfig {
            max_attempts: 3,
            delay_secs: 0,
        },
        batch: BatchConfig {
            mode,
            chunk_size: 100,
            concurrency: 8,
            not_found_label: "Not Found".to_string(),
        },
    }
}

/// Parse the output CSV into (header, data rows)
pub fn read_csv(path: &std::path::Path) -> (String, Vec<Vec<String>>) {
    let content = std::fs::read_to_string(path).expect("output CSV should exist");
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let header = reader
        .headers()
        .expect("output CSV should have a header")
        .iter()
        .collect::<Vec<_>>()
        .join(",");
    let rows = reader
        .records()
        .map(|r| r.expect("row should parse").iter().map(|f| f.to_string()).collect())
        .collect();
    (header, rows)
}
