//! Persisted Scholar session cookies.
//!
//! Cookies exported from a browser session (Playwright's JSON format) are
//! replayed as a `Cookie` header, which makes Scholar less eager to serve
//! its automated-traffic page.

use crate::error::{Result, ScholarError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Default cookie file path: `~/.gscholar_cookies.json`
pub fn default_cookie_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".gscholar_cookies.json"))
        .ok_or_else(|| ScholarError::Config("Cannot determine home directory".to_string()))
}

/// Cookie entry matching Playwright's cookie format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Unix timestamp in seconds; `None` or negative for session cookies
    #[serde(default)]
    pub expires: Option<f64>,
}

impl Cookie {
    /// Whether the cookie's domain covers `host`.
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(&domain)
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }

    /// Whether the cookie has expired as of `now` (Unix seconds).
    pub fn is_expired_at(&self, now: f64) -> bool {
        matches!(self.expires, Some(at) if at > 0.0 && at < now)
    }
}

/// Loads and stores cookies in a JSON file
#[derive(Debug, Clone)]
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    /// Create a new CookieManager with the default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_cookie_path()?,
        })
    }

    /// Create a new CookieManager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cookies from file; a missing file means no cookies.
    pub fn load(&self) -> Result<Vec<Cookie>> {
        if !self.path.exists() {
            debug!("Cookie file not found: {:?}", self.path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        debug!("Loaded {} cookies from {:?}", cookies.len(), self.path);
        Ok(cookies)
    }

    /// Save cookies to file
    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let content = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, content)?;
        info!("Saved {} cookies to {:?}", cookies.len(), self.path);
        Ok(())
    }

    /// Remove the cookie file if present
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared cookies at {:?}", self.path);
        }
        Ok(())
    }

    /// `Cookie` header value for requests to `host`, skipping expired and
    /// foreign-domain cookies. Empty when nothing applies.
    pub fn cookie_header(&self, host: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        Ok(self
            .load()?
            .iter()
            .filter(|c| c.matches_host(host) && !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cookie(name: &str, domain: &str, expires: Option<f64>) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: format!("{name}-value"),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            expires,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let manager = CookieManager::with_path(PathBuf::from("/nonexistent/path"));
        assert!(manager.load()?.is_empty());
        assert_eq!(manager.cookie_header("scholar.google.com")?, "");
        Ok(())
    }

    #[test]
    fn test_save_load_clear() -> Result<()> {
        let dir = TempDir::new()?;
        let manager = CookieManager::with_path(dir.path().join("cookies.json"));

        manager.save(&[cookie("NID", ".google.com", None)])?;
        let loaded = manager.load()?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "NID");

        manager.clear()?;
        assert!(!manager.path().exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json")?;
        let manager = CookieManager::with_path(path);
        assert!(matches!(manager.load(), Err(ScholarError::Json(_))));
        Ok(())
    }

    #[test]
    fn test_header_filters_domain_and_expiry() -> Result<()> {
        let dir = TempDir::new()?;
        let manager = CookieManager::with_path(dir.path().join("cookies.json"));
        manager.save(&[
            cookie("NID", ".google.com", Some(-1.0)),
            cookie("GSP", "scholar.google.com", None),
            cookie("OLD", ".google.com", Some(1.0)),
            cookie("X", ".notgoogle.com", None),
        ])?;

        assert_eq!(
            manager.cookie_header("scholar.google.com")?,
            "NID=NID-value; GSP=GSP-value"
        );
        Ok(())
    }

    #[test]
    fn test_domain_suffix_needs_label_boundary() {
        let c = cookie("A", "google.com", None);
        assert!(c.matches_host("google.com"));
        assert!(c.matches_host("scholar.google.com"));
        assert!(!c.matches_host("evilgoogle.com"));
    }

    #[test]
    fn test_playwright_field_names() -> Result<()> {
        let cookies: Vec<Cookie> = serde_json::from_str(
            r#"[{"name":"NID","value":"v","domain":".google.com","httpOnly":true,"expires":1.5}]"#,
        )?;
        assert!(cookies[0].http_only);
        assert_eq!(cookies[0].path, "");
        Ok(())
    }
}
