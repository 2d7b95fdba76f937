//! Configuration types for a dissect run.
//!
//! All behaviour is controlled through [`DissectConfig`], built via its
//! [`DissectConfigBuilder`]. One struct for every knob makes it easy to
//! share a config across tasks and to log exactly what a run used.

use crate::classify::DEFAULT_MIN_IMAGE_SIZE;
use crate::error::DissectError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for extracting a PDF and building its report.
///
/// # Example
/// ```rust
/// use pdf_dissect::DissectConfig;
///
/// let config = DissectConfig::builder()
///     .min_image_size(128)
///     .screenshots(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.min_image_size, 128);
/// ```
#[derive(Clone)]
pub struct DissectConfig {
    /// Images with `width * height` below `min_image_size²` are reported as
    /// small/UI images. Default: 256.
    pub min_image_size: u32,

    /// Embedded images narrower or shorter than this are not extracted at
    /// all (1-px rules, spacer GIFs). Default: 10.
    pub min_image_dimension: u32,

    /// Render a screenshot of every page. Default: true.
    pub screenshots: bool,

    /// Longest edge of a page screenshot in pixels. Default: 1024.
    pub screenshot_max_pixels: u32,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Pages rendered inline in the HTML report; the rest load from the
    /// pages JSON in chunks of the same size. Default: 25.
    pub pages_per_chunk: usize,

    /// Characters of page text shown per page section. Default: 2000.
    pub text_preview_chars: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Ask a vision LLM to describe unique regular images. Default: false.
    pub describe_images: bool,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for descriptions. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per description. Default: 512.
    pub max_tokens: usize,

    /// Retries per image on a failed VLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Concurrent VLM calls. Default: 4.
    pub concurrency: usize,

    /// Per-VLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom description prompt. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Receives per-page and per-description events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DissectConfig {
    fn default() -> Self {
        Self {
            min_image_size: DEFAULT_MIN_IMAGE_SIZE,
            min_image_dimension: 10,
            screenshots: true,
            screenshot_max_pixels: 1024,
            pages: PageSelection::default(),
            pages_per_chunk: 25,
            text_preview_chars: 2000,
            password: None,
            download_timeout_secs: 120,
            describe_images: false,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 512,
            max_retries: 3,
            retry_backoff_ms: 500,
            concurrency: 4,
            api_timeout_secs: 60,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DissectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DissectConfig")
            .field("min_image_size", &self.min_image_size)
            .field("min_image_dimension", &self.min_image_dimension)
            .field("screenshots", &self.screenshots)
            .field("screenshot_max_pixels", &self.screenshot_max_pixels)
            .field("pages", &self.pages)
            .field("pages_per_chunk", &self.pages_per_chunk)
            .field("describe_images", &self.describe_images)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl DissectConfig {
    /// Create a new builder for `DissectConfig`.
    pub fn builder() -> DissectConfigBuilder {
        DissectConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DissectConfig`].
#[derive(Debug)]
pub struct DissectConfigBuilder {
    config: DissectConfig,
}

impl DissectConfigBuilder {
    pub fn min_image_size(mut self, px: u32) -> Self {
        self.config.min_image_size = px;
        self
    }

    pub fn min_image_dimension(mut self, px: u32) -> Self {
        self.config.min_image_dimension = px;
        self
    }

    pub fn screenshots(mut self, v: bool) -> Self {
        self.config.screenshots = v;
        self
    }

    pub fn screenshot_max_pixels(mut self, px: u32) -> Self {
        self.config.screenshot_max_pixels = px.max(100);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn pages_per_chunk(mut self, n: usize) -> Self {
        self.config.pages_per_chunk = n.max(1);
        self
    }

    pub fn text_preview_chars(mut self, n: usize) -> Self {
        self.config.text_preview_chars = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn describe_images(mut self, v: bool) -> Self {
        self.config.describe_images = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DissectConfig, DissectError> {
        let c = &self.config;
        if c.min_image_size == 0 {
            return Err(DissectError::InvalidConfig(
                "Minimum image size must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(DissectError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(DissectError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = DissectConfig::default();
        assert_eq!(c.min_image_size, 256);
        assert_eq!(c.min_image_dimension, 10);
        assert_eq!(c.pages_per_chunk, 25);
        assert_eq!(c.text_preview_chars, 2000);
        assert!(c.screenshots);
        assert!(!c.describe_images);
        assert_eq!(c.pages, PageSelection::All);
    }

    #[test]
    fn builder_clamps() {
        let c = DissectConfig::builder()
            .screenshot_max_pixels(5)
            .pages_per_chunk(0)
            .concurrency(0)
            .temperature(9.0)
            .build()
            .expect("valid after clamping");
        assert_eq!(c.screenshot_max_pixels, 100);
        assert_eq!(c.pages_per_chunk, 1);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_min_size_rejected() {
        let err = DissectConfig::builder().min_image_size(0).build().unwrap_err();
        assert!(matches!(err, DissectError::InvalidConfig(_)));
    }

    #[test]
    fn debug_hides_provider() {
        let s = format!("{:?}", DissectConfig::default());
        assert!(s.contains("min_image_size: 256"));
        assert!(s.contains("provider: None"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(4), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }
}
