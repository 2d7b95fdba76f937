//! VLM interaction: describe unique regular images.
//!
//! Only images the classifier kept as unique and regular are sent. Each
//! description is later shown on every member of the image's duplicate
//! group, so a logo repeated on forty pages costs one call.
//!
//! ## Retry Strategy
//!
//! Failed calls are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with 500 ms base and 3 retries the
//! waits are 500 ms → 1 s → 2 s. Each attempt is also bounded by
//! `api_timeout_secs`. An image that still fails becomes a
//! [`PageError::DescribeFailed`]; the run carries on.

use crate::classify::Classification;
use crate::config::DissectConfig;
use crate::error::{DissectError, PageError};
use crate::output::{ImageDescription, ImageRecord};
use crate::pipeline::{encode, postprocess};
use crate::prompts::{describe_request, DEFAULT_DESCRIBE_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Images worth describing: unique, extracted and not small.
pub fn description_targets(classification: &Classification) -> Vec<ImageRecord> {
    classification
        .duplicates
        .unique
        .iter()
        .filter(|img| !classification.is_small(img))
        .cloned()
        .collect()
}

/// Describe `targets` with bounded concurrency.
///
/// Results come back sorted by `(page, index)`; failures are returned
/// alongside instead of aborting.
pub async fn describe_images(
    provider: &Arc<dyn LLMProvider>,
    targets: &[ImageRecord],
    images_dir: &Path,
    config: &DissectConfig,
) -> (Vec<ImageDescription>, Vec<PageError>) {
    let total = targets.len();
    let done = Arc::new(AtomicUsize::new(0));
    info!("Describing {} images (concurrency {})", total, config.concurrency);

    let results: Vec<Result<ImageDescription, PageError>> = stream::iter(targets.iter().map(|img| {
        let provider = Arc::clone(provider);
        let done = Arc::clone(&done);
        async move {
            let result = describe_image(&provider, img, images_dir, config).await;
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_described(finished, total);
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    let mut descriptions = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(d) => descriptions.push(d),
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
            }
        }
    }
    descriptions.sort_by_key(|d| (d.page, d.index));
    errors.sort_by_key(PageError::page);
    (descriptions, errors)
}

/// Describe one image, retrying failed calls.
pub async fn describe_image(
    provider: &Arc<dyn LLMProvider>,
    image: &ImageRecord,
    images_dir: &Path,
    config: &DissectConfig,
) -> Result<ImageDescription, PageError> {
    let start = Instant::now();
    let filename = image.filename.clone().unwrap_or_default();
    let fail = |retries: u32, detail: String| PageError::DescribeFailed {
        page: image.page,
        filename: filename.clone(),
        retries,
        detail,
    };

    let bytes = tokio::fs::read(images_dir.join(&filename))
        .await
        .map_err(|e| fail(0, format!("cannot read image: {e}")))?;

    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_DESCRIBE_PROMPT);
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(
            describe_request(image.page, &filename),
            vec![encode::to_image_data(&bytes)],
        ),
    ];
    let options = build_options(config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err = String::from("Unknown error");
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                filename, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    filename, response.prompt_tokens, response.completion_tokens, duration
                );
                return Ok(ImageDescription {
                    page: image.page,
                    index: image.index,
                    filename,
                    content_hash: image.content_hash.clone(),
                    text: postprocess::clean_description(&response.content),
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => last_err = e.to_string(),
            Err(_) => last_err = format!("timed out after {}s", config.api_timeout_secs),
        }
        warn!("{}: attempt {} failed: {}", filename, attempt + 1, last_err);
    }

    Err(fail(config.max_retries, last_err))
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

fn build_options(config: &DissectConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DissectError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DissectError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most to least specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` with `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. [`ProviderFactory::from_env`] auto-detection
pub fn resolve_provider(config: &DissectConfig) -> Result<Arc<dyn LLMProvider>, DissectError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DissectError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&DissectConfig::default());
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(512));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(u64::MAX, 5), u64::MAX);
    }

    #[test]
    fn only_unique_regular_images_are_targets() {
        let photo = ImageRecord::new("photo.png", 1, 0, 800, 600, 90_000, "png")
            .with_content_hash("photo");
        let photo_again = ImageRecord::new("photo2.png", 2, 0, 800, 600, 90_000, "png")
            .with_content_hash("photo");
        let icon = ImageRecord::new("icon.png", 2, 1, 16, 16, 300, "png").with_content_hash("icon");
        let broken = ImageRecord::failed(3, 0, "decode");

        let c = classify(vec![photo.clone(), photo_again, icon, broken], 256);
        let targets = description_targets(&c);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].key(), photo.key());
    }
}
