//! Provider subsystem for hosted model inference backends.
//!
//! Each provider implements the [`Provider`] trait defined in [`traits`] and is
//! created through [`create_provider`] by its canonical string key. Only
//! OpenAI-compatible chat completion APIs are supported: `openai` targets the
//! public OpenAI API, `custom:<URL>` targets any compatible endpoint.

pub mod compatible;
pub mod traits;

pub use compatible::OpenAiCompatibleProvider;
pub use traits::{ChatMessage, Provider};

const MAX_API_ERROR_CHARS: usize = 200;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts tokens with prefixes like `sk-`, `ghp_`, `gho_`, `ghu_` and
/// `github_pat_`.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 5] = ["sk-", "ghp_", "gho_", "ghu_", "github_pat_"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

/// Resolve the API key from the explicit value, then the environment.
fn resolve_provider_credential(name: &str, credential_override: Option<&str>) -> Option<String> {
    if let Some(raw_override) = credential_override {
        let trimmed_override = raw_override.trim();
        if !trimmed_override.is_empty() {
            return Some(trimmed_override.to_owned());
        }
    }

    let provider_env_candidates: &[&str] = match name {
        "openai" => &["OPENAI_API_KEY"],
        _ => &[],
    };

    provider_env_candidates
        .iter()
        .chain(["PLANCHAT_API_KEY", "API_KEY"].iter())
        .find_map(|env_var| {
            std::env::var(env_var)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
}

/// Factory: create the provider named `name`.
///
/// `api_url` overrides the provider's base URL.
pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    api_url: Option<&str>,
) -> anyhow::Result<Box<dyn Provider>> {
    let key = resolve_provider_credential(name, api_key);
    let key = key.as_deref();
    let api_url = api_url.map(str::trim).filter(|url| !url.is_empty());

    if let Some(custom_url) = name.strip_prefix("custom:") {
        let url = api_url.unwrap_or(custom_url).trim();
        if reqwest::Url::parse(url).is_err() {
            anyhow::bail!("Invalid custom provider URL: {url}");
        }
        return Ok(Box::new(OpenAiCompatibleProvider::new("custom", url, key)?));
    }

    match name {
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "openai",
            api_url.unwrap_or(OPENAI_BASE_URL),
            key,
        )?)),
        _ => anyhow::bail!("Unknown provider: {name}. Use \"openai\" or \"custom:<URL>\"."),
    }
}

/// Information about a supported provider for display purposes.
pub struct ProviderInfo {
    /// Canonical name used in config (e.g. `"openai"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
}

/// Known providers, for `planchat status`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI",
        },
        ProviderInfo {
            name: "custom:<URL>",
            display_name: "Any OpenAI-compatible endpoint",
        },
    ]
}
