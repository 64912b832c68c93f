use crate::config::types::{
    ApiConfig, Config, CrawlerConfig, LanguageEntry, StoreConfig, UserAgentConfig,
    LANG_PLACEHOLDER,
};
use crate::title::ArticleId;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_api_config(&config.api)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    validate_languages(&config.languages)?;
    validate_seeds(&config.crawler.seeds, &config.languages)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if !config.url_template.contains(LANG_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "url_template must contain '{}', got '{}'",
            LANG_PLACEHOLDER, config.url_template
        )));
    }

    let sample = config.endpoint("en");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_template: {}", e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "url_template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.calls_per_second < 1 {
        return Err(ConfigError::Validation(
            "calls_per_second must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the language table
fn validate_languages(languages: &[LanguageEntry]) -> Result<(), ConfigError> {
    if languages.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[language]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in languages {
        if entry.code.is_empty()
            || !entry
                .code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::InvalidLanguage(format!(
                "invalid language code '{}'",
                entry.code
            )));
        }

        if !seen.insert(entry.code.as_str()) {
            return Err(ConfigError::InvalidLanguage(format!(
                "duplicate language code '{}'",
                entry.code
            )));
        }

        if entry.see_also.trim().is_empty() {
            return Err(ConfigError::InvalidLanguage(format!(
                "language '{}' has an empty see-also label",
                entry.code
            )));
        }

        if entry.disambiguation.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::InvalidLanguage(format!(
                "language '{}' has an empty disambiguation marker",
                entry.code
            )));
        }
    }

    Ok(())
}

/// Validates seed identifiers against the language table
fn validate_seeds(seeds: &[String], languages: &[LanguageEntry]) -> Result<(), ConfigError> {
    for seed in seeds {
        let id = ArticleId::parse(seed)
            .map_err(|e| ConfigError::Validation(format!("Invalid seed '{}': {}", seed, e)))?;

        if !languages.iter().any(|l| l.code == id.lang()) {
            return Err(ConfigError::Validation(format!(
                "Seed '{}' uses untracked language '{}'",
                seed,
                id.lang()
            )));
        }
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
