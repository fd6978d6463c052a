//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    AuditConfig, BotConfig, LogOutput, LoggingConfig, RetentionConfig, RikkaConfig, StorageConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &RikkaConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_logging_config(&config.logging)?;
    validate_audit_config(&config.audit)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.prefix"));
    }

    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "Command prefix cannot contain whitespace",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter targets cannot be empty"));
    }

    // A missing path falls back to rikka.log in the working directory.
    if logging.output == LogOutput::File
        && let Some(path) = &logging.file_path
        && path.file_name().is_none()
    {
        return Err(ConfigError::validation(format!(
            "Log file path has no file name: {}",
            path.display()
        )));
    }

    Ok(())
}

fn validate_audit_config(audit: &AuditConfig) -> ConfigResult<()> {
    if audit.namespace.is_empty() {
        return Err(ConfigError::missing_field("audit.namespace"));
    }

    for component in &audit.namespace {
        if component.is_empty() {
            return Err(ConfigError::validation(
                "Namespace components cannot be empty",
            ));
        }
        // Leading NUL is reserved for directory metadata.
        if component.starts_with('\0') {
            return Err(ConfigError::validation(format!(
                "Namespace component {component:?} cannot start with NUL"
            )));
        }
    }

    validate_bucket(&audit.bucket)?;
    validate_retention_config(&audit.retention)?;

    Ok(())
}

/// Validates a blob bucket name: 3 to 63 characters of lowercase letters,
/// digits, `-` and `.`, starting and ending with a letter or digit.
pub fn validate_bucket(name: &str) -> ConfigResult<()> {
    if !(3..=63).contains(&name.len()) {
        return Err(ConfigError::invalid_bucket(
            name,
            "must be between 3 and 63 characters long",
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return Err(ConfigError::invalid_bucket(
            name,
            format!("invalid character {c:?}"),
        ));
    }

    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
        return Err(ConfigError::invalid_bucket(
            name,
            "must start and end with a letter or digit",
        ));
    }

    Ok(())
}

fn validate_storage_config(storage: &StorageConfig) -> ConfigResult<()> {
    if storage.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("storage.path"));
    }
    Ok(())
}

fn validate_retention_config(retention: &RetentionConfig) -> ConfigResult<()> {
    if retention.max_age_days == Some(0) {
        return Err(ConfigError::validation(
            "Retention max_age_days must be greater than 0",
        ));
    }

    if retention.prune_interval_secs == 0 {
        return Err(ConfigError::validation(
            "Prune interval must be greater than 0",
        ));
    }

    Ok(())
}
