//! Config command handlers

use anyhow::{bail, Context, Result};

use marks_core::{Color, Config};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "toast_ttl_ms": config.toast_ttl_ms,
                    "toast_limit": config.toast_limit,
                    "default_background": config.default_background,
                    "default_text": config.default_text,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:           {}", config.data_dir.display());
            println!("  toast_ttl_ms:       {}", config.toast_ttl_ms);
            println!("  toast_limit:        {}", config.toast_limit);
            println!("  default_background: {}", config.default_background);
            println!("  default_text:       {}", config.default_text);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    config.save().context("Failed to save configuration")?;
    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "toast_ttl_ms" => {
            config.toast_ttl_ms = value
                .parse()
                .context("Invalid value for toast_ttl_ms. Use a number of milliseconds.")?;
        }
        "toast_limit" => {
            config.toast_limit = value
                .parse()
                .context("Invalid value for toast_limit. Use a whole number.")?;
        }
        "default_background" => {
            config.default_background =
                Color::parse(value).context("Invalid value for default_background")?;
        }
        "default_text" => {
            config.default_text = Color::parse(value).context("Invalid value for default_text")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, toast_ttl_ms, toast_limit, default_background, default_text",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "toast_limit", "5").unwrap();
        apply(&mut config, "default_background", "#ABCDEF").unwrap();
        apply(&mut config, "data_dir", "/tmp/marks").unwrap();

        assert_eq!(config.toast_limit, 5);
        assert_eq!(config.default_background.as_str(), "#abcdef");
        assert_eq!(config.data_dir, std::path::PathBuf::from("/tmp/marks"));
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "toast_ttl_ms", "soon").is_err());
        assert!(apply(&mut config, "default_text", "black").is_err());
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
        assert_eq!(config.toast_ttl_ms, 3000);
    }
}
