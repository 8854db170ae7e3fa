use anyhow::{Context, Result};
use inquire::{Confirm, CustomType, Password, Select, Text};
use std::path::Path;
use weather_core::{Config, MailConfig, ProviderId};

/// Prompt for every setting and write the config file.
///
/// Existing values are offered as defaults.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let mut cfg = Config::load(config_path).unwrap_or_default();

    let providers: Vec<&str> = ProviderId::all().iter().map(|p| p.as_str()).collect();
    let start = providers.iter().position(|p| *p == cfg.provider).unwrap_or(0);
    let provider = Select::new("Weather provider:", providers)
        .with_starting_cursor(start)
        .prompt()
        .context("Provider selection cancelled")?;
    cfg.set_provider(ProviderId::try_from(provider)?);

    let api_key = Password::new(&format!("API key for {provider} (leave empty to keep current):"))
        .without_confirmation()
        .prompt()
        .context("API key prompt cancelled")?;
    if !api_key.trim().is_empty() {
        cfg.api_key = api_key.trim().to_string();
    }

    let cities = Text::new("Cities (comma separated):")
        .with_default(&cfg.cities.join(", "))
        .prompt()
        .context("City prompt cancelled")?;
    cfg.cities = cities
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    cfg.alert_threshold = CustomType::<f64>::new("Alert threshold (°C):")
        .with_default(cfg.alert_threshold)
        .with_error_message("Please enter a number")
        .prompt()
        .context("Threshold prompt cancelled")?;

    cfg.email_alert_enabled = Confirm::new("Send alert emails?")
        .with_default(cfg.email_alert_enabled)
        .prompt()
        .context("Email prompt cancelled")?;

    if cfg.email_alert_enabled {
        cfg.email_recipient = Text::new("Alert recipient:")
            .with_default(&cfg.email_recipient)
            .prompt()
            .context("Recipient prompt cancelled")?;

        let current = cfg.mail.clone().unwrap_or(MailConfig {
            endpoint: String::new(),
            api_token: String::new(),
        });
        let endpoint = Text::new("Mail relay endpoint:")
            .with_default(&current.endpoint)
            .prompt()
            .context("Mail endpoint prompt cancelled")?;
        let api_token = Password::new("Mail relay token (leave empty to keep current):")
            .without_confirmation()
            .prompt()
            .context("Mail token prompt cancelled")?;

        cfg.mail = Some(MailConfig {
            endpoint,
            api_token: if api_token.trim().is_empty() { current.api_token } else { api_token },
        });
    }

    cfg.validate()?;
    let path = cfg.save(config_path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}
