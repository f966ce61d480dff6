use std::collections::HashSet;
use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_generation()?;
        self.validate_payments()?;
        Ok(())
    }

    fn validate_generation(&self) -> anyhow::Result<()> {
        let generation = &self.generation;

        if generation.api_key.expose_secret().trim().is_empty() {
            anyhow::bail!("generation.api_key must not be empty");
        }

        if generation.model.trim().is_empty() {
            anyhow::bail!("generation.model must not be empty");
        }

        if generation.timeout_secs == 0 {
            anyhow::bail!("generation.timeout_secs must be greater than 0");
        }

        if self.ledger.cost_per_prompt == 0 || self.ledger.cost_per_session == 0 {
            tracing::warn!("a generation cost of 0 makes that generation kind free");
        }

        Ok(())
    }

    fn validate_payments(&self) -> anyhow::Result<()> {
        let payments = &self.payments;

        if payments.token.expose_secret().trim().is_empty() {
            anyhow::bail!("payments.token must not be empty");
        }

        if payments.timeout_secs == 0 {
            anyhow::bail!("payments.timeout_secs must be greater than 0");
        }

        if payments.fiat_rate <= rust_decimal::Decimal::ZERO {
            anyhow::bail!("payments.fiat_rate must be positive");
        }

        let mut codes = HashSet::new();
        for package in &payments.packages {
            if !codes.insert(package.code.as_str()) {
                anyhow::bail!("duplicate package code '{}'", package.code);
            }
            if package.code.contains(['|', ':']) {
                anyhow::bail!("package code '{}' must not contain '|' or ':'", package.code);
            }
            if package.tokens == 0 {
                anyhow::bail!("package '{}' must credit at least one token", package.code);
            }
            if package.price <= rust_decimal::Decimal::ZERO {
                anyhow::bail!("package '{}' must have a positive price", package.code);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal::Decimal;

    use crate::{Config, CryptoPayNetwork, LogFormat, StorageConfig};

    const MINIMAL: &str = r#"
[generation]
api_key = "AIza-test"

[payments]
token = "123:abc"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.ledger.starting_tokens, 10);
        assert_eq!(config.ledger.cost_per_prompt, 1);
        assert_eq!(config.ledger.cost_per_session, 5);
        assert_eq!(config.generation.model, "gemini-2.5-flash-image-preview");
        assert_eq!(config.generation.timeout_secs, 120);
        assert!(config.generation.fallback_model().is_none());
        assert_eq!(config.payments.network, CryptoPayNetwork::Testnet);
        assert_eq!(config.payments.asset, "USDT");
        assert_eq!(config.payments.timeout_secs, 30);
        assert_eq!(config.payments.fiat_rate, Decimal::from(90));
        assert_eq!(config.payments.packages.len(), 5);
        assert_eq!(config.telemetry.format, LogFormat::Pretty);
        assert!(matches!(config.storage, StorageConfig::Memory));
    }

    #[test]
    fn testnet_url_is_default_and_override_wins() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.payments.api_base_url().as_str(), "https://testnet-pay.crypt.bot/api/");

        let raw = format!("{MINIMAL}base_url = \"http://127.0.0.1:9000/api/\"\n");
        let config = Config::parse(&raw).unwrap();
        assert_eq!(config.payments.api_base_url().as_str(), "http://127.0.0.1:9000/api/");
    }

    #[test]
    fn blank_fallback_model_is_unset() {
        let raw = MINIMAL.replace("api_key = \"AIza-test\"", "api_key = \"AIza-test\"\nfallback_model = \"  \"");
        let config = Config::parse(&raw).unwrap();
        assert!(config.generation.fallback_model().is_none());
    }

    #[test]
    fn redis_storage_is_parsed() {
        let raw = format!("{MINIMAL}\n[storage]\ntype = \"redis\"\nurl = \"redis://localhost:6379\"\n");
        let config = Config::parse(&raw).unwrap();

        let StorageConfig::Redis(redis) = config.storage else {
            panic!("expected redis storage");
        };
        assert_eq!(redis.url.as_str(), "redis://localhost:6379");
    }

    #[test]
    fn duplicate_package_codes_are_rejected() {
        let raw = format!(
            "{MINIMAL}\n[[payments.packages]]\ncode = \"a\"\ntitle = \"A\"\nimages = 1\ntokens = 5\nprice = 99\n\n\
             [[payments.packages]]\ncode = \"a\"\ntitle = \"B\"\nimages = 2\ntokens = 10\nprice = 199\n"
        );
        let err = Config::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("duplicate package code"));
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let raw = format!("{MINIMAL}fiat_rate = 0\n");
        let err = Config::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("fiat_rate"));
    }

    #[test]
    fn zero_payments_timeout_is_rejected() {
        let raw = format!("{MINIMAL}timeout_secs = 0\n");
        let err = Config::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("payments.timeout_secs"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = format!("{MINIMAL}\n[ledger]\nstarting_balance = 3\n");
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn load_expands_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[generation]\napi_key = \"{{{{ env.PM_TEST_API_KEY }}}}\"\n\n[payments]\ntoken = \"t\"\n"
        )
        .unwrap();

        temp_env::with_var("PM_TEST_API_KEY", Some("sk-loaded"), || {
            let config = Config::load(file.path()).unwrap();
            assert_eq!(secrecy::ExposeSecret::expose_secret(&config.generation.api_key), "sk-loaded");
        });
    }
}
