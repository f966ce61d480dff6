//! Builds a parsed configuration pointed at mock upstreams

use std::path::Path;

use pixelmint_config::Config;

/// Builder for test configurations
pub struct ConfigBuilder {
    crypto_pay_url: String,
    gemini_url: String,
    fallback_model: Option<String>,
    output_dir: String,
    extra: String,
}

impl ConfigBuilder {
    pub fn new(crypto_pay_url: &str, gemini_url: &str, output_dir: &Path) -> Self {
        Self {
            crypto_pay_url: crypto_pay_url.to_owned(),
            gemini_url: gemini_url.to_owned(),
            fallback_model: None,
            output_dir: output_dir.display().to_string(),
            extra: String::new(),
        }
    }

    /// Configure a fallback model
    pub fn with_fallback_model(mut self, model: &str) -> Self {
        self.fallback_model = Some(model.to_owned());
        self
    }

    /// Append raw TOML (e.g. a `[ledger]` section)
    pub fn with_toml(mut self, toml: &str) -> Self {
        self.extra.push_str(toml);
        self.extra.push('\n');
        self
    }

    pub fn build(self) -> Config {
        let fallback = self
            .fallback_model
            .map(|m| format!("fallback_model = \"{m}\"\n"))
            .unwrap_or_default();

        let raw = format!(
            r#"
[generation]
api_key = "AIza-test"
base_url = "{gemini}/v1beta"
model = "model-a"
{fallback}
[payments]
token = "123:test"
base_url = "{crypto_pay}/api/"
fiat_rate = "90"

[images]
output_dir = "{output_dir}"

{extra}
"#,
            gemini = self.gemini_url,
            crypto_pay = self.crypto_pay_url,
            output_dir = self.output_dir,
            extra = self.extra,
        );

        Config::parse(&raw).expect("valid test config")
    }
}
