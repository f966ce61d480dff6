use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Crypto Pay integration and the token package catalogue
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentsConfig {
    /// Crypto Pay API token
    pub token: SecretString,
    /// Crypto Pay network
    #[serde(default)]
    pub network: CryptoPayNetwork,
    /// Base URL override (takes precedence over `network`)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Asset invoices are issued in
    #[serde(default = "default_asset")]
    pub asset: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fiat units per one unit of `asset`, used to price packages
    #[serde(default = "default_fiat_rate")]
    pub fiat_rate: Decimal,
    /// Purchasable token packages, in display order
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageConfig>,
}

impl PaymentsConfig {
    /// Effective API base URL
    pub fn api_base_url(&self) -> Url {
        self.base_url.clone().unwrap_or_else(|| self.network.base_url())
    }
}

/// Crypto Pay network
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CryptoPayNetwork {
    /// Production network
    Mainnet,
    /// Test network
    #[default]
    Testnet,
}

impl CryptoPayNetwork {
    /// Public API endpoint of the network
    pub fn base_url(self) -> Url {
        let raw = match self {
            Self::Mainnet => "https://pay.crypt.bot/api/",
            Self::Testnet => "https://testnet-pay.crypt.bot/api/",
        };
        Url::parse(raw).expect("valid Crypto Pay URL")
    }
}

/// A purchasable token package
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Stable code used in invoice payloads
    pub code: String,
    /// Display title
    pub title: String,
    /// Number of images the package is marketed as
    pub images: u32,
    /// Tokens credited once paid
    pub tokens: u64,
    /// Price in fiat units
    pub price: Decimal,
    /// Whether the package is promoted
    #[serde(default)]
    pub highlight: bool,
    /// Extra perk shown next to the package
    #[serde(default)]
    pub bonus: Option<String>,
}

fn default_asset() -> String {
    "USDT".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fiat_rate() -> Decimal {
    Decimal::from(90)
}

fn package(code: &str, title: &str, images: u32, tokens: u64, price: i64) -> PackageConfig {
    PackageConfig {
        code: code.to_owned(),
        title: title.to_owned(),
        images,
        tokens,
        price: Decimal::from(price),
        highlight: false,
        bonus: None,
    }
}

fn default_packages() -> Vec<PackageConfig> {
    vec![
        package("dose", "Test drive", 1, 5, 99),
        package("sample", "Mini set", 3, 15, 290),
        PackageConfig {
            highlight: true,
            ..package("ego", "Bestseller", 15, 75, 890)
        },
        PackageConfig {
            bonus: Some("Priority generation".to_owned()),
            ..package("influencer", "Creator", 50, 250, 1990)
        },
        PackageConfig {
            bonus: Some("Prompt pack and a personal consultation".to_owned()),
            ..package("godmode", "Content studio", 150, 750, 4990)
        },
    ]
}
