use std::fmt;
use std::sync::OnceLock;

use pixelmint_config::{PackageConfig, PaymentsConfig};
use pixelmint_core::UserId;
use regex::Regex;
use rust_decimal::Decimal;

/// Purchasable token packages with their crypto pricing
#[derive(Debug, Clone)]
pub struct PackageCatalog {
    packages: Vec<PackageConfig>,
    asset: String,
    fiat_rate: Decimal,
}

impl PackageCatalog {
    /// Build the catalogue from the `[payments]` section
    pub fn from_config(config: &PaymentsConfig) -> Self {
        Self {
            packages: config.packages.clone(),
            asset: config.asset.clone(),
            fiat_rate: config.fiat_rate,
        }
    }

    /// Packages in display order
    pub fn packages(&self) -> &[PackageConfig] {
        &self.packages
    }

    /// Look up a package by code
    pub fn get(&self, code: &str) -> Option<&PackageConfig> {
        self.packages.iter().find(|p| p.code == code)
    }

    /// Asset invoices are issued in
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Package price converted to the asset, rounded to cents
    pub fn crypto_price(&self, package: &PackageConfig) -> Decimal {
        if self.fiat_rate.is_zero() {
            return package.price;
        }
        (package.price / self.fiat_rate).round_dp(2)
    }
}

/// Data attached to an invoice at creation
///
/// Encoded as `user:<id>|tokens:<n>|pkg:<code>`. Only the `tokens` marker
/// is needed to credit an invoice that has no local record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayload {
    /// Buyer
    pub user_id: UserId,
    /// Tokens to credit
    pub tokens: u64,
    /// Package code
    pub package: String,
}

impl InvoicePayload {
    /// Extract the `tokens:<n>` marker from a raw payload
    pub fn tokens_from(raw: &str) -> Option<u64> {
        fn re() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new(r"tokens:(\d+)").expect("must be valid regex"))
        }

        re().captures(raw)?.get(1)?.as_str().parse().ok()
    }
}

impl fmt::Display for InvoicePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}|tokens:{}|pkg:{}", self.user_id, self.tokens, self.package)
    }
}
