use serde::Deserialize;

/// Token ledger pricing and onboarding
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Balance granted to an account on first contact
    #[serde(default = "default_starting_tokens")]
    pub starting_tokens: u64,
    /// Cost of a free-form prompt generation
    #[serde(default = "default_cost_per_prompt")]
    pub cost_per_prompt: u64,
    /// Cost of a photosession generation
    #[serde(default = "default_cost_per_session")]
    pub cost_per_session: u64,
    /// Default hourly generation cap for new accounts (0 disables the cap)
    #[serde(default)]
    pub hourly_limit: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_tokens: default_starting_tokens(),
            cost_per_prompt: default_cost_per_prompt(),
            cost_per_session: default_cost_per_session(),
            hourly_limit: 0,
        }
    }
}

fn default_starting_tokens() -> u64 {
    10
}

fn default_cost_per_prompt() -> u64 {
    1
}

fn default_cost_per_session() -> u64 {
    5
}
