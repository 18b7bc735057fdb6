//! Protocol Constants
//!
//! All magic numbers and default configuration values for xPeg.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (higher instant loan fee)
//! - Default (no feature) - Testnet values
//!
//! ```toml
//! # For mainnet deployment:
//! xpeg-common = { path = "...", features = ["mainnet"] }
//! ```

/// Pegged Token Metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "xPegBTC";
    /// Token symbol
    pub const SYMBOL: &str = "xBTC";
    /// Decimal places (same as Bitcoin satoshis)
    pub const DECIMALS: u8 = 8;
    /// One unit with decimals (1 xBTC = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
}

/// Pool Share Token Metadata
pub mod shares {
    /// Share token name
    pub const NAME: &str = "xPeg Instant Pool Share";
    /// Share token symbol
    pub const SYMBOL: &str = "ixBTC";
    /// Shares use the same precision as the underlying
    pub const DECIMALS: u8 = super::token::DECIMALS;
}

/// Mint-Rate Limiter Defaults
pub mod limiter {
    /// Mint ceiling per epoch at instantiation (1 xBTC)
    pub const INITIAL_MAX_MINT_LIMIT: u64 = super::token::ONE;

    /// Epoch length in blocks at instantiation
    pub const INITIAL_EPOCH_LENGTH: u64 = 2_000;

    /// Epoch index before any mint has been observed
    pub const GENESIS_EPOCH: u64 = 0;
}

/// Fee Configuration (in basis points, 100 = 1%)
pub mod fees {
    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Highest allowed instant loan fee (100%)
    pub const MAX_INSTANT_FEE_BPS: u64 = BPS_DENOMINATOR;

    /// Loan fee at pool instantiation
    #[cfg(feature = "mainnet")]
    pub const DEFAULT_INSTANT_FEE_BPS: u64 = 15;
    #[cfg(not(feature = "mainnet"))]
    pub const DEFAULT_INSTANT_FEE_BPS: u64 = 10;
}

/// Domain tags for deterministic identity derivation
pub mod domains {
    /// Asset identifier of a pegged token instance
    pub const TOKEN_ASSET: &[u8] = b"xpeg/token/asset";
    /// Custody address of an instant pool instance
    pub const POOL_CUSTODY: &[u8] = b"xpeg/instant-pool/custody";
}
