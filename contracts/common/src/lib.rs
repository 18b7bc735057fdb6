//! xPeg Common Library
//!
//! Shared types, constants, and state machines for the xPeg contracts:
//! the pegged-asset Issuance Ledger and the Instant Pool layered over it.
//!
//! ## Building Blocks
//!
//! - **Mint-Rate Limiter**: Per-epoch ceiling on newly issued supply
//! - **Balance Ledger**: Account balances with an exact total-supply counter
//! - **Access Control**: Ownership plus minter/burner role registry
//! - **Call Lock**: Per-instance serialization with re-entry rejection
//! - **Underlying Asset**: Capability trait the pool uses to move its reserve
//! - **Events**: Typed protocol events for off-chain indexing
//!
//! Every mutating entry point validates first and mutates last, so a
//! failed operation never leaves partially updated state behind.

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod validation;
pub mod access_control;
pub mod rate_limiter;
pub mod balances;
pub mod guard;
pub mod asset;


// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use access_control::*;
pub use rate_limiter::*;
pub use balances::*;
pub use guard::*;
pub use asset::*;
