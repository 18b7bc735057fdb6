//! Protocol Events for xPeg
//!
//! Events are emitted by every successful mutating operation and can be
//! indexed off-chain for building UIs, analytics, and notifications.
//! Failed operations emit nothing.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetId, Role};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Token Events (0x01 - 0x1F)
    TokenMint = 0x01,
    TokenBurn = 0x02,
    TokenTransfer = 0x03,
    Approval = 0x04,

    // Governance Events (0x20 - 0x3F)
    RoleGranted = 0x20,
    RoleRevoked = 0x21,
    MaxMintLimitChanged = 0x22,
    EpochLengthChanged = 0x23,
    OwnershipTransferred = 0x24,

    // Pool Events (0x40 - 0x5F)
    LiquidityAdded = 0x40,
    LiquidityDonated = 0x41,
    LiquidityRemoved = 0x42,
    InstantLoan = 0x43,
    ReserveShortfall = 0x44,

    // Pool Configuration Events (0x60 - 0x7F)
    InstantRouterChanged = 0x60,
    InstantFeeChanged = 0x61,
    ReserveAssetChanged = 0x62,
}

/// Main event enum containing all possible protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum XPegEvent {
    // ============ Token Events ============

    /// Emitted when a minter issues new supply
    TokenMint {
        minter: Address,
        to: Address,
        amount: u64,
        new_total_supply: u64,
        remaining_epoch_limit: u64,
        block_height: u64,
    },

    /// Emitted when a burner destroys its own balance
    TokenBurn {
        burner: Address,
        amount: u64,
        new_total_supply: u64,
        block_height: u64,
    },

    /// Emitted on every balance movement between accounts
    TokenTransfer {
        from: Address,
        to: Address,
        amount: u64,
        block_height: u64,
    },

    /// Emitted when an allowance is set
    Approval {
        owner: Address,
        spender: Address,
        amount: u64,
        block_height: u64,
    },

    // ============ Governance Events ============

    RoleGranted {
        role: Role,
        account: Address,
        block_height: u64,
    },

    RoleRevoked {
        role: Role,
        account: Address,
        block_height: u64,
    },

    MaxMintLimitChanged {
        old_limit: u64,
        new_limit: u64,
        block_height: u64,
    },

    EpochLengthChanged {
        old_length: u64,
        new_length: u64,
        block_height: u64,
    },

    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
        block_height: u64,
    },

    // ============ Pool Events ============

    /// Emitted when underlying is deposited for shares
    LiquidityAdded {
        payer: Address,
        depositor: Address,
        amount: u64,
        shares_minted: u64,
        total_added_underlying: u64,
        block_height: u64,
    },

    /// Emitted when underlying is donated without minting shares
    LiquidityDonated {
        donor: Address,
        amount: u64,
        total_added_underlying: u64,
        block_height: u64,
    },

    /// Emitted when shares are redeemed for underlying
    LiquidityRemoved {
        owner: Address,
        redeemer: Address,
        shares_burned: u64,
        underlying_out: u64,
        total_added_underlying: u64,
        block_height: u64,
    },

    /// Emitted when the router draws a loan from the pool
    InstantLoan {
        borrower: Address,
        amount: u64,
        fee: u64,
        block_height: u64,
    },

    /// Emitted by a reserve audit that finds custody below attributed underlying
    ReserveShortfall {
        attributed: u64,
        available: u64,
        shortfall: u64,
        block_height: u64,
    },

    // ============ Pool Configuration Events ============

    InstantRouterChanged {
        old_router: Address,
        new_router: Address,
        block_height: u64,
    },

    InstantFeeChanged {
        old_fee_bps: u64,
        new_fee_bps: u64,
        block_height: u64,
    },

    ReserveAssetChanged {
        old_asset: AssetId,
        new_asset: AssetId,
        block_height: u64,
    },
}

impl XPegEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TokenMint { .. } => EventType::TokenMint,
            Self::TokenBurn { .. } => EventType::TokenBurn,
            Self::TokenTransfer { .. } => EventType::TokenTransfer,
            Self::Approval { .. } => EventType::Approval,
            Self::RoleGranted { .. } => EventType::RoleGranted,
            Self::RoleRevoked { .. } => EventType::RoleRevoked,
            Self::MaxMintLimitChanged { .. } => EventType::MaxMintLimitChanged,
            Self::EpochLengthChanged { .. } => EventType::EpochLengthChanged,
            Self::OwnershipTransferred { .. } => EventType::OwnershipTransferred,
            Self::LiquidityAdded { .. } => EventType::LiquidityAdded,
            Self::LiquidityDonated { .. } => EventType::LiquidityDonated,
            Self::LiquidityRemoved { .. } => EventType::LiquidityRemoved,
            Self::InstantLoan { .. } => EventType::InstantLoan,
            Self::ReserveShortfall { .. } => EventType::ReserveShortfall,
            Self::InstantRouterChanged { .. } => EventType::InstantRouterChanged,
            Self::InstantFeeChanged { .. } => EventType::InstantFeeChanged,
            Self::ReserveAssetChanged { .. } => EventType::ReserveAssetChanged,
        }
    }

    /// Get the block height when event occurred
    pub fn block_height(&self) -> u64 {
        match self {
            Self::TokenMint { block_height, .. }
            | Self::TokenBurn { block_height, .. }
            | Self::TokenTransfer { block_height, .. }
            | Self::Approval { block_height, .. }
            | Self::RoleGranted { block_height, .. }
            | Self::RoleRevoked { block_height, .. }
            | Self::MaxMintLimitChanged { block_height, .. }
            | Self::EpochLengthChanged { block_height, .. }
            | Self::OwnershipTransferred { block_height, .. }
            | Self::LiquidityAdded { block_height, .. }
            | Self::LiquidityDonated { block_height, .. }
            | Self::LiquidityRemoved { block_height, .. }
            | Self::InstantLoan { block_height, .. }
            | Self::ReserveShortfall { block_height, .. }
            | Self::InstantRouterChanged { block_height, .. }
            | Self::InstantFeeChanged { block_height, .. }
            | Self::ReserveAssetChanged { block_height, .. } => *block_height,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<XPegEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: XPegEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[XPegEvent] {
        &self.events
    }

    /// Take all events, leaving the log empty
    pub fn drain(&mut self) -> Vec<XPegEvent> {
        core::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&XPegEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Get the most recent event
    pub fn last(&self) -> Option<&XPegEvent> {
        self.events.last()
    }
}
