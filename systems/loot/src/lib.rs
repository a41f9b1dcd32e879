#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted loot distribution for the encounter director.
//!
//! [`LootTable`] resolves a single weighted pick. [`LootManager`] layers the
//! session policy on top: an overall drop-chance gate, a random drop count,
//! positional scatter, and the rule that a unique category (a named weapon)
//! is granted at most once per session. [`LootProgression`] decides which
//! table becomes the default as waves are completed.

mod ledger;
mod manager;
mod progression;
mod table;

pub use ledger::{SessionInventory, UniqueDropLedger};
pub use manager::{LootConfig, LootManager};
pub use progression::{LootMilestone, LootProgression};
pub use table::{LootEntry, LootTable};
