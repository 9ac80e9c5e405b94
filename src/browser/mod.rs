//! Browser-side plumbing: bounded polling, element location with fallback
//! candidates, and the anti-bot challenge gate.

pub mod challenge;
pub mod locate;
pub mod poll;

pub use challenge::{current_address, is_challenge_address, wait_clear};
pub use locate::{locate, Locator};
pub use poll::poll_until;
