//! Integration test crate for TrimDeck.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the core, media, player and timeline crates to verify
//! they work together.

#[cfg(test)]
mod playback;

#[cfg(test)]
mod timeline;
