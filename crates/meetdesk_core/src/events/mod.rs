//! In-process change notification.
//!
//! # Responsibility
//! - Fan out one typed event per committed mutation to every subscriber.
//!
//! # Invariants
//! - Events are emitted only after the backing-store write commits.
//! - Delivery is synchronous and in subscription order; nothing crosses the
//!   process boundary.

pub mod bus;
