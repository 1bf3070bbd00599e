//! Integration test suite for the Trickle faucet engine.
//!
//! The suites under `tests/` drive a deployed engine and token ledger
//! through claim scenarios, randomized operation sequences and concurrent
//! requesters, checking the accounting invariants after every step.

pub mod helpers;
