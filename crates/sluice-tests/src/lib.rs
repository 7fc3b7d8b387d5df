//! Integration test suite for the Sluice ledger.
//!
//! Scenario tests drive a [`Ledger`](sluice_ledger::Ledger) through a
//! hand-advanced height source and compare against worked reference values;
//! property tests check the supply, lock and stake accounting invariants
//! under random operation sequences.

pub mod helpers;
