//! Usage ledger and admission control.
//!
//! This crate provides:
//! - A FIFO of queued job ids with aggregate queued-work accounting
//! - Admission waiting (one executing job at a time, strict FIFO)
//! - RAII queue slots that release their entry on every exit path

pub mod ledger;

pub use ledger::{LedgerConfig, LedgerSnapshot, QueueSlot, UsageLedger};
