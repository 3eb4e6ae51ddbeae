//! On-chain reads
//!
//! Contract interfaces plus a Multicall3-backed client per chain.

pub mod abi;
mod client;

pub use client::{BatchReturns, CallBatch, ChainClient, ChainClients, Slot};
