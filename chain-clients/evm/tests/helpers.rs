//! Shared test constants for EVM client tests

#![allow(dead_code)]

pub const DUMMY_CONTRACT_ADDR_EVM: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const DUMMY_FARMER_ADDR_EVM: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const DUMMY_TX_HASH: &str =
    "0x8a3b2f0c6d3e1f4b5a697887766554433221100ffeeddccbbaa9988776655443";
