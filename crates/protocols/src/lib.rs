//! # `staker-protocols`
//!
//! Static knowledge about the staking protocols the bot can deposit into.
//!
//! A [`ProtocolDescriptor`](descriptor::ProtocolDescriptor) records *how* to talk to a protocol:
//! its contract, the shape of its deposit call, how to read back the staked balance and whether
//! it must be checked for availability first. The [`ProtocolRegistry`](registry::ProtocolRegistry)
//! is the fixed table of known descriptors. A [`ContractBinding`](binding::ContractBinding) ties a
//! descriptor to a live chain connection.
//!
//! Callers never branch on a protocol's identity: all protocol-specific behavior is carried by
//! the capability enums in [`shapes`].

pub mod abi;
pub mod binding;
pub mod descriptor;
pub mod errors;
pub mod id;
pub mod registry;
pub mod shapes;
