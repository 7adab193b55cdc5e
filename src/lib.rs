//! Cached access to an Airtable-backed CRM.
//!
//! [`cache::CollectionCache`] is the core: a per-collection cache with a
//! validity window, one in-flight fetch per filter, full cursor draining
//! and write-through patching. [`crm`] builds the agent, contact and
//! appointment views on top of it.

pub mod airtable;
pub mod cache;
pub mod config;
pub mod crm;
pub mod error;
pub mod filter;
pub mod logging;
pub mod transport;
