//! Airtable REST implementation of [`Transport`](crate::transport::Transport).

pub mod api_types;
mod client;

pub use client::AirtableTransport;
