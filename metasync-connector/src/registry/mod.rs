//! Registry gateway sink.
//!
//! Publishes events over HTTP to a schema-governed registry gateway,
//! provisioning schema groups and schemas on first use.

pub mod client;
pub mod provisioner;
pub mod sink;

pub use client::RegistryClient;
pub use provisioner::SchemaProvisioner;
pub use sink::RegistryGatewaySink;
