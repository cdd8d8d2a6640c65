//! Message bus sink.
//!
//! Publishes each event as one keyed message. The message key carries the
//! same record identity the registry uses for dedup, so both sinks partition
//! and deduplicate on equivalent semantics.

pub mod producer;
pub mod sink;

pub use producer::{client_config, KafkaProducer, MessageProducer};
pub use sink::{MessageBusSink, MessageKey};
