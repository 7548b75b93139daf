/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod codecs;
pub mod console;
pub mod filesystem;
pub mod network;
pub mod sources;
