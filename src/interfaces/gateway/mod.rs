pub mod client;
pub mod transport;
pub mod wire;
