pub mod money;
pub mod payment;
pub mod ports;
pub mod wallet;
