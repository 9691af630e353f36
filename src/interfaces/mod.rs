pub mod csv;
pub mod gateway;
pub mod orders;
