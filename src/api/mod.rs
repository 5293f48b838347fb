pub mod client;
pub mod fetchers;
pub mod transport;
