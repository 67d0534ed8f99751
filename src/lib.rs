// Library exports for pixara
// The binary and the integration tests both build on these modules

pub mod api;
pub mod config;
pub mod error;
pub mod interaction;
pub mod safety;
pub mod session;
pub mod state;
pub mod store;
pub mod views;

#[cfg(test)]
mod testing;
