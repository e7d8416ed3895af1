//! Boundary layer: the operations a transport exposes, with DTOs and error
//! mapping. Routing, request parsing and rate limiting stay outside.

pub mod dto;
pub mod errors;
pub mod service;

pub use errors::ApiError;
pub use service::WalletService;
