//! Player sessions and arena assignment

pub mod service;

pub use service::SessionService;
