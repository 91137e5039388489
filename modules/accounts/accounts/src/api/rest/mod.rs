//! Callable-protocol HTTP surface: `POST /registerUser`, `POST /unregisterUser`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
