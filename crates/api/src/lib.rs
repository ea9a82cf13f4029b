//! HTTP API: router, request DTOs and error mapping.

pub mod app;
