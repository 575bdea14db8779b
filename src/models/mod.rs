//! Request and Response models for the member protocol
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies exchanged
//! between cluster members.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::DispatchRequest;
pub use responses::{
    ContainsResponse, HealthResponse, InvokeResponse, NamespaceStats, StatsResponse,
};
