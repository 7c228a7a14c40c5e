/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Live-scoring session lifecycle.
pub mod live_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Subscription tickets and SSE connection handling.
pub mod sse_service;
