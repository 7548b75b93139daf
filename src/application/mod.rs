/// Application layer - Use cases, orchestration and DTOs
///
/// This layer runs the enrichment pipeline and coordinates with
/// infrastructure through ports.
pub mod dto;
pub mod factories;
pub mod identity_resolver;
pub mod orchestrator;
pub mod use_cases;
