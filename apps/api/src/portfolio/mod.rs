// Portfolio generation: prompt → backend fallback → tolerant assembly → artifact.
// All backend calls go through llm_client, never direct HTTP calls here.

pub mod assembler;
pub mod generator;
pub mod handlers;
pub mod prompts;
