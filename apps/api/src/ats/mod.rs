pub mod detect;
pub mod extraction;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod scoring;
