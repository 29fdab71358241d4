//! Port traits for everything outside the engine: LLM transport, clock,
//! and the persistence gateway.

mod error;
mod external;
mod repos;

pub use error::{LlmError, RepoError};
pub use external::{
    ChatMessage, ClockPort, FinishReason, LlmPort, LlmRequest, LlmResponse, MessageRole,
    SystemClock, TextStream, TokenUsage,
};
pub use repos::{
    ActionLogRepo, AgentMemoryRepo, ConsolidationRepo, ConsolidationSnapshot, GameStateRepo,
    NodeStatusUpdate, PersistenceGateway, PlanningSessionRecord, PlotGraphRepo,
};
