pub mod action;
pub mod difficulty;
pub mod memory;
pub mod stat;
pub mod system_type;

pub use action::{ActionContext, AgentAction};
pub use difficulty::Difficulty;
pub use memory::{estimate_tokens, AgentMemory, ChatRole, MemoryMessage};
pub use stat::{Stat, StatBlock};
pub use system_type::{DeathSemantics, SystemType};
