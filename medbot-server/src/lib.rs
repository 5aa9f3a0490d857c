pub mod assistant;
pub mod http;
pub mod router;
pub mod subsystems;

pub use assistant::{Assistant, AssistantStats};
pub use subsystems::respond::{AnswerSource, Reply};
pub use subsystems::retrieve::{Match, Retrieval};
