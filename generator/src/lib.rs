pub mod assist;
pub mod completion;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod tasks;

pub use completion::{CompletionClient, OpenAiClient, RetryingClient};
pub use pipeline::{GenerationResult, GenerationState, Generator};
pub use tasks::{TaskRegistry, TaskView};
