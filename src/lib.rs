pub mod cli;
pub mod config;
pub mod error;
pub mod mixer;
pub mod vault;
pub mod workflow;

pub use config::ToolsConfig;
pub use error::{Result, ToolsError};
pub use mixer::{blend, BlendMode, BlendOutcome, BlendRequest, PromptMixer};
pub use vault::{Frame, ImageVault, SaveMode, SaveReport};
pub use workflow::{WorkflowChannels, WorkflowRecord};
