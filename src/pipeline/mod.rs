mod config;
pub mod prompts;
pub mod session;
pub mod simplifier;
mod trace;

pub use config::{init_default_config, Overrides, Settings};
pub use prompts::{InstructionTemplate, PromptSet};
pub use session::{Services, Session, SimplifyError};
pub use simplifier::{build_request, SimplificationRequest, Simplifier};
pub use trace::TraceWriter;
