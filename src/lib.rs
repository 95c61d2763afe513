//! research-rs: multi-agent research orchestration.
//!
//! A research question is decomposed into sub-tasks by a planner, the
//! sub-tasks are researched concurrently by search-backed workers, and a
//! synthesizer merges their findings into a draft report. The loop repeats
//! with refined sub-tasks until the synthesizer judges the report complete,
//! runs out of new tasks, or spends its iteration budget. A citation step
//! then produces the final report with numbered references.
//!
//! # Architecture
//!
//! - **Agent**: planner, workers, synthesizer and citation agents plus the
//!   orchestrator that drives them
//! - **Search**: web search backends offered to workers as a tool
//! - **Core**: data types shared with the CLI
//! - **CLI**: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use research_rs::agent::{Orchestrator, ResearchConfig, create_provider, create_search_backend};
//!
//! # async fn example() -> research_rs::Result<()> {
//! let config = ResearchConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let search = create_search_backend(&config)?;
//! let orchestrator = Orchestrator::new(provider, search, config);
//!
//! let result = orchestrator.run("What are the tradeoffs of io_uring?").await?;
//! println!("{}", result.report);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod search;

pub use agent::{FinalResult, Orchestrator, ResearchConfig, ResearchRun};
pub use crate::core::Source;
pub use error::{AgentError, CommandError, Error, Result};
