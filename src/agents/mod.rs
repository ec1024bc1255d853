pub mod canned;
pub mod round_table;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Marker the tech agent places in front of a generated snippet; the round
/// table extracts everything after it for the sandbox.
pub const EXTENSION_MARKER: &str = "Generating code extension:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Analysis,
    Creative,
    Tech,
    Security,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Analysis => "analysis",
            AgentRole::Creative => "creative",
            AgentRole::Tech => "tech",
            AgentRole::Security => "security",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent's contribution to a discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub agent: String,
    pub role: AgentRole,
    pub recommendation: String,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn role(&self) -> AgentRole;

    /// Produce a response to the previous speaker's output (or the task
    /// prompt, for the first agent in the chain).
    async fn respond(&self, input: &str) -> Result<String>;
}
