use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sandbox::ExtensionRegistry;

use super::canned::default_lineup;
use super::{Agent, AgentReply, AgentRole, EXTENSION_MARKER};

/// Drives one discussion: the agents speak in order, each consuming the
/// previous reply, and any snippet the tech agent emits goes through the
/// sandbox. Owns the per-host extension registry for as long as it lives.
pub struct RoundTable {
    agents: Vec<Box<dyn Agent>>,
    extensions: ExtensionRegistry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionResult {
    pub id: Uuid,
    pub task: String,
    /// The accepted extension snippet, empty when nothing was loaded.
    pub consensus_code: String,
    pub replies: Vec<AgentReply>,
    pub raw_responses: BTreeMap<String, String>,
    pub extension: Option<ExtensionOutcome>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtensionOutcome {
    Loaded { name: String, printed: Vec<String> },
    Rejected { reason: String },
}

impl RoundTable {
    pub fn new() -> Self {
        Self::with_agents(default_lineup())
    }

    pub fn with_agents(agents: Vec<Box<dyn Agent>>) -> Self {
        Self {
            agents,
            extensions: ExtensionRegistry::new("round-table"),
        }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Run the discussion chain for a task and return the collected result.
    /// Per-agent failures are captured into the transcript; they never abort
    /// the discussion.
    pub async fn discuss(
        &mut self,
        task: &str,
        context: Option<&BTreeMap<String, String>>,
    ) -> DiscussionResult {
        let prompt = build_prompt(task, context);
        tracing::info!(%task, "round table discussion started");

        let mut raw_responses = BTreeMap::new();
        let mut replies = Vec::with_capacity(self.agents.len());
        let mut current = prompt;
        for agent in &self.agents {
            let text = match agent.respond(&current).await {
                Ok(text) => text,
                Err(err) => format!("Error in agent response: {err}"),
            };
            tracing::debug!(agent = agent.name(), role = %agent.role(), "agent replied");
            raw_responses.insert(agent.name().to_string(), text.clone());
            replies.push(AgentReply {
                agent: agent.name().to_string(),
                role: agent.role(),
                recommendation: text.clone(),
            });
            current = text;
        }

        let (consensus_code, extension) = self.try_extension(&replies);

        let result = DiscussionResult {
            id: Uuid::new_v4(),
            task: task.to_string(),
            consensus_code,
            replies,
            raw_responses,
            extension,
            finished_at: Utc::now(),
        };
        tracing::info!(id = %result.id, loaded = result.extension_loaded(), "discussion finished");
        result
    }

    /// Extract the tech agent's snippet, run it through the sandbox and, if
    /// accepted, invoke the bound extension once for its demonstration
    /// output.
    fn try_extension(&mut self, replies: &[AgentReply]) -> (String, Option<ExtensionOutcome>) {
        let Some(tech_reply) = replies
            .iter()
            .find(|reply| reply.role == AgentRole::Tech)
        else {
            return (String::new(), None);
        };
        let Some((_, rest)) = tech_reply.recommendation.split_once(EXTENSION_MARKER) else {
            return (String::new(), None);
        };
        let snippet = rest.trim();

        match self.extensions.load(snippet) {
            Ok(name) => {
                let mut printed = Vec::new();
                if let Some(Err(err)) = self.extensions.invoke(&name, &[], &mut printed) {
                    tracing::warn!(extension = %name, error = %err, "demonstration call failed");
                }
                for line in &printed {
                    tracing::info!(extension = %name, "{line}");
                }
                (
                    snippet.to_string(),
                    Some(ExtensionOutcome::Loaded { name, printed }),
                )
            }
            Err(reason) => {
                tracing::warn!(error = %reason, "extension snippet rejected");
                (
                    String::new(),
                    Some(ExtensionOutcome::Rejected {
                        reason: reason.to_string(),
                    }),
                )
            }
        }
    }
}

impl Default for RoundTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscussionResult {
    pub fn extension_loaded(&self) -> bool {
        matches!(self.extension, Some(ExtensionOutcome::Loaded { .. }))
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push("Round table summary:".to_string());
        lines.push("- Consensus code:".to_string());
        if self.consensus_code.is_empty() {
            lines.push("  (none)".to_string());
        } else {
            for code_line in self.consensus_code.lines() {
                lines.push(format!("  {code_line}"));
            }
        }
        lines.push("- Individual responses:".to_string());
        for reply in &self.replies {
            lines.push(format!(
                "  * {}: {}",
                reply.role.as_str().to_uppercase(),
                reply.recommendation
            ));
        }
        match &self.extension {
            Some(ExtensionOutcome::Loaded { name, printed }) => {
                lines.push(format!(
                    "- Extension `{name}` loaded, printed {} line(s)",
                    printed.len()
                ));
                for line in printed {
                    lines.push(format!("  > {line}"));
                }
            }
            Some(ExtensionOutcome::Rejected { reason }) => {
                lines.push(format!("- Extension rejected: {reason}"));
            }
            None => {
                lines.push("- No extension proposed".to_string());
            }
        }
        lines.join("\n")
    }
}

fn build_prompt(task: &str, context: Option<&BTreeMap<String, String>>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => {
            let pairs: Vec<String> = ctx.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{task} | context: {}", pairs.join(", "))
        }
        _ => task.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discussion_runs_all_agents_in_order() {
        let mut table = RoundTable::new();
        let result = table
            .discuss("Early phase vulnerability in business plan", None)
            .await;

        let roles: Vec<AgentRole> = result.replies.iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![
                AgentRole::Analysis,
                AgentRole::Creative,
                AgentRole::Tech,
                AgentRole::Security,
            ]
        );
        assert_eq!(result.raw_responses.len(), 4);
        assert_eq!(result.task, "Early phase vulnerability in business plan");
    }

    #[tokio::test]
    async fn test_replies_chain_through_agents() {
        let mut table = RoundTable::new();
        let result = table.discuss("stale cache", None).await;

        // The creative agent consumes the analysis reply verbatim.
        assert!(result.replies[1]
            .recommendation
            .contains("Analysis Agent: Identified weakness - stale cache"));
        // The security agent consumes the tech reply.
        assert!(result.replies[3].recommendation.contains("Tech Agent:"));
    }

    #[tokio::test]
    async fn test_extension_is_loaded_and_demonstrated() {
        let mut table = RoundTable::new();
        let result = table.discuss("stale cache", None).await;

        assert!(result.consensus_code.starts_with("def mitigate_weakness"));
        let Some(ExtensionOutcome::Loaded { name, printed }) = &result.extension else {
            panic!("expected a loaded extension, got {:?}", result.extension);
        };
        assert_eq!(name, "mitigate_weakness");
        assert_eq!(printed.len(), 1);
        assert!(printed[0].starts_with("Mitigating "));
        assert!(table.extensions().get("mitigate_weakness").is_some());
    }

    #[tokio::test]
    async fn test_context_reaches_the_first_agent() {
        let mut table = RoundTable::new();
        let mut ctx = BTreeMap::new();
        ctx.insert("env".to_string(), "prod".to_string());
        ctx.insert("budget".to_string(), "low".to_string());
        let result = table.discuss("slow deploys", Some(&ctx)).await;

        assert!(result.replies[0]
            .recommendation
            .contains("slow deploys | context: budget=low, env=prod"));
    }

    #[tokio::test]
    async fn test_repeat_discussions_replace_the_binding() {
        let mut table = RoundTable::new();
        table.discuss("first weakness", None).await;
        table.discuss("second weakness", None).await;
        assert_eq!(table.extensions().len(), 1);
        assert_eq!(table.extensions().names(), vec!["mitigate_weakness"]);
    }

    #[tokio::test]
    async fn test_tasks_with_quotes_survive_snippet_embedding() {
        let mut table = RoundTable::new();
        let result = table.discuss("the 'fast path' isn't covered", None).await;
        assert!(result.extension_loaded(), "extension: {:?}", result.extension);
    }

    #[tokio::test]
    async fn test_summary_covers_all_sections() {
        let mut table = RoundTable::new();
        let result = table.discuss("stale cache", None).await;
        let summary = result.summary();

        assert!(summary.contains("Round table summary:"));
        assert!(summary.contains("def mitigate_weakness"));
        for role in ["ANALYSIS", "CREATIVE", "TECH", "SECURITY"] {
            assert!(summary.contains(role), "missing {role} in:\n{summary}");
        }
        assert!(summary.contains("loaded, printed 1 line(s)"));
    }

    #[tokio::test]
    async fn test_result_serializes_to_json() {
        let mut table = RoundTable::new();
        let result = table.discuss("stale cache", None).await;
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["task"], "stale cache");
        assert_eq!(json["extension"]["status"], "loaded");
        assert_eq!(json["replies"][2]["role"], "tech");
    }

    #[tokio::test]
    async fn test_no_tech_agent_means_no_extension() {
        use crate::agents::canned::CannedAgent;
        let mut table = RoundTable::with_agents(vec![Box::new(CannedAgent::new(
            "Analysis-AI",
            AgentRole::Analysis,
        ))]);
        let result = table.discuss("anything", None).await;
        assert!(result.extension.is_none());
        assert!(result.consensus_code.is_empty());
        assert!(table.extensions().is_empty());
    }
}
