use anyhow::Result;
use async_trait::async_trait;

use super::{Agent, AgentRole, EXTENSION_MARKER};

/// Fixed-template responder. The round table is a simulation: each role
/// turns its input into a canned recommendation, and the tech role emits a
/// candidate extension snippet for the sandbox.
pub struct CannedAgent {
    name: String,
    role: AgentRole,
}

impl CannedAgent {
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

#[async_trait]
impl Agent for CannedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> AgentRole {
        self.role
    }

    async fn respond(&self, input: &str) -> Result<String> {
        let reply = match self.role {
            AgentRole::Analysis => format!(
                "Analysis Agent: Identified weakness - {input}. \
                 Potential threats: Regulatory hurdles, competition."
            ),
            AgentRole::Creative => format!(
                "Creative Agent: Suggest solution - Integrate self-optimization to mitigate {input}."
            ),
            AgentRole::Tech => {
                let snippet = format!(
                    "def mitigate_weakness(self):\n    print('Mitigating {} with self-optimization extension.')\n",
                    escape_literal(input)
                );
                format!("Tech Agent: {EXTENSION_MARKER} {snippet}")
            }
            AgentRole::Security => {
                format!("Security Agent: Reviewed code for {input} - Secure and compliant.")
            }
        };
        Ok(reply)
    }
}

/// The default four-seat lineup, in speaking order.
pub fn default_lineup() -> Vec<Box<dyn Agent>> {
    vec![
        Box::new(CannedAgent::new("Analysis-AI", AgentRole::Analysis)),
        Box::new(CannedAgent::new("Creative-AI", AgentRole::Creative)),
        Box::new(CannedAgent::new("Tech-AI", AgentRole::Tech)),
        Box::new(CannedAgent::new("Security-AI", AgentRole::Security)),
    ]
}

/// Make arbitrary text safe to embed in a single-quoted snippet literal.
fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox;

    #[tokio::test]
    async fn test_each_role_has_a_template() {
        for (role, needle) in [
            (AgentRole::Analysis, "Identified weakness"),
            (AgentRole::Creative, "Suggest solution"),
            (AgentRole::Tech, EXTENSION_MARKER),
            (AgentRole::Security, "Reviewed code"),
        ] {
            let agent = CannedAgent::new("test", role);
            let reply = agent.respond("slow builds").await.expect("respond");
            assert!(reply.contains(needle), "role {role}: {reply}");
            assert!(reply.contains("slow builds") || role == AgentRole::Tech);
        }
    }

    #[tokio::test]
    async fn test_tech_snippet_passes_validation() {
        let agent = CannedAgent::new("Tech-AI", AgentRole::Tech);
        let reply = agent.respond("weak onboarding flow").await.expect("respond");
        let (_, snippet) = reply.split_once(EXTENSION_MARKER).expect("marker");
        let func = sandbox::validate::validate(snippet.trim()).expect("snippet is whitelisted");
        assert_eq!(func.name, "mitigate_weakness");
    }

    #[tokio::test]
    async fn test_tech_snippet_escapes_quotes() {
        let agent = CannedAgent::new("Tech-AI", AgentRole::Tech);
        let reply = agent
            .respond("the 'fast path' isn't covered")
            .await
            .expect("respond");
        let (_, snippet) = reply.split_once(EXTENSION_MARKER).expect("marker");
        assert!(sandbox::validate::validate(snippet.trim()).is_ok());
    }

    #[test]
    fn test_default_lineup_order() {
        let roles: Vec<AgentRole> = default_lineup().iter().map(|a| a.role()).collect();
        assert_eq!(
            roles,
            vec![
                AgentRole::Analysis,
                AgentRole::Creative,
                AgentRole::Tech,
                AgentRole::Security,
            ]
        );
    }
}
