pub mod agents;
pub mod sandbox;

use std::collections::BTreeMap;

use anyhow::Result;

use agents::round_table::RoundTable;

/// Run one discussion and print the outcome.
pub async fn run(task: &str, context: Option<&BTreeMap<String, String>>, json: bool) -> Result<()> {
    let mut table = RoundTable::new();
    let result = table.discuss(task, context).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
    }
    Ok(())
}
