use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut json = false;
    let mut context = BTreeMap::new();
    let mut task_words = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--context" | "-c" => {
                let Some(pair) = args.next() else {
                    eprintln!("--context requires a key=value argument");
                    return Ok(ExitCode::from(2));
                };
                let Some((key, value)) = pair.split_once('=') else {
                    eprintln!("invalid context entry (expected key=value): {pair}");
                    return Ok(ExitCode::from(2));
                };
                context.insert(key.to_string(), value.to_string());
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(ExitCode::SUCCESS);
            }
            _ => task_words.push(arg),
        }
    }

    let task = task_words.join(" ");
    if task.is_empty() {
        print_usage();
        return Ok(ExitCode::from(2));
    }

    let context = if context.is_empty() {
        None
    } else {
        Some(&context)
    };
    roundtable::run(&task, context, json).await?;
    Ok(ExitCode::SUCCESS)
}

fn print_usage() {
    eprintln!("usage: roundtable \"<task description>\" [--context key=value]... [--json]");
    eprintln!();
    eprintln!("Runs a four-agent round table on the task. If the tech agent proposes a");
    eprintln!("code extension, it is validated in the sandbox and demonstrated once.");
}
