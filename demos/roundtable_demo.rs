use roundtable::agents::round_table::RoundTable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Round Table Demo");
    println!("================\n");

    let mut table = RoundTable::new();

    let tasks = vec![
        "Early phase vulnerability in business plan",
        "Stale cache on the hot path",
        "Weak onboarding flow",
    ];

    for task in tasks {
        println!("Task: {task}");
        println!("Discussing...\n");

        let result = table.discuss(task, None).await;
        println!("{}", result.summary());
        println!("\n{}\n", "=".repeat(60));
    }

    println!(
        "Registered extensions after all rounds: {:?}",
        table.extensions().names()
    );

    Ok(())
}
