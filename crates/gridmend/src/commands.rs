//! Gridmend command implementations

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use gridmend_agent::{FsmDriver, StepRecord};
use gridmend_config::{self, Config};
use gridmend_oracle::ChatOracle;
use gridmend_runlog::RunStore;
use gridmend_world::{NodeStatus, WorldModel, WorldSeed};

/// Initialize config and runs directory
pub async fn init_command() -> Result<()> {
    println!("Initializing gridmend...");

    let config = gridmend_config::init().await?;
    tokio::fs::create_dir_all(config.runs_dir()).await?;

    println!("\nGridmend initialized");
    println!("\nNext steps:");
    println!("  1. Add your API key to ~/.gridmend/config.json");
    println!("     Get one at: https://openrouter.ai/keys");
    println!("  2. Start a run: gridmend run");

    Ok(())
}

/// Execute one repair run. Returns whether FINAL was reached.
pub async fn run_command(max_steps: Option<u32>, seed: Option<PathBuf>) -> Result<bool> {
    let config = Config::load().await?;

    let api_key = config
        .api_key()
        .context("No API key configured. Set one in ~/.gridmend/config.json")?;

    let oracle = ChatOracle::new(
        api_key,
        config.oracle.api_base.clone(),
        config.oracle.model.clone(),
    )
    .with_timeout(Duration::from_secs(config.defaults.request_timeout_secs))
    .with_max_tokens(config.defaults.max_tokens);

    let world = match seed {
        Some(path) => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read seed file {}", path.display()))?;
            let seed: WorldSeed = serde_json::from_str(&content)
                .with_context(|| format!("invalid seed file {}", path.display()))?;
            WorldModel::from_seed(seed)
        }
        None => WorldModel::demo(),
    };

    let max_steps = max_steps.unwrap_or(config.defaults.max_steps);
    let mut driver = FsmDriver::new(world, oracle, max_steps);

    println!("Run {}", driver.run_id());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let outcome = driver.run().await;

    print_world(driver.world());
    let record = driver.into_record(outcome);

    println!("Steps:");
    for step in &record.steps {
        println!("{}", format_step(step));
    }

    println!(
        "\n{} in {} step(s)",
        if outcome.completed {
            "Completed"
        } else {
            "Step budget exhausted"
        },
        outcome.steps
    );

    let store = RunStore::new(config.runs_dir());
    let path = store.save(&record).await?;
    println!("Run record: {}", path.display());

    Ok(outcome.completed)
}

fn print_world(world: &WorldModel) {
    println!("\nNodes:");
    for node in world.nodes() {
        let marker = match node.status {
            NodeStatus::Operational => "ok",
            NodeStatus::Broken => "BROKEN",
            NodeStatus::Repairing => "repairing",
        };
        println!("  {} [{}]", node.id, marker);
    }
    println!("Crews:");
    for crew in world.crews() {
        println!("  {} [{:?}]", crew.id, crew.status);
    }
    println!();
}

fn format_step(step: &StepRecord) -> String {
    let mark = if step.overridden { " *" } else { "" };
    format!(
        "{:>2}. [{}] {}{} - {}",
        step.step,
        step.state.name(),
        step.action,
        mark,
        step.observation
    )
}

/// Show system status
pub async fn status_command() -> Result<()> {
    let config_path = gridmend_config::config_path();

    println!("Gridmend System Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    if config_path.exists() {
        let config = Config::load().await?;
        let runs_dir = config.runs_dir();
        println!(
            "Runs dir: {} {}",
            runs_dir.display(),
            if runs_dir.exists() { "[OK]" } else { "[Missing]" }
        );
        println!(
            "API Key:  {}",
            if config.has_api_key() {
                "[Set]"
            } else {
                "[Missing]"
            }
        );
        println!(
            "Model:    {}",
            config.oracle.model.as_deref().unwrap_or("(backend default)")
        );
        println!("Max steps: {}", config.defaults.max_steps);

        let store = RunStore::new(&runs_dir);
        match store.latest().await {
            Some(name) => {
                println!("Latest run: {}", name);
                if let Some(record) = store.load(&name).await {
                    println!(
                        "  {} - {} step(s), {}",
                        record.run_id,
                        record.steps.len(),
                        if record.completed {
                            "completed"
                        } else {
                            "incomplete"
                        }
                    );
                }
            }
            None => println!("Latest run: (none)"),
        }
    }

    println!("\nReady");

    Ok(())
}
