// src/main.rs

use projectstep::errors::ProjectStepError;
use projectstep::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("projectstep error: {err:?}");
        std::process::exit(exit_status(&err));
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await?;
    Ok(())
}

/// Propagate the failed command's exit code when there is one.
fn exit_status(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ProjectStepError>() {
        Some(ProjectStepError::Build(failure)) => failure
            .exit_code()
            .filter(|code| (1..=255).contains(code))
            .unwrap_or(1),
        _ => 1,
    }
}
