//! Deploy command - reload the input method without updating.

use console::style;
use rimeup::deploy;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the deploy command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let deployer = runner.deployer()?;

    println!("Redeploying with {}...", deployer.name());
    deploy::redeploy(deployer.as_ref())?;
    println!("{} Deployed.", style("✓").green().bold());
    Ok(())
}
