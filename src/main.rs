use anyhow::Result;

use nfc_bridge::cli::commands::run_cli;

fn main() -> Result<()> {
    run_cli()
}
