//! hookscope CLI entry point.

use hookscope_lib::cli::{self, Cli};
use hookscope_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}
