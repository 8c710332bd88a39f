//! Shell completions command handler

use crate::cli::CompletionsArgs;
use crate::error::Result;
use crate::output::OutputWriter;
use clap::CommandFactory;

/// Handle the completions command
pub fn handle_completions(args: CompletionsArgs, output: &mut OutputWriter) -> Result<()> {
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();

    clap_complete::generate(args.shell.to_clap_shell(), &mut cmd, name, output.raw());
    output.raw().flush()?;

    Ok(())
}
