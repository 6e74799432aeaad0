use std::io;

use clap::Command;
use clap_complete::{generate, Shell};

pub fn run(shell: Shell, command: &mut Command) -> Result<(), Box<dyn std::error::Error>> {
    let name = command.get_name().to_string();
    generate(shell, command, name, &mut io::stdout());
    Ok(())
}
