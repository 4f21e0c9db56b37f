use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "A small expression language with closures")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file and print its result
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Check a source file for syntax errors
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Print the token stream of a source file
    Tokens {
        /// Path to the source file
        file: PathBuf,
    },

    /// Print the syntax tree of a source file
    Ast {
        /// Path to the source file
        file: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() -> Result<(), clap::Error> {
        let args = Args::try_parse_from(["slate", "run", "prog.sl"])?;
        assert!(matches!(args.command, Commands::Run { file } if file == PathBuf::from("prog.sl")));

        let args = Args::try_parse_from(["slate", "repl"])?;
        assert!(matches!(args.command, Commands::Repl));

        assert!(Args::try_parse_from(["slate", "tokens"]).is_err());
        Ok(())
    }
}
