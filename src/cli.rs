use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lease-probe", version, about, long_about = None)]
pub struct Cli {
    /// Verbose mode (-v, -vv)
    #[arg(short, action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Runs one readiness cycle; exit status 0 means ready (default)
    Probe,
    /// Clears the lease if this instance holds it, e.g. before shutdown
    #[command(alias = "drain")]
    Release,
    /// Prints the stored lease without modifying it
    Show,
    /// Lists the environment variables the probe reads
    Env,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_probe() {
        let cli = Cli::parse_from(["lease-probe"]);
        assert_eq!(cli.command(), Commands::Probe);
        assert_eq!(cli.verbosity, 0);
    }

    #[test]
    fn test_drain_alias() {
        let cli = Cli::parse_from(["lease-probe", "drain", "-vv"]);
        assert_eq!(cli.command(), Commands::Release);
        assert_eq!(cli.verbosity, 2);
    }
}
