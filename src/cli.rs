use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Print debug information to stderr
    #[arg(long)]
    pub debug: bool,

    /// Format to output responses and events as.
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Use an in-process simulated power service
    /// instead of UPower on the system bus.
    #[arg(long)]
    pub simulate: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the current battery level and exit
    Level,

    /// Print the charging state, then every change until interrupted
    Watch,

    /// Serve the method and event channels
    /// as line-delimited JSON on stdin and stdout.
    ///
    /// This is the default when no command is given.
    Serve,
}

#[derive(Debug, Default, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    #[default]
    Plain,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_to_serve() {
        let args = Args::parse_from(["battery-bridge"]);
        assert_eq!(args.command, None);
        assert!(!args.simulate);
    }

    #[test]
    fn watch_json() {
        let args = Args::parse_from(["battery-bridge", "--format", "json", "--simulate", "watch"]);
        assert_eq!(args.command, Some(Command::Watch));
        assert_eq!(args.format, Some(Format::Json));
        assert!(args.simulate);
    }
}
