use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "navshell", version, about = "Navigation shell with deferred deep links")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Run the interactive shell, reading commands from stdin
    Run {
        /// Start with a signed-in session
        #[arg(long)]
        signed_in: bool,
        /// Start with an unresolved session until `signin`/`signout`
        #[arg(long, conflicts_with = "signed_in")]
        unknown_session: bool,
    },
    /// Persist a deep link as if it arrived while the app was closed
    Deliver {
        /// `<domain>/<route>`, e.g. `authorized/notice:7`
        link: String,
    },
    /// Print the persisted deep link, if any
    Pending,
    /// Drop the persisted deep link
    Clear,
}
