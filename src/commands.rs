use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "motionhub", version, about = "Live phone motion telemetry viewer")]
pub struct Cli {
    /// TOML config file; defaults are used when it does not exist.
    #[arg(long, default_value = "motionhub.toml")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the live chart viewer.
    View {
        #[command(flatten)]
        login: LoginArgs,
        /// Register the email when it has no account yet.
        #[arg(long, requires = "email")]
        register: bool,
    },
    /// Publish synthetic motion readings as a device.
    Simulate {
        #[command(flatten)]
        login: LoginArgs,
        /// Stop after this many readings.
        #[arg(long)]
        count: Option<u64>,
    },
}

/// Log in through the auth service instead of reading credentials from the environment.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long, requires = "pin")]
    pub email: Option<String>,
    #[arg(long, requires = "email")]
    pub pin: Option<String>,
}

impl LoginArgs {
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.pin) {
            (Some(email), Some(pin)) => Some((email.as_str(), pin.as_str())),
            _ => None,
        }
    }
}
