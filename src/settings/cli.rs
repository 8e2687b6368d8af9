use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Session and token gateway")]
pub struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
