//! Command line parsing

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage:
  catalog-harvester run [CONFIG]
  catalog-harvester search <QUERY> [CONFIG]

CONFIG defaults to ./config.json, then the user config directory.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Harvest every configured catalog
    Run { config: Option<PathBuf> },
    /// Query the full-text index
    Search { query: String, config: Option<PathBuf> },
    Help,
}

/// Parse arguments, program name excluded.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut args = args.into_iter();
    let command = match args.next().as_deref() {
        None | Some("run") => Command::Run {
            config: args.next().map(PathBuf::from),
        },
        Some("search") => {
            let query = args.next().ok_or_else(|| anyhow!("Missing query for search"))?;
            Command::Search {
                query,
                config: args.next().map(PathBuf::from),
            }
        }
        Some("-h" | "--help" | "help") => return Ok(Command::Help),
        Some(other) => bail!("Unknown command: {other}"),
    };
    if let Some(extra) = args.next() {
        bail!("Unexpected argument: {extra}");
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[rstest]
    #[case(&[], Command::Run { config: None })]
    #[case(&["run", "harvest.json"], Command::Run { config: Some(PathBuf::from("harvest.json")) })]
    #[case(&["search", "red lawn"], Command::Search { query: "red lawn".into(), config: None })]
    #[case(&["--help"], Command::Help)]
    fn test_parse_args(#[case] input: &[&str], #[case] expected: Command) {
        assert_eq!(parse_args(args(input)).unwrap(), expected);
    }

    #[rstest]
    #[case(&["search"])]
    #[case(&["crawl"])]
    #[case(&["run", "a.json", "b.json"])]
    fn test_parse_args_rejects(#[case] input: &[&str]) {
        assert!(parse_args(args(input)).is_err());
    }
}
