//! Command-line surface expected by Ansible's script inventory plugin.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "awx-pg-inventory")]
#[command(about = "Ansible dynamic inventory backed by PostgreSQL", long_about = None)]
pub struct Cli {
    /// Print the full inventory (default when no flag is given)
    #[arg(long, conflicts_with = "host")]
    pub list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "HOSTNAME")]
    pub host: Option<String>,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// What the invocation asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Host(String),
}

impl Cli {
    pub fn mode(&self) -> Mode {
        match &self.host {
            Some(name) => Mode::Host(name.clone()),
            None => Mode::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_lists() {
        let cli = Cli::try_parse_from(["awx-pg-inventory"]).unwrap();
        assert_eq!(cli.mode(), Mode::List);
        assert!(!cli.pretty);
    }

    #[test]
    fn test_list_flag() {
        let cli = Cli::try_parse_from(["awx-pg-inventory", "--list", "--pretty"]).unwrap();
        assert_eq!(cli.mode(), Mode::List);
        assert!(cli.pretty);
    }

    #[test]
    fn test_host_flag() {
        let cli = Cli::try_parse_from(["awx-pg-inventory", "--host", "web1"]).unwrap();
        assert_eq!(cli.mode(), Mode::Host("web1".to_string()));
    }

    #[test]
    fn test_list_and_host_conflict() {
        assert!(Cli::try_parse_from(["awx-pg-inventory", "--list", "--host", "web1"]).is_err());
    }

    #[test]
    fn test_host_requires_name() {
        assert!(Cli::try_parse_from(["awx-pg-inventory", "--host"]).is_err());
    }
}
