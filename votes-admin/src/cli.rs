//! Command line interface of the votes admin tool.
use clap::{Parser, Subcommand};
use votes_shared::types::VoteCategory;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Print results as JSON instead of a status line.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move every vote from one category to another and fix the counters.
    Migrate {
        #[arg(default_value = "oppose")]
        from: VoteCategory,
        #[arg(default_value = "opposition")]
        to: VoteCategory,
    },
    /// Report what `migrate` would do without writing anything.
    Preview {
        #[arg(default_value = "oppose")]
        from: VoteCategory,
        #[arg(default_value = "opposition")]
        to: VoteCategory,
    },
    /// Compare every entity's counters with its vote records.
    Audit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_defaults_to_oppose_opposition() {
        let cli = Cli::try_parse_from(["votes-admin", "migrate"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Migrate {
                from: VoteCategory::Oppose,
                to: VoteCategory::Opposition,
            }
        );
        assert!(!cli.json);
    }

    #[test]
    fn test_preview_with_explicit_categories() {
        let cli = Cli::try_parse_from(["votes-admin", "preview", "support", "opposition", "--json"]).unwrap();

        assert_eq!(
            cli.command,
            Command::Preview {
                from: VoteCategory::Support,
                to: VoteCategory::Opposition,
            }
        );
        assert!(cli.json);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["votes-admin", "migrate", "against", "opposition"]).is_err());
    }
}
