//! Command line interface.
//!
//! `valtext` with no subcommand runs the full flow: swap voice, start the
//! client, wait for the patch to finish, swap text, start the game.

use clap::{Parser, Subcommand, ValueEnum};
use valtext_protocol::{Language, Role};

/// ValText: play with text and voice in different languages.
#[derive(Debug, Parser)]
#[command(name = "valtext", version, after_long_help = STAGING_HELP)]
pub struct Cli {
    /// Text language for this run (overrides the configuration).
    #[arg(long, global = true, value_name = "LANG")]
    pub text: Option<Language>,

    /// Voice language for this run (overrides the configuration).
    #[arg(long, global = true, value_name = "LANG")]
    pub voice: Option<Language>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

const STAGING_HELP: &str = r#"Staging assets
  ValText keeps a copy of each language's .pak/.sig pair outside the game.
  To stage a language, set the game to it in the Riot Client, let it finish
  patching, then run:
    valtext --text English stage text
    valtext --voice Japanese stage voice"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Swap languages, start the client, wait for the patch, start the game.
    Run,

    /// Copy the game's current asset pair into the store.
    ///
    /// Uses the active language of the given role; the game must currently
    /// be set to that language.
    Stage {
        #[arg(value_enum)]
        role: RoleArg,
    },

    /// List supported languages and the current selection.
    Languages,

    /// Print the configuration file path and effective values.
    Config,
}

/// CLI-facing role, mapped to the domain `Role`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    /// On-screen text.
    Text,
    /// Spoken dialogue.
    Voice,
}

impl RoleArg {
    pub fn to_domain(self) -> Role {
        match self {
            Self::Text => Role::Text,
            Self::Voice => Role::Voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["valtext"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn language_overrides_parse() {
        let cli = Cli::try_parse_from(["valtext", "--text", "english", "--voice", "ja_JP", "run"])
            .unwrap();
        assert_eq!(cli.text, Some(Language::English));
        assert_eq!(cli.voice, Some(Language::Japanese));
        assert!(matches!(cli.command, Some(Command::Run)));
    }

    #[test]
    fn unknown_language_rejected() {
        assert!(Cli::try_parse_from(["valtext", "--text", "Klingon"]).is_err());
    }

    #[test]
    fn stage_takes_role() {
        let cli = Cli::try_parse_from(["valtext", "stage", "voice", "--voice", "Korean"]).unwrap();
        match cli.command {
            Some(Command::Stage { role }) => assert_eq!(role.to_domain(), Role::Voice),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.voice, Some(Language::Korean));
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
