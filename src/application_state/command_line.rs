//! Command line options of the engine binary.

use std::path::PathBuf;

use clap::Parser;

use crate::error::EngineError;

/// Options parsed from the command line.
#[derive(Parser, Clone, Debug, Default, PartialEq, Eq)]
#[command(
    name = "voxel-frame-engine",
    version,
    about = "Voxel engine with a mode-driven frame loop"
)]
pub struct CommandLine {
    /// Start in the graphical menu instead of the AI-game menu.
    #[arg(long, conflicts_with = "ai_menu")]
    pub graphical: bool,

    /// Start in the AI-game menu (the default).
    #[arg(long)]
    pub ai_menu: bool,

    /// Engine settings file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Shut down after this many rendered frames.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,
}

impl CommandLine {
    /// Parses the arguments following the program name.
    ///
    /// # Returns
    /// `InvalidArgument` for an unknown flag, a missing or malformed value, or both
    /// `--graphical` and `--ai-menu`
    pub fn parse<I>(args: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = String>,
    {
        let program = std::iter::once(String::from("voxel-frame-engine"));
        Self::try_parse_from(program.chain(args))
            .map_err(|error| EngineError::InvalidArgument(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CommandLine, EngineError> {
        CommandLine::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn test_defaults_to_ai_menu() {
        assert_eq!(parse(&[]).unwrap(), CommandLine::default());
        assert!(!parse(&["--ai-menu"]).unwrap().graphical);
    }

    #[test]
    fn test_all_flags() {
        let options = parse(&["--graphical", "--config", "engine.json", "--frames", "120"]).unwrap();
        assert!(options.graphical);
        assert_eq!(options.config, Some(PathBuf::from("engine.json")));
        assert_eq!(options.frames, Some(120));

        let options = parse(&["--frames=5", "--config=other.json"]).unwrap();
        assert_eq!(options.frames, Some(5));
        assert_eq!(options.config, Some(PathBuf::from("other.json")));
    }

    #[test]
    fn test_menu_flags_conflict() {
        assert!(matches!(
            parse(&["--graphical", "--ai-menu"]),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(matches!(parse(&["--frames"]), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(parse(&["--frames", "many"]), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(parse(&["--frames", "-3"]), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(parse(&["--fullscreen"]), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(parse(&["level.json"]), Err(EngineError::InvalidArgument(_))));
    }
}
