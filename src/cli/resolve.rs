use clap::Parser;
use std::path::PathBuf;

/// Arguments for the resolve command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Find the versioned source directory of a crate archive:\n    \
                   bundlecheck resolve kani-verifier.crate --pattern 'kani-verifier-{version}'\n\n\
                   Keep the extracted files:\n    \
                   bundlecheck resolve kani-verifier.crate --pattern 'kani-verifier-*' --into ./src")]
pub struct ResolveArgs {
    /// Gzip-compressed tar archive to extract
    pub archive: PathBuf,

    /// Directory name template (`{version}` matches any version) or glob
    #[arg(long, short = 'p', default_value = "kani-verifier-{version}")]
    pub pattern: String,

    /// Extract here instead of a temporary directory
    #[arg(long, value_name = "DIR")]
    pub into: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::super::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_cli_parsing_resolve() {
        let cli = Cli::try_parse_from([
            "bundlecheck",
            "resolve",
            "kani-verifier.crate",
            "--pattern",
            "kani-verifier-*",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.archive, PathBuf::from("kani-verifier.crate"));
                assert_eq!(args.pattern, "kani-verifier-*");
                assert_eq!(args.into, None);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_parsing_resolve_default_pattern() {
        let cli = Cli::try_parse_from(["bundlecheck", "resolve", "a.crate", "--into", "/tmp/x"])
            .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.pattern, "kani-verifier-{version}");
                assert_eq!(args.into, Some(PathBuf::from("/tmp/x")));
            }
            _ => panic!("Expected Resolve command"),
        }
    }
}
