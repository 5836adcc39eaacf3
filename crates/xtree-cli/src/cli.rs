use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xtree",
    about = "XTree: diff, patch, and dependency-order node trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Keyed,
    Ordered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    AncestorsFirst,
    DescendantsFirst,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the edits that turn LHS into RHS
    Diff(DiffArgs),
    /// Apply the edits to LHS and write the patched tree
    Patch(PatchArgs),
    /// List the nodes of a tree in dependency order
    Sort(SortArgs),
}

/// Options shared by `diff` and `patch`.
#[derive(Args)]
pub struct CompareArgs {
    /// Tree to transform (JSON fragment)
    pub lhs: PathBuf,
    /// Target tree (JSON fragment)
    pub rhs: PathBuf,
    /// Diff configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Override the configured matching mode
    #[arg(long)]
    pub mode: Option<ModeArg>,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub compare: CompareArgs,
}

#[derive(Args)]
pub struct PatchArgs {
    #[command(flatten)]
    pub compare: CompareArgs,
    /// Write the patched tree here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct SortArgs {
    /// Tree whose nodes to order (JSON fragment)
    pub tree: PathBuf,
    #[arg(long, default_value = "ancestors-first")]
    pub order: SortOrder,
    /// Order nodes of kind A before nodes of kind B (as `A:B`)
    #[arg(long = "kind-before", value_name = "A:B", value_parser = parse_kind_pair)]
    pub kind_before: Vec<(String, String)>,
}

fn parse_kind_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((first, then)) if !first.is_empty() && !then.is_empty() => {
            Ok((first.to_string(), then.to_string()))
        }
        _ => Err(format!("expected FIRST:THEN, got `{s}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from(["xtree", "diff", "a.json", "b.json"]).unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.compare.lhs, PathBuf::from("a.json"));
            assert_eq!(args.compare.rhs, PathBuf::from("b.json"));
            assert!(args.compare.config.is_none());
            assert!(args.compare.mode.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_diff_with_mode_and_config() {
        let cli = Cli::try_parse_from([
            "xtree", "diff", "a.json", "b.json", "--mode", "ordered", "--config", "diff.toml",
        ])
        .unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.compare.mode, Some(ModeArg::Ordered));
            assert_eq!(args.compare.config, Some(PathBuf::from("diff.toml")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_diff_requires_both_trees() {
        assert!(Cli::try_parse_from(["xtree", "diff", "a.json"]).is_err());
    }

    #[test]
    fn parse_patch_output() {
        let cli = Cli::try_parse_from(["xtree", "patch", "a.json", "b.json", "-o", "out.json"]).unwrap();
        if let Command::Patch(args) = cli.command {
            assert_eq!(args.output, Some(PathBuf::from("out.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_sort_defaults() {
        let cli = Cli::try_parse_from(["xtree", "sort", "t.json"]).unwrap();
        if let Command::Sort(args) = cli.command {
            assert_eq!(args.order, SortOrder::AncestorsFirst);
            assert!(args.kind_before.is_empty());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_sort_rules() {
        let cli = Cli::try_parse_from([
            "xtree", "sort", "t.json", "--order", "descendants-first",
            "--kind-before", "table:index", "--kind-before", "schema:table",
        ])
        .unwrap();
        if let Command::Sort(args) = cli.command {
            assert_eq!(args.order, SortOrder::DescendantsFirst);
            assert_eq!(
                args.kind_before,
                vec![
                    ("table".to_string(), "index".to_string()),
                    ("schema".to_string(), "table".to_string()),
                ]
            );
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_sort_rejects_bad_pair() {
        assert!(Cli::try_parse_from(["xtree", "sort", "t.json", "--kind-before", "table"]).is_err());
        assert!(Cli::try_parse_from(["xtree", "sort", "t.json", "--kind-before", ":index"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["xtree", "--verbose", "sort", "t.json"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["xtree", "diff", "a", "b", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
