use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use xtree_change::{ChangeSet, Operation};
use xtree_diff::{DiffConfig, MatchMode, TreeDiffer};
use xtree_sort::{AncestorDependency, ClassDependency, DependencySorter, DescendantDependency};
use xtree_types::{value_text, Document, Fragment, NodeId, NodeRef};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Diff(args) => cmd_diff(&args, cli.format, &mut out),
        Command::Patch(args) => cmd_patch(&args, cli.format, &mut out),
        Command::Sort(args) => cmd_sort(&args, cli.format, &mut out),
    }
}

fn load_tree(path: &Path) -> anyhow::Result<(Document, NodeId)> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let fragment: Fragment = serde_json::from_str(&text)
        .with_context(|| format!("parsing tree {}", path.display()))?;
    debug!(path = %path.display(), nodes = fragment.node_count(), "tree loaded");
    Ok(Document::from_fragment(&fragment))
}

fn load_config(args: &CompareArgs) -> anyhow::Result<DiffConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            DiffConfig::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => DiffConfig::default(),
    };
    match args.mode {
        Some(ModeArg::Keyed) => config.mode = MatchMode::Keyed,
        Some(ModeArg::Ordered) => config.mode = MatchMode::Ordered,
        None => {}
    }
    Ok(config)
}

fn paint(operation: &Operation) -> colored::ColoredString {
    let line = operation.to_string();
    match operation {
        Operation::AddChild { .. } => line.green(),
        Operation::RemoveChild { .. } | Operation::RemoveAttribute { .. } => line.red(),
        Operation::SetParent { .. } => line.cyan(),
        Operation::SetAttribute { .. } | Operation::SetVariable { .. } => line.yellow(),
    }
}

fn print_changes(changes: &ChangeSet, out: &mut dyn Write) -> anyhow::Result<()> {
    for (index, operation) in changes.operations().iter().enumerate() {
        writeln!(out, "{:>4}  {}", index.to_string().dimmed(), paint(operation))?;
    }
    Ok(())
}

pub fn cmd_diff(args: &DiffArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let compare = &args.compare;
    let config = load_config(compare)?;
    let (lhs, lr) = load_tree(&compare.lhs)?;
    let (rhs, rr) = load_tree(&compare.rhs)?;

    let changes = TreeDiffer::from_config(&config)
        .changes(&lhs, lr, &rhs, rr)
        .context("diffing trees")?;

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(changes.operations())?)?;
        }
        OutputFormat::Text if changes.is_empty() => {
            writeln!(out, "{} Trees are identical.", "✓".green().bold())?;
        }
        OutputFormat::Text => {
            print_changes(&changes, out)?;
            writeln!(out, "Trees differ: {} operation(s).", changes.size().to_string().bold())?;
        }
    }
    Ok(())
}

pub fn cmd_patch(args: &PatchArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let compare = &args.compare;
    let config = load_config(compare)?;
    let (mut lhs, lr) = load_tree(&compare.lhs)?;
    let (rhs, rr) = load_tree(&compare.rhs)?;

    let differ = TreeDiffer::from_config(&config);
    let mut changes = differ.changes(&lhs, lr, &rhs, rr).context("diffing trees")?;
    changes.apply_changes(&mut lhs).context("applying changes")?;
    if differ.differs(&lhs, lr, &rhs, rr)? {
        bail!("patched tree still differs from {}", compare.rhs.display());
    }

    let patched = lhs
        .to_fragment(lr)
        .context("patched root vanished from the document")?;
    let text = serde_json::to_string_pretty(&patched)?;

    let Some(path) = &args.output else {
        writeln!(out, "{text}")?;
        return Ok(());
    };
    fs::write(path, format!("{text}\n")).with_context(|| format!("writing {}", path.display()))?;
    match format {
        OutputFormat::Json => writeln!(
            out,
            "{}",
            json!({ "operations": changes.size(), "output": path.display().to_string() })
        )?,
        OutputFormat::Text => writeln!(
            out,
            "{} Applied {} operation(s), wrote {}",
            "✓".green().bold(),
            changes.size(),
            path.display().to_string().bold()
        )?,
    }
    Ok(())
}

fn label(node: &NodeRef<'_>) -> String {
    match node.attribute("id") {
        Some(id) => format!("{}[{}]", node.kind(), value_text(id)),
        None => node.kind().to_string(),
    }
}

pub fn cmd_sort(args: &SortArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let (doc, root) = load_tree(&args.tree)?;
    let nodes: Vec<NodeRef<'_>> = doc.descendants(root).into_iter().map(|id| doc.node(id)).collect();

    let mut sorter: DependencySorter<'_, NodeRef<'_>> = DependencySorter::new();
    match args.order {
        SortOrder::AncestorsFirst => sorter.add(Arc::new(AncestorDependency)),
        SortOrder::DescendantsFirst => sorter.add(Arc::new(DescendantDependency)),
    };
    for (first, then) in &args.kind_before {
        sorter.add(Arc::new(ClassDependency::new(then.as_str(), first.as_str())));
    }

    let sorted = sorter.sort(nodes).context("ordering nodes")?;
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = sorted
                .iter()
                .map(|n| json!({ "node": n.id(), "kind": n.kind(), "label": label(n) }))
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
        }
        OutputFormat::Text => {
            for node in &sorted {
                writeln!(out, "{:>5}  {}", node.id().to_string().dimmed(), label(node).cyan())?;
            }
        }
    }
    Ok(())
}
