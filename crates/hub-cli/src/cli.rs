//! CLI argument definitions for the hub mapper.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use hub_map::SortOrder;

#[derive(Parser)]
#[command(
    name = "hub-mapper",
    version,
    about = "Map source documents onto entity properties",
    long_about = "Inspect JSON and XML source documents and map their nodes onto entity\n\
                  properties of a mapping step stored in a local hub directory.\n\n\
                  A hub directory holds mappings/<name>.mapping.json,\n\
                  entities/<type>.entity.json, sources/*.json|*.xml and optionally\n\
                  functions.json and hub.json."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the node tree of a source document.
    Tree(TreeArgs),

    /// List the options offered by the source selector.
    Options(OptionsArgs),

    /// Resolve the path of a node relative to a source context.
    Resolve(ResolveArgs),

    /// Map a property of a mapping step to a source node or expression.
    Map(MapArgs),

    /// Set or clear the source context of a related entity table.
    Context(ContextArgs),

    /// Evaluate a mapping step against a source document.
    Evaluate(EvaluateArgs),
}

#[derive(Args)]
pub struct TreeArgs {
    /// Source document (.json or .xml).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only show nodes whose key contains this text, with their ancestors.
    #[arg(long = "filter", value_name = "TEXT")]
    pub filter: Option<String>,

    /// Order of sibling nodes.
    #[arg(long = "sort", value_enum, default_value = "document")]
    pub sort: SortArg,

    /// Characters of a value shown before truncation.
    #[arg(long = "value-limit", value_name = "N")]
    pub value_limit: Option<usize>,
}

#[derive(Args)]
pub struct OptionsArgs {
    /// Source document (.json or .xml).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Narrow the list to keys containing this text (case-insensitive).
    #[arg(long = "search", value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Source document (.json or .xml).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Full path of the selected node, e.g. `nutFreeName/FirstNamePreferred`.
    #[arg(value_name = "NODE_PATH")]
    pub target: String,

    /// Full path of the source context node.
    #[arg(long = "context", value_name = "NODE_PATH")]
    pub context: Option<String>,
}

/// Options shared by the commands working on a mapping step.
#[derive(Args)]
pub struct StepArgs {
    /// Hub directory.
    #[arg(value_name = "HUB")]
    pub hub: PathBuf,

    /// Name of the mapping step.
    #[arg(long = "mapping", value_name = "NAME")]
    pub mapping: String,

    /// Source document to work on (default: the first one).
    #[arg(long = "uri", value_name = "URI")]
    pub uri: Option<String>,

    /// Open the step without write access.
    #[arg(long = "read-only")]
    pub read_only: bool,
}

#[derive(Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Related entity mapping id (default: the primary entity table).
    #[arg(long = "table", value_name = "MAPPING_ID")]
    pub table: Option<String>,

    /// Property path, e.g. `items/itemTypes`.
    #[arg(long = "property", value_name = "PROPERTY")]
    pub property: String,

    /// Full path of the source node to map from.
    #[arg(long = "source", value_name = "NODE_PATH", conflicts_with = "expression")]
    pub source: Option<String>,

    /// Expression to store verbatim.
    #[arg(long = "expression", value_name = "TEXT", required_unless_present = "source")]
    pub expression: Option<String>,
}

#[derive(Args)]
pub struct ContextArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Related entity mapping id.
    #[arg(long = "table", value_name = "MAPPING_ID")]
    pub table: String,

    /// Full path of the node to use as context.
    #[arg(long = "source", value_name = "NODE_PATH", conflicts_with_all = ["expression", "clear"])]
    pub source: Option<String>,

    /// Context expression to store verbatim.
    #[arg(long = "expression", value_name = "TEXT", conflicts_with = "clear")]
    pub expression: Option<String>,

    /// Revert the table to the document root context.
    #[arg(long = "clear")]
    pub clear: bool,
}

#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Include every related table, not only the mapped ones.
    #[arg(long = "all-tables")]
    pub all_tables: bool,

    /// Columns to hide from the result table.
    #[arg(long = "hide-column", value_enum, value_name = "COLUMN")]
    pub hide_columns: Vec<ColumnArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortArg {
    Document,
    Ascending,
    Descending,
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Document => SortOrder::Document,
            SortArg::Ascending => SortOrder::Ascending,
            SortArg::Descending => SortOrder::Descending,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColumnArg {
    Type,
    Expression,
    Value,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
