use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info_span};

use hub_ingest::load_document;
use hub_map::{
    EntityColumn, MappingSession, SOURCE_VALUE_LIMIT, TreeView, relative_path, search_options,
    source_options,
};
use hub_model::{Authorities, NodeId, PropertyPath, SourcePath, SourceTree, TableId};

use crate::cli::{
    ColumnArg, ContextArgs, EvaluateArgs, MapArgs, OptionsArgs, ResolveArgs, StepArgs, TreeArgs,
};
use crate::local::LocalHub;
use crate::summary::{entity_table, options_table, render_outline};

fn load_tree(file: &Path) -> Result<SourceTree> {
    let (_, tree) =
        load_document(file).with_context(|| format!("load source document {}", file.display()))?;
    Ok(tree)
}

fn find_node(tree: &SourceTree, text: &str) -> Result<NodeId> {
    let path = SourcePath::parse(text).with_context(|| format!("parse node path '{text}'"))?;
    tree.find(&path)
        .ok_or_else(|| anyhow!("no source node at '{path}'"))
}

pub fn run_tree(args: &TreeArgs) -> Result<String> {
    let tree = load_tree(&args.file)?;
    let mut view = TreeView::new(args.sort.into());
    view.expand_all(&tree);
    if let Some(filter) = &args.filter {
        view.set_filter(filter);
    }
    let limit = args.value_limit.unwrap_or(SOURCE_VALUE_LIMIT);
    Ok(render_outline(&tree, &view, limit))
}

pub fn run_options(args: &OptionsArgs) -> Result<String> {
    let tree = load_tree(&args.file)?;
    let options = source_options(&tree);
    let shown = search_options(&options, args.search.as_deref().unwrap_or_default());
    Ok(options_table(&shown).to_string())
}

pub fn run_resolve(args: &ResolveArgs) -> Result<String> {
    let tree = load_tree(&args.file)?;
    let target = find_node(&tree, &args.target)?;
    let context = match &args.context {
        Some(text) => Some(
            SourcePath::parse(text).with_context(|| format!("parse context path '{text}'"))?,
        ),
        None => None,
    };
    let target_path = &tree
        .node(target)
        .context("selected node vanished from the tree")?
        .path;
    Ok(relative_path(target_path, context.as_ref()).to_string())
}

fn open_step(args: &StepArgs) -> Result<MappingSession<LocalHub>> {
    let hub = LocalHub::open(&args.hub).context("open hub directory")?;
    let options = hub.session_options().context("read hub.json")?;
    let authorities = if args.read_only {
        Authorities::from_names(["readMapping"])
    } else {
        Authorities::all()
    };
    let mut session = MappingSession::open(hub, &args.mapping, authorities, options)
        .with_context(|| format!("open mapping step '{}'", args.mapping))?;
    if let Some(uri) = &args.uri {
        session
            .set_document_uri(uri)
            .with_context(|| format!("load source document '{uri}'"))?;
    }
    Ok(session)
}

fn table_id(text: Option<&str>) -> TableId {
    match text {
        None | Some("primary") => TableId::Primary,
        Some(mapping_id) => TableId::Related(mapping_id.to_string()),
    }
}

pub fn run_map(args: &MapArgs) -> Result<String> {
    let span = info_span!("map", mapping = %args.step.mapping, property = %args.property);
    let _guard = span.enter();
    let mut session = open_step(&args.step)?;
    let table = table_id(args.table.as_deref());
    let property = PropertyPath::parse(&args.property)
        .with_context(|| format!("parse property path '{}'", args.property))?;
    match (&args.source, &args.expression) {
        (Some(source), _) => {
            let node = find_node(session.tree()?, source)?;
            let expression = session
                .select_source(&table, &property, node)
                .context("map property")?;
            Ok(expression)
        }
        (None, Some(text)) => {
            session
                .edit_expression(&table, &property, text)
                .context("store expression")?;
            Ok(session.state().expression(&table, &property).to_string())
        }
        (None, None) => Err(anyhow!("either --source or --expression is required")),
    }
}

pub fn run_context(args: &ContextArgs) -> Result<String> {
    let mut session = open_step(&args.step)?;
    let table = table_id(Some(&args.table));
    if args.clear {
        session.clear_context(&table).context("clear source context")?;
    } else if let Some(source) = &args.source {
        let node = find_node(session.tree()?, source)?;
        session
            .select_context(&table, node)
            .context("set source context")?;
    } else if let Some(text) = &args.expression {
        session
            .edit_context(&table, text)
            .context("set source context")?;
    } else {
        debug!(table = %table, "no change requested; showing current context");
    }
    Ok(session.state().context_expression(&table).to_string())
}

pub fn run_evaluate(args: &EvaluateArgs) -> Result<String> {
    let mut session = open_step(&args.step)?;
    if args.all_tables {
        let related: Vec<TableId> = session
            .state()
            .tables()
            .iter()
            .map(|table| table.id.clone())
            .filter(|id| matches!(id, TableId::Related(_)))
            .collect();
        for id in related {
            session.show_related(&id)?;
        }
    }
    for column in &args.hide_columns {
        let column = match column {
            ColumnArg::Type => EntityColumn::Type,
            ColumnArg::Expression => EntityColumn::Expression,
            ColumnArg::Value => EntityColumn::Value,
        };
        session.columns_mut().set_visible(column, false);
    }
    session.test().context("evaluate mapping")?;
    let uri = session.current_uri().unwrap_or_default().to_string();
    let position = session.uri_position().unwrap_or_default();
    Ok(format!(
        "Document {position} of {}: {uri}\n{}",
        session.uris().len(),
        entity_table(&session)
    ))
}
