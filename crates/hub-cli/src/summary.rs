use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hub_map::{
    DisplayValue, EntityColumn, EvaluatedValue, MappingClient, MappingSession, SourceOption,
    TreeView, display_source_value,
};
use hub_model::{NodeId, SourceTree};

/// Indented outline of the rows `view` shows, one node per line.
pub fn render_outline(tree: &SourceTree, view: &TreeView<NodeId>, value_limit: usize) -> String {
    let mut lines = Vec::new();
    for row in view.visible_rows(tree) {
        let Some(node) = tree.get(row.key) else {
            continue;
        };
        let mut line = format!("{}{}", "  ".repeat(row.depth), node.key);
        if node.is_array {
            line.push_str(" [array]");
        }
        if let Some(value) = &node.value {
            let shown = display_source_value(value, value_limit);
            line.push_str(" = ");
            line.push_str(&shown.text);
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn options_table(options: &[&SourceOption]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Path"),
        header_cell("Multiple"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for option in options {
        table.add_row(vec![
            Cell::new(format!("{}{}", " ".repeat(option.indent_px() / 10), option.key)),
            Cell::new(option.path.to_string()),
            if option.is_array {
                Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                dim_cell("-")
            },
        ]);
    }
    table
}

/// One entity property as shown after a Test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRowView {
    pub table: String,
    /// Row belongs to a related entity table.
    pub related: bool,
    pub property: String,
    pub datatype: String,
    pub expression: String,
    pub value: Option<DisplayValue>,
    pub error: Option<String>,
}

/// Rows of every visible entity table, in table then definition order.
pub fn entity_rows<C: MappingClient>(session: &MappingSession<C>) -> Vec<EntityRowView> {
    let mut rows = Vec::new();
    for table in session.visible_tables() {
        if table.has_context_row() {
            rows.push(EntityRowView {
                table: table.title.clone(),
                related: true,
                property: "Context".to_string(),
                datatype: String::new(),
                expression: session.state().context_expression(&table.id).to_string(),
                value: None,
                error: None,
            });
        }
        for row in &table.rows {
            let error = match session.evaluation().value(&table.id, &row.path) {
                Some(EvaluatedValue::Error(message)) => Some(message.clone()),
                _ => None,
            };
            rows.push(EntityRowView {
                table: table.title.clone(),
                related: table.has_context_row(),
                property: format!("{}{}", "  ".repeat(row.depth()), row.name()),
                datatype: row.datatype.clone(),
                expression: session.state().expression(&table.id, &row.path).to_string(),
                value: session.entity_value(&table.id, &row.path),
                error,
            });
        }
    }
    rows
}

pub fn entity_table<C: MappingClient>(session: &MappingSession<C>) -> Table {
    let columns = session.columns().visible();
    let mut table = Table::new();
    let mut header = vec![header_cell("Table")];
    header.extend(columns.iter().map(|column| header_cell(&column.to_string())));
    table.set_header(header);
    apply_table_style(&mut table);

    for row in entity_rows(session) {
        let mut cells = vec![table_cell(&row.table, row.related)];
        for column in &columns {
            cells.push(match column {
                EntityColumn::Name => Cell::new(&row.property),
                EntityColumn::Type => dim_cell(&row.datatype),
                EntityColumn::Expression => Cell::new(&row.expression),
                EntityColumn::Value => value_cell(&row),
            });
        }
        table.add_row(cells);
    }
    table
}

fn value_cell(row: &EntityRowView) -> Cell {
    match (&row.error, &row.value) {
        (Some(message), _) => Cell::new(message).fg(Color::Red),
        (None, Some(value)) => Cell::new(&value.text),
        (None, None) => dim_cell("-"),
    }
}

fn table_cell(title: &str, related: bool) -> Cell {
    if related {
        Cell::new(title).fg(Color::DarkGrey)
    } else {
        Cell::new(title)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
