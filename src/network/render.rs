//! Text rendering of a region view into an analyst-readable summary.

use std::collections::BTreeMap;

use itertools::Itertools;

use super::model::{AttrValue, Record, FROM_NODE, TO_NODE};
use super::region::RegionView;

/// Render a region as a markdown-like summary: node and edge tables plus the
/// aggregate power balance (positive = exporting, negative = importing).
pub fn render(view: &RegionView) -> String {
    let mut out = Vec::new();
    out.push(format!("# Analysis Region {}\n", view.region_id));

    out.push("## Nodes within Region".to_string());
    if view.nodes.is_empty() {
        out.push("No nodes in this region.\n".to_string());
    } else {
        out.push(table(&view.nodes, &[]));
        out.push(format!("\nTotal Nodes: {}\n", view.nodes.len()));
    }

    out.push("## Connected Edges".to_string());
    if view.edges.is_empty() {
        out.push("No edges connected.\n".to_string());
    } else {
        let rows: BTreeMap<i64, Record> = view
            .edges
            .iter()
            .map(|(id, e)| {
                let mut r = e.record.clone();
                r.insert("is_boundary".to_string(), AttrValue::Bool(e.is_boundary));
                (*id, r)
            })
            .collect();
        out.push(table(&rows, &[FROM_NODE, TO_NODE]));
        out.push(format!(
            "\nTotal Edges: {} (Boundary edges: {})\n",
            view.edges.len(),
            view.boundary_edge_count()
        ));
    }

    out.push("## Power Balance".to_string());
    out.push(format!("- Total Load: {:.2} MW", view.total_load_mw()));
    out.push(format!(
        "- Total Generation: {:.2} MW",
        view.total_generation_mw()
    ));
    out.push(format!(
        "- Net Balance: {:.2} MW (Positive = Exporting, Negative = Importing)",
        view.net_balance_mw()
    ));

    out.join("\n")
}

/// Pipe table over the union of columns, `first` columns leading, the rest in
/// name order.
fn table(rows: &BTreeMap<i64, Record>, first: &[&str]) -> String {
    let mut columns: Vec<String> = first.iter().map(|c| c.to_string()).collect();
    let rest: Vec<String> = rows
        .values()
        .flat_map(|r| r.keys())
        .filter(|c| !first.contains(&c.as_str()))
        .unique()
        .cloned()
        .sorted()
        .collect();
    columns.extend(rest);

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| id | {} |", columns.iter().join(" | ")));
    lines.push(format!("|---|{}|", columns.iter().map(|_| "---").join("|")));
    for (id, record) in rows {
        let cells = columns
            .iter()
            .map(|c| {
                record
                    .get(c)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string())
            })
            .join(" | ");
        lines.push(format!("| {id} | {cells} |"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{catalog, partition, KMeans, RegionView};

    fn view() -> RegionView {
        let mut model = catalog::load_case("mini9").unwrap();
        partition(&mut model, 3, &KMeans::new(42)).unwrap();
        RegionView::extract(&model, 0)
    }

    #[test]
    fn summary_carries_balance_with_sign_convention() {
        let rendered = render(&view());
        assert!(rendered.contains("# Analysis Region 0"));
        assert!(rendered.contains("## Power Balance"));
        assert!(rendered.contains("Positive = Exporting, Negative = Importing"));
    }

    #[test]
    fn edge_table_includes_boundary_flag() {
        let rendered = render(&view());
        assert!(rendered.contains("is_boundary"));
        assert!(rendered.contains(FROM_NODE));
    }

    #[test]
    fn empty_region_renders_without_tables() {
        let model = catalog::load_case("mini9").unwrap();
        // No partitioning: nothing is labeled, region 5 is empty.
        let view = RegionView::extract(&model, 5);
        let rendered = render(&view);
        assert!(rendered.contains("No nodes in this region."));
        assert!(rendered.contains("No edges connected."));
        assert!(rendered.contains("- Total Load: 0.00 MW"));
    }
}
