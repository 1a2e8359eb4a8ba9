use crate::ingest::IngestSummary;
use crate::relation::Node;
use crate::storage::{Backend, StoreStats};
use crate::ui::theme::paint;
use crate::ui::{theme, Icons, Theme};

pub fn banner(text: &str) {
    println!("{} {}", Icons::ROCKET, paint(text, &theme().accent));
}

pub fn done(text: &str) {
    println!("{} {}", Icons::CHECK, paint(text, &theme().ok));
}

pub fn caution(text: &str) {
    eprintln!("{} {}", Icons::WARN, paint(text, &theme().caution));
}

fn field(t: &Theme, label: &str, value: &str) -> String {
    format!("  {} {}", paint(&format!("{label:<18}"), &t.muted), value)
}

/// Child IDs of `parent`, one per line, or a note that there are none.
pub fn children_list(t: &Theme, parent: &str, rel_type: &str, children: &[String]) -> String {
    let parent = paint(parent, &t.id);
    if children.is_empty() {
        return format!("{} No {} children of {}.", Icons::EMPTY, rel_type, parent);
    }

    let mut out = format!(
        "{} {} {} children of {}:",
        Icons::THREAD,
        children.len(),
        paint(rel_type, &t.accent),
        parent
    );
    for child in children {
        out.push_str(&format!("\n  - {}", paint(child, &t.id)));
    }
    out
}

pub fn node_card(t: &Theme, event_id: &str, node: Option<&Node>) -> String {
    match node {
        Some(node) => [
            format!("{} {}", Icons::THREAD, paint(&node.event_id, &t.accent)),
            field(t, "room", &paint(&node.room_id, &t.id)),
            field(t, "origin_server_ts", &node.origin_server_ts.to_string()),
        ]
        .join("\n"),
        None => format!("{} No metadata recorded for {}.", Icons::EMPTY, paint(event_id, &t.id)),
    }
}

pub fn stats_block(t: &Theme, backend: Backend, location: &str, stats: &StoreStats) -> String {
    [
        format!("{} {}", Icons::STATS, paint("Relstore Statistics", &t.accent)),
        field(t, "backend", backend.as_str()),
        field(t, "database", location),
        field(t, "edges", &stats.edges.to_string()),
        field(t, "nodes", &stats.nodes.to_string()),
    ]
    .join("\n")
}

pub fn ingest_report(t: &Theme, summary: &IngestSummary) -> String {
    let mut lines = vec![
        paint("Ingest Summary", &t.accent),
        field(t, "events", &summary.events.to_string()),
        field(t, "relations", &summary.relations.to_string()),
    ];
    if summary.invalid > 0 {
        lines.push(field(t, "invalid lines", &paint(&summary.invalid.to_string(), &t.caution)));
    }
    if summary.failed > 0 {
        lines.push(field(t, "failed writes", &paint(&summary.failed.to_string(), &t.caution)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_list() {
        let t = Theme::plain();
        let children = vec!["$b".to_string(), "$c".to_string()];

        let text = children_list(&t, "$a", "m.reference", &children);
        assert_eq!(text.lines().next(), Some(format!("{} 2 m.reference children of $a:", Icons::THREAD).as_str()));
        assert!(text.contains("  - $b\n  - $c"));

        let empty = children_list(&t, "$a", "m.reply", &[]);
        assert_eq!(empty, format!("{} No m.reply children of $a.", Icons::EMPTY));
    }

    #[test]
    fn test_node_card() {
        let t = Theme::plain();
        let node = Node {
            event_id: "$b".into(),
            origin_server_ts: 1_700_000_000_000,
            room_id: "!room:example.org".into(),
        };

        let card = node_card(&t, "$b", Some(&node));
        assert!(card.contains("!room:example.org"));
        assert!(card.contains("1700000000000"));
        assert!(node_card(&t, "$missing", None).contains("No metadata recorded for $missing."));
    }

    #[test]
    fn test_ingest_report_hides_zero_problem_counts() {
        let t = Theme::plain();
        let clean = IngestSummary { events: 3, relations: 2, invalid: 0, failed: 0 };
        assert!(!ingest_report(&t, &clean).contains("invalid lines"));

        let noisy = IngestSummary { invalid: 1, failed: 2, ..clean };
        let report = ingest_report(&t, &noisy);
        assert!(report.contains("invalid lines"));
        assert!(report.contains("failed writes"));
    }

    #[test]
    fn test_plain_theme_has_no_escape_codes() {
        let t = Theme::plain();
        let block = stats_block(&t, Backend::Sqlite, "file:relstore.db", &StoreStats { edges: 4, nodes: 3 });
        assert!(!block.contains('\u{1b}'));
        assert!(block.contains("sqlite"));
    }
}
