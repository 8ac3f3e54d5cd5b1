//! Text rendering utilities for human-friendly output.
//!
//! Cycle chains, short type names, the instantiation plan, DOT export
//! and "did you mean" suggestions.

use std::fmt::Write;

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use tarkib_support::rendering::render_chain;
///
/// let cycle = ["Scheduler", "Clock", "Scheduler"];
/// assert_eq!(render_chain(&cycle), "Scheduler → Clock → Scheduler");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders an instantiation plan with scope annotations.
///
/// ```text
/// [singleton] SystemClock
///             ↓
/// [singleton] Scheduler  (post-construct)
/// ```
pub fn render_plan(entries: &[PlanEntry]) -> String {
    let mut result = String::new();
    let max_scope_len = entries
        .iter()
        .map(|e| e.scope.len())
        .max()
        .unwrap_or(0);

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            result.push_str(&" ".repeat(max_scope_len + 3));
            result.push_str("↓\n");
        }

        let _ = write!(
            result,
            "[{:<width$}] {}",
            entry.scope,
            entry.type_name,
            width = max_scope_len,
        );

        if entry.has_post_construct {
            result.push_str("  (post-construct)");
        }

        result.push('\n');
    }

    result
}

/// An entry in an instantiation plan.
#[derive(Debug)]
pub struct PlanEntry {
    /// The type name
    pub type_name: String,
    /// The scope marker (e.g., "Singleton")
    pub scope: String,
    /// Whether a post-construct hook runs after this entry
    pub has_post_construct: bool,
}

/// Renders a directed graph in the Graphviz DOT format.
///
/// Vertex ids are the names with every non-alphanumeric character
/// replaced by `_`; labels keep the full name. Edges are index pairs
/// into `vertices`; out-of-range pairs are skipped.
///
/// ```
/// use tarkib_support::rendering::render_dot;
///
/// let dot = render_dot(&["app::Repo", "app::Service"], &[(0, 1)]);
/// assert!(dot.starts_with("digraph G {"));
/// assert!(dot.contains("app__Repo [ label=\"app::Repo\" ];"));
/// assert!(dot.contains("app__Repo -> app__Service;"));
/// ```
pub fn render_dot(vertices: &[impl AsRef<str>], edges: &[(usize, usize)]) -> String {
    let ids: Vec<String> = vertices.iter().map(|v| dot_id(v.as_ref())).collect();

    let mut out = String::from("digraph G {\n");
    for (id, vertex) in ids.iter().zip(vertices) {
        let label = vertex.as_ref().replace('"', "\\\"");
        let _ = writeln!(out, "  {id} [ label=\"{label}\" ];");
    }
    for &(from, to) in edges {
        if let (Some(from), Some(to)) = (ids.get(from), ids.get(to)) {
            let _ = writeln!(out, "  {from} -> {to};");
        }
    }
    out.push_str("}\n");
    out
}

fn dot_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Drops module paths from every path inside a type name.
///
/// ```
/// use tarkib_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::clock::SystemClock"), "SystemClock");
/// assert_eq!(
///     shorten_type_name("alloc::vec::Vec<alloc::sync::Arc<dyn app::Source>>"),
///     "Vec<Arc<dyn Source>>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut short = String::with_capacity(full_name.len());
    // Start of the path segment being copied, as a byte offset in `short`.
    let mut segment_start = 0;
    let mut rest = full_name;

    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("::") {
            short.truncate(segment_start);
            rest = after;
            continue;
        }
        short.push(ch);
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';') {
            segment_start = short.len();
        }
        rest = &rest[ch.len_utf8()..];
    }

    short
}

/// Picks up to `limit` names from `available` that look like `requested`.
///
/// Names containing one another (full or shortened, case-insensitive)
/// rank first, then names sharing a prefix of at least three characters
/// with the requested short name. The exact name is never suggested.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted = Needle::new(requested);

    let mut ranked: Vec<(usize, &str)> = available
        .iter()
        .copied()
        .filter(|name| *name != requested)
        .filter_map(|name| wanted.score(&Needle::new(name)).map(|score| (score, name)))
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.truncate(limit);
    ranked.into_iter().map(|(_, name)| name.to_string()).collect()
}

/// Lower-cased full and short forms of a type name.
struct Needle {
    full: String,
    short: String,
}

impl Needle {
    fn new(name: &str) -> Self {
        Self {
            full: name.to_lowercase(),
            short: shorten_type_name(name).to_lowercase(),
        }
    }

    fn score(&self, other: &Needle) -> Option<usize> {
        let overlaps = |a: &str, b: &str| a.contains(b) || b.contains(a);
        if overlaps(&self.full, &other.full) {
            return Some(100);
        }
        if overlaps(&self.short, &other.short) {
            return Some(80);
        }

        let shared = self
            .short
            .chars()
            .zip(other.short.chars())
            .take_while(|(a, b)| a == b)
            .count();
        (shared >= 3).then_some(shared * 10)
    }
}
