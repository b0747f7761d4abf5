//! CQL filter composition.

/// Join filter expressions with `AND`.
///
/// Empty parts are skipped. With more than one part each is parenthesized so
/// `OR` inside a part keeps its meaning. Returns `None` when nothing is left.
pub fn combine_cql<I, S>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.into_iter().next(),
        _ => Some(
            parts
                .iter()
                .map(|p| format!("({})", p))
                .collect::<Vec<_>>()
                .join(" AND "),
        ),
    }
}
