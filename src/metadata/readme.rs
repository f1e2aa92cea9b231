//! Readme display cleanup

/// Lines at the top of a readme that count as its header block
pub const HEADER_REGION_LINES: usize = 40;

/// Header labels already shown elsewhere in the detail view
const REDUNDANT_HEADERS: &[&str] = &[
    "contributors",
    "donate link",
    "tags",
    "requires at least",
    "tested up to",
    "stable tag",
    "requires php",
    "license",
    "license uri",
];

/// Drop redundant `Label: value` lines from the header region of a readme.
///
/// Only the first [`HEADER_REGION_LINES`] lines are inspected; everything
/// after them is kept verbatim.
pub fn strip_header_lines(readme: &str) -> String {
    readme
        .split('\n')
        .enumerate()
        .filter(|(index, line)| *index >= HEADER_REGION_LINES || !is_redundant_header(line))
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_redundant_header(line: &str) -> bool {
    let lower = line.trim_start().to_lowercase();
    REDUNDANT_HEADERS.iter().any(|header| {
        lower
            .strip_prefix(header)
            .is_some_and(|rest| rest.starts_with(':'))
    })
}
