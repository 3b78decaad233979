//! Citation text

const CITATION_BIB: &str = include_str!("../data/citation.bib");

/// BibTeX entries to cite, without the trailing newline.
///
/// With `oneline`, the lines are concatenated with no separator.
pub fn citation(oneline: bool) -> String {
    let data = CITATION_BIB.trim();
    if oneline {
        data.lines().collect()
    } else {
        data.to_string()
    }
}
