use dom::{Document, NodeKey, SelectorList, inner_html, outline};

pub mod scenario;

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    use std::fmt::Write;
    let missing = "<missing>";
    let mismatch = (0..max).find(|&i| expected.get(i) != actual.get(i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for line_idx in start..end {
            let left = expected
                .get(line_idx)
                .map(String::as_str)
                .unwrap_or(missing);
            let right = actual.get(line_idx).map(String::as_str).unwrap_or(missing);
            let marker = if line_idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line_idx + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line_idx + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

/// Element matching `selector` at position `index` (document order).
pub fn select_nth(doc: &Document, selector: &str, index: usize) -> Option<NodeKey> {
    let list = SelectorList::parse(selector).ok()?;
    doc.query_selector_all(doc.root(), &list).get(index).copied()
}

/// Assert that the inner markup of the selected element equals `expected`,
/// printing the document outline on failure.
#[track_caller]
pub fn assert_inner_html(doc: &Document, selector: &str, index: usize, expected: &str) {
    let Some(node) = select_nth(doc, selector, index) else {
        panic!(
            "no element #{index} for {selector}\n{}",
            outline(doc, doc.root(), 200).join("\n")
        );
    };
    let actual = inner_html(doc, node);
    if actual != expected {
        let split = |s: &str| s.split('<').map(str::to_string).collect::<Vec<_>>();
        panic!(
            "inner html mismatch for {selector}[{index}]\n{}",
            diff_lines(&split(expected), &split(&actual))
        );
    }
}
