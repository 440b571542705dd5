//! Rendered-vs-reference classification.

use crate::normalize::HtmlFormatter;
use crate::reference::ReferenceFileSet;
use crate::render::RenderedPage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    ExactMatch,
    /// Equal once both sides went through the formatter.
    FormattedMatch,
    Mismatch(Mismatch),
}

/// Both sides of a failed comparison, raw and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: Vec<u8>,
    pub got: Vec<u8>,
    pub expected_formatted: Vec<u8>,
    pub got_formatted: Vec<u8>,
}

/// Result of looking a rendered page up in the reference set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// No reference file ends with the rendered name; the page cannot be verified.
    ReferenceMissing,
    Compared {
        reference_name: String,
        outcome: ComparisonOutcome,
    },
}

pub struct Comparator<'a, F: HtmlFormatter + ?Sized> {
    references: &'a ReferenceFileSet,
    formatter: &'a F,
}

impl<'a, F: HtmlFormatter + ?Sized> Comparator<'a, F> {
    pub fn new(references: &'a ReferenceFileSet, formatter: &'a F) -> Self {
        Self {
            references,
            formatter,
        }
    }

    pub fn compare(&self, page: &RenderedPage) -> Comparison {
        let Some((reference_name, expected)) = self.references.find_by_suffix(&page.file_name)
        else {
            return Comparison::ReferenceMissing;
        };
        Comparison::Compared {
            reference_name: reference_name.to_string(),
            outcome: classify(expected, &page.html, self.formatter),
        }
    }
}

pub fn classify<F: HtmlFormatter + ?Sized>(
    expected: &[u8],
    got: &[u8],
    formatter: &F,
) -> ComparisonOutcome {
    if expected == got {
        return ComparisonOutcome::ExactMatch;
    }
    let expected_formatted = formatter.format(expected);
    let got_formatted = formatter.format(got);
    if expected_formatted == got_formatted {
        return ComparisonOutcome::FormattedMatch;
    }
    ComparisonOutcome::Mismatch(Mismatch {
        expected: expected.to_vec(),
        got: got.to_vec(),
        expected_formatted,
        got_formatted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PrettyHtml;

    fn rendered(name: &str, html: &str) -> RenderedPage {
        RenderedPage {
            file_name: name.to_string(),
            html: html.as_bytes().to_vec(),
            sub_pages: Vec::new(),
        }
    }

    #[test]
    fn identical_bytes_are_an_exact_match() {
        let outcome = classify(b"<p>a</p>", b"<p>a</p>", &PrettyHtml);
        assert_eq!(outcome, ComparisonOutcome::ExactMatch);
    }

    #[test]
    fn whitespace_and_attribute_order_are_a_formatted_match() {
        let outcome = classify(
            br#"<div class="a" id="b"><p>x  y</p></div>"#,
            b"<div id=\"b\" class=\"a\">\n<p>x\ny</p>\n</div>",
            &PrettyHtml,
        );
        assert_eq!(outcome, ComparisonOutcome::FormattedMatch);
    }

    #[test]
    fn content_changes_are_a_mismatch_with_both_sides() {
        let outcome = classify(b"<p>a</p>", b"<p>b</p>", &PrettyHtml);
        let ComparisonOutcome::Mismatch(mismatch) = outcome else {
            panic!("expected mismatch");
        };
        assert_eq!(mismatch.expected, b"<p>a</p>");
        assert_eq!(mismatch.got, b"<p>b</p>");
        assert_ne!(mismatch.expected_formatted, mismatch.got_formatted);
    }

    #[test]
    fn comparator_reports_missing_reference() {
        let refs = ReferenceFileSet::from_files([("Other 1.html", b"x".to_vec())]);
        let comparator = Comparator::new(&refs, &PrettyHtml);
        assert_eq!(
            comparator.compare(&rendered("Page 2.html", "x")),
            Comparison::ReferenceMissing
        );
    }

    #[test]
    fn comparator_matches_nested_reference_by_suffix() {
        let refs = ReferenceFileSet::from_files([("Root/Page 2.html", b"<p>x</p>".to_vec())]);
        let comparator = Comparator::new(&refs, &PrettyHtml);
        match comparator.compare(&rendered("Page 2.html", "<p>x</p>")) {
            Comparison::Compared {
                reference_name,
                outcome,
            } => {
                assert_eq!(reference_name, "Root/Page 2.html");
                assert_eq!(outcome, ComparisonOutcome::ExactMatch);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }
}
