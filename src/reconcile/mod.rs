pub mod assign;

use tracing::{debug, warn};

use crate::core::error::ReconcileError;
use crate::core::geometry::Rect;
use crate::core::model::{AltoString, ReconcileSummary, TextLine, Word};

pub trait Reconciler {
    fn reconcile(
        &self,
        words: &[Word],
        lines: &mut [TextLine],
    ) -> Result<ReconcileSummary, ReconcileError>;
}

/// Places each word into the first line whose box fully contains it.
///
/// Lines are visited in document order, so with overlapping lines the
/// earlier one takes the word. Line geometry is never modified; only the
/// `strings` of each line are replaced.
#[derive(Debug, Default)]
pub struct ContainmentReconciler;

impl ContainmentReconciler {
    pub fn new() -> Self {
        Self
    }
}

impl Reconciler for ContainmentReconciler {
    fn reconcile(
        &self,
        words: &[Word],
        lines: &mut [TextLine],
    ) -> Result<ReconcileSummary, ReconcileError> {
        if lines.is_empty() {
            return Err(ReconcileError::NotSegmented);
        }

        // all rects up front: a malformed line must leave every line untouched
        let rects = lines
            .iter()
            .map(TextLine::rect)
            .collect::<Result<Vec<Rect>, _>>()?;

        let assignment = assign::assign_words(words, &rects);

        let mut summary = ReconcileSummary {
            lines: lines.len(),
            orphan_words: assignment.orphans.len(),
            ..Default::default()
        };
        for (line, members) in lines.iter_mut().zip(assignment.per_line) {
            if !members.is_empty() {
                summary.filled_lines += 1;
            }
            summary.assigned_words += members.len();
            line.strings = members
                .into_iter()
                .map(|idx| AltoString::from_word(&words[idx]))
                .collect();
        }

        if summary.orphan_words > 0 {
            warn!(
                orphans = summary.orphan_words,
                "some words fall outside every segmented line"
            );
        }
        debug!(?summary, "reconciled page");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Point, Quad};
    use crate::core::model::LineGeometry;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x0: i64, y0: i64, x1: i64, y1: i64) -> Word {
        let quad = Quad::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]);
        Word::new(text, quad).unwrap()
    }

    fn line(id: &str, position: usize, hpos: i64, vpos: i64, width: i64, height: i64) -> TextLine {
        TextLine {
            id: Some(id.to_string()),
            position,
            geometry: LineGeometry::new(
                &hpos.to_string(),
                &vpos.to_string(),
                &width.to_string(),
                &height.to_string(),
            ),
            strings: vec![AltoString {
                content: "stale".to_string(),
                rect: Rect::new(0, 0, 1, 1),
            }],
        }
    }

    fn contents(line: &TextLine) -> Vec<&str> {
        line.strings.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn fills_line_in_reading_order() {
        let words = vec![
            word("World", 60, 12, 100, 28),
            word("Out", 5, 12, 40, 28),
            word("Hello", 15, 12, 50, 28),
        ];
        let mut lines = vec![line("l1", 1, 10, 10, 100, 20)];
        let summary = ContainmentReconciler::new()
            .reconcile(&words, &mut lines)
            .unwrap();

        assert_eq!(contents(&lines[0]), vec!["Hello", "World"]);
        assert_eq!(lines[0].strings[0].rect, Rect::new(15, 12, 50, 28));
        assert_eq!(
            summary,
            ReconcileSummary {
                lines: 1,
                filled_lines: 1,
                assigned_words: 2,
                orphan_words: 1,
            }
        );
    }

    #[test]
    fn overlapping_lines_first_wins() {
        let words = vec![word("X", 20, 15, 30, 25)];
        let mut lines = vec![line("A", 1, 10, 10, 100, 20), line("B", 2, 10, 12, 100, 20)];
        ContainmentReconciler::new()
            .reconcile(&words, &mut lines)
            .unwrap();
        assert_eq!(contents(&lines[0]), vec!["X"]);
        assert!(lines[1].strings.is_empty());
    }

    #[test]
    fn empty_line_clears_previous_strings() {
        let mut lines = vec![line("l1", 1, 10, 10, 100, 20)];
        let summary = ContainmentReconciler::new()
            .reconcile(&[], &mut lines)
            .unwrap();
        assert!(lines[0].strings.is_empty());
        assert_eq!(summary.filled_lines, 0);
    }

    #[test]
    fn no_lines_is_not_segmented() {
        let words = vec![word("X", 0, 0, 1, 1)];
        let result = ContainmentReconciler::new().reconcile(&words, &mut []);
        assert_eq!(result, Err(ReconcileError::NotSegmented));
    }

    #[test]
    fn malformed_line_leaves_layout_untouched() {
        let words = vec![word("Hello", 15, 12, 50, 28)];
        let mut broken = line("l2", 2, 10, 40, 100, 20);
        broken.geometry.width = Some("wide".to_string());
        let mut lines = vec![line("l1", 1, 10, 10, 100, 20), broken];
        let before = lines.clone();

        let result = ContainmentReconciler::new().reconcile(&words, &mut lines);
        assert!(matches!(
            result,
            Err(ReconcileError::MalformedLayout { ref line, attribute: "WIDTH", .. }) if line == "l2"
        ));
        assert_eq!(lines, before);
    }

    #[test]
    fn geometry_is_never_modified() {
        let words = vec![word("Hello", 15, 12, 50, 28), word("big", 0, 0, 500, 500)];
        let mut lines = vec![line("l1", 1, 10, 10, 100, 20), line("l2", 2, 10, 40, 100, 20)];
        let geometry: Vec<_> = lines.iter().map(|l| l.geometry.clone()).collect();
        ContainmentReconciler::new()
            .reconcile(&words, &mut lines)
            .unwrap();
        let after: Vec<_> = lines.iter().map(|l| l.geometry.clone()).collect();
        assert_eq!(after, geometry);
    }
}
