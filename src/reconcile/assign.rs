use crate::core::geometry::Rect;
use crate::core::model::Word;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Word indices per line, left to right.
    pub per_line: Vec<Vec<usize>>,
    /// Indices of words no line contained.
    pub orphans: Vec<usize>,
}

/// Gives each word to the first line (in the given order) that contains it.
pub fn assign_words(words: &[Word], lines: &[Rect]) -> Assignment {
    let mut used = vec![false; words.len()];
    let mut per_line = Vec::with_capacity(lines.len());

    for line in lines {
        let mut members = Vec::new();
        for (idx, word) in words.iter().enumerate() {
            if used[idx] {
                continue;
            }
            if line.contains(&word.rect()) {
                used[idx] = true;
                members.push(idx);
            }
        }
        // stable: equal x_min keeps encounter order
        members.sort_by_key(|&idx| words[idx].rect().x_min);
        per_line.push(members);
    }

    let orphans = (0..words.len()).filter(|&idx| !used[idx]).collect();

    Assignment { per_line, orphans }
}
