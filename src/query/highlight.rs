//! Headline generation for search results

use std::collections::BTreeSet;

use crate::config::HighlightOptions;
use crate::tokenizer::{Tokenizer, WordUnit};

/// Builds marked-up excerpts of document content from matched positions
pub struct Highlighter<'a> {
    tokenizer: &'a Tokenizer,
}

impl<'a> Highlighter<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Render a headline for `content`, marking the words at `positions`.
    ///
    /// Positions refer to the word units produced by the tokenizer for the
    /// same content, so they line up with the positions stored in postings.
    pub fn highlight(&self, content: &str, positions: &[u32], options: &HighlightOptions) -> String {
        let units = self.tokenizer.segment(content);
        if units.is_empty() {
            return String::new();
        }
        let matched: BTreeSet<u32> = positions.iter().copied().collect();

        if options.highlight_all {
            return render(content, &units, 0, units.len() - 1, &matched, options, true);
        }

        let flags: Vec<bool> = units.iter().map(|u| matched.contains(&u.position)).collect();
        if !flags.iter().any(|f| *f) {
            let words = if options.min_words > 0 {
                options.min_words
            } else {
                options.max_words
            };
            let last = words.clamp(1, units.len()) - 1;
            return render(content, &units, 0, last, &matched, options, false);
        }

        let fragments = choose_fragments(&flags, options);
        fragments
            .into_iter()
            .map(|(first, last)| render(content, &units, first, last, &matched, options, false))
            .collect::<Vec<_>>()
            .join(&options.fragment_delimiter)
    }
}

/// Pick up to `max_fragments` non-overlapping windows around the densest
/// clusters of matches, returned in document order.
fn choose_fragments(flags: &[bool], options: &HighlightOptions) -> Vec<(usize, usize)> {
    let n = flags.len();
    let window = options.max_words.min(n).max(1);
    let wanted = options.max_fragments.max(1);

    let mut prefix = vec![0usize; n + 1];
    for (i, flag) in flags.iter().enumerate() {
        prefix[i + 1] = prefix[i] + usize::from(*flag);
    }

    let mut taken = vec![false; n];
    let mut chosen: Vec<(usize, usize)> = Vec::new();
    while chosen.len() < wanted {
        // earliest window with the most matches not yet covered
        let mut best: Option<(usize, usize)> = None;
        for start in 0..=(n - window) {
            let end = start + window;
            if taken[start..end].iter().any(|t| *t) {
                continue;
            }
            let hits = prefix[end] - prefix[start];
            if hits > 0 && best.map(|(_, h)| hits > h).unwrap_or(true) {
                best = Some((start, hits));
            }
        }
        let Some((start, _)) = best else {
            break;
        };

        let (first, last) = fit_fragment(flags, start, start + window - 1, options.min_words, &taken);
        taken[first..=last].iter_mut().for_each(|t| *t = true);
        chosen.push((first, last));
    }

    chosen.sort_unstable();
    chosen
}

/// Tighten a window to its matches, then grow it back to `min_words`
fn fit_fragment(
    flags: &[bool],
    start: usize,
    end: usize,
    min_words: usize,
    taken: &[bool],
) -> (usize, usize) {
    let mut first = start;
    let mut last = end;
    while first < last && !flags[first] {
        first += 1;
    }
    while last > first && !flags[last] {
        last -= 1;
    }

    let mut grow_left = true;
    while last - first + 1 < min_words {
        let can_left = first > 0 && !taken[first - 1];
        let can_right = last + 1 < flags.len() && !taken[last + 1];
        match (can_left, can_right) {
            (false, false) => break,
            (true, false) => first -= 1,
            (false, true) => last += 1,
            (true, true) => {
                if grow_left {
                    first -= 1;
                } else {
                    last += 1;
                }
                grow_left = !grow_left;
            }
        }
    }
    (first, last)
}

fn render(
    content: &str,
    units: &[WordUnit<'_>],
    first: usize,
    last: usize,
    matched: &BTreeSet<u32>,
    options: &HighlightOptions,
    whole: bool,
) -> String {
    let from = if whole { 0 } else { units[first].start };
    let to = if whole { content.len() } else { units[last].end };

    let mut out = String::with_capacity(to - from + 16);
    let mut cursor = from;
    for unit in &units[first..=last] {
        out.push_str(&content[cursor..unit.start]);
        if matched.contains(&unit.position) {
            out.push_str(&options.start_sel);
            out.push_str(unit.text);
            out.push_str(&options.stop_sel);
        } else {
            out.push_str(unit.text);
        }
        cursor = unit.end;
    }
    out.push_str(&content[cursor..to]);
    out
}
