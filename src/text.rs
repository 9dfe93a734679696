//! Sentence and word tokenization.
//!
//! The sentence splitter is rule based: a sentence ends at `.`, `!` or `?`
//! (plus any closing quotes/brackets) when followed by whitespace and the
//! next word does not start in lowercase. A period after a known
//! abbreviation or a single capital initial does not end a sentence.
//! Blank lines always end a sentence.

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "etc", "inc", "ltd", "co",
    "corp", "gov", "sen", "rep", "gen", "col", "lt", "sgt", "capt", "jan", "feb", "mar", "apr",
    "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "no", "fig", "e.g", "i.e", "u.s",
    "u.k", "u.n", "a.m", "p.m",
];

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];

/// Split `text` into trimmed, non-empty sentences.
pub fn tokenize_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for paragraph in split_paragraphs(text) {
        split_paragraph(paragraph, &mut sentences);
    }
    sentences
}

fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n")
        .flat_map(|p| p.split("\r\n\r\n"))
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

fn split_paragraph(paragraph: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (_, c) = chars[i];
        if matches!(c, '.' | '!' | '?') {
            // absorb runs like "?!" or "..." and trailing closers
            let mut j = i + 1;
            while j < chars.len() && (matches!(chars[j].1, '.' | '!' | '?') || CLOSERS.contains(&chars[j].1)) {
                j += 1;
            }
            let at_end = j >= chars.len();
            let followed_by_space = !at_end && chars[j].1.is_whitespace();

            if at_end || (followed_by_space && is_boundary(paragraph, &chars, start, i, j)) {
                let end_byte = if at_end { paragraph.len() } else { chars[j].0 };
                push_sentence(&paragraph[start..end_byte], out);
                start = end_byte;
            }
            i = j;
        } else {
            i += 1;
        }
    }

    if start < paragraph.len() {
        push_sentence(&paragraph[start..], out);
    }
}

fn is_boundary(paragraph: &str, chars: &[(usize, char)], start: usize, punct: usize, after: usize) -> bool {
    // next non-space character decides whether a new sentence starts
    let next = chars[after..].iter().map(|(_, c)| *c).find(|c| !c.is_whitespace());
    if let Some(n) = next {
        if n.is_lowercase() {
            return false;
        }
    }
    if chars[punct].1 != '.' {
        return true;
    }

    let word_start = chars[..punct]
        .iter()
        .rposition(|(_, c)| c.is_whitespace())
        .map(|p| p + 1)
        .unwrap_or(0);
    let word_start_byte = chars.get(word_start).map(|(b, _)| *b).unwrap_or(start).max(start);
    let word = paragraph[word_start_byte..chars[punct].0]
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    if word.chars().count() == 1 && word.chars().all(|c| c.is_alphabetic()) {
        return false;
    }
    !ABBREVIATIONS.contains(&word.as_str())
}

fn push_sentence(raw: &str, out: &mut Vec<String>) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        out.push(sentence);
    }
}

/// Lowercased word tokens with surrounding punctuation stripped.
pub fn tokenize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}
