//! Paragraph-packing segmentation with overlap carry.
//!
//! Two passes over normalized text: greedy paragraph packing up to a
//! nominal chunk size, then fixed-width window splitting for any chunk
//! that still exceeds 1.5x the nominal size (a single paragraph larger
//! than the nominal size cannot be split by the first pass).

use juris_core::SegmentConfig;
use tracing::debug;

/// Segment normalized text into bounded, overlapping passages.
///
/// Every returned passage is longer than `min_fragment_chars` and at
/// most 1.5x `chunk_chars`. Each passage after the first begins with
/// the final `overlap_chars` characters of its predecessor (paragraph
/// path) or shares an `overlap_chars` prefix with the previous window
/// (oversize path). Pure and deterministic; all lengths are counted in
/// characters, not bytes.
pub fn segment(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut chunks = Vec::new();

    for candidate in pack_paragraphs(text, config) {
        if char_len(&candidate) <= config.max_chunk_chars() {
            chunks.push(candidate);
        } else {
            chunks.extend(split_windows(&candidate, config));
        }
    }

    chunks.retain(|c| char_len(c) > config.min_fragment_chars);
    debug!(
        "Segmented {} chars into {} passages",
        char_len(text),
        chunks.len()
    );
    chunks
}

/// Split text on blank-line boundaries, discarding whitespace-only
/// paragraphs.
///
/// A boundary is a whitespace run containing at least two newlines. The
/// split consumes from the first through the last newline of the run:
/// horizontal whitespace before the first newline stays with the left
/// paragraph, horizontal whitespace after the last newline with the
/// right one.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if c != '\n' {
            continue;
        }

        // Walk the whitespace run starting at this newline, remembering
        // where the last newline in the run ends.
        let mut newlines = 1;
        let mut after_last_newline = i + 1;
        while let Some(&(j, d)) = iter.peek() {
            if !d.is_whitespace() {
                break;
            }
            iter.next();
            if d == '\n' {
                newlines += 1;
                after_last_newline = j + 1;
            }
        }

        if newlines >= 2 {
            paragraphs.push(&text[start..i]);
            start = after_last_newline;
        }
    }

    paragraphs.push(&text[start..]);
    paragraphs.retain(|p| !p.trim().is_empty());
    paragraphs
}

/// Greedily pack paragraphs into chunks of roughly the nominal size.
///
/// The overflow test compares accumulator length plus paragraph length
/// against the nominal size; the paragraph separator is not counted, so
/// a packed chunk can exceed the nominal size by its separators. On
/// overflow the accumulator is emitted trimmed, and reseeded with the
/// last `overlap_chars` characters of the emitted chunk.
fn pack_paragraphs(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in split_paragraphs(text) {
        let would_be = char_len(&current) + char_len(paragraph);

        if would_be > config.chunk_chars && !current.is_empty() {
            let completed = current.trim().to_string();
            current = char_tail(&completed, config.overlap_chars).to_string();
            current.push_str("\n\n");
            current.push_str(paragraph);
            chunks.push(completed);
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
    }

    let tail = current.trim();
    if char_len(tail) > config.min_fragment_chars {
        chunks.push(tail.to_string());
    }

    chunks
}

/// Force-split an oversized chunk into fixed-width overlapping windows.
///
/// Windows are exactly `chunk_chars` long (the last may be shorter) and
/// the start advances by `chunk_chars - overlap_chars`, clamped to at
/// least 1 so a misconfigured overlap cannot stall the walk.
fn split_windows(chunk: &str, config: &SegmentConfig) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    let step = config
        .chunk_chars
        .saturating_sub(config.overlap_chars)
        .max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.chunk_chars).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        start += step;
    }

    windows
}

/// The last `n` characters of `s`, or all of `s` if shorter.
fn char_tail(s: &str, n: usize) -> &str {
    let skip = char_len(s).saturating_sub(n);
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SegmentConfig {
        SegmentConfig::default()
    }

    /// A paragraph of `n` copies of one letter.
    fn para(letter: char, n: usize) -> String {
        letter.to_string().repeat(n)
    }

    #[test]
    fn test_paragraph_split_boundaries() {
        assert_eq!(split_paragraphs("a\n\nb"), vec!["a", "b"]);
        // Horizontal whitespace inside the run still splits.
        assert_eq!(split_paragraphs("a\n \nb"), vec!["a", "b"]);
        // Whitespace before the first newline stays left, after the
        // last newline stays right.
        assert_eq!(split_paragraphs("a \n\nb"), vec!["a ", "b"]);
        assert_eq!(split_paragraphs("a\n\n\n b"), vec!["a", " b"]);
        // A single newline is not a paragraph break.
        assert_eq!(split_paragraphs("a\nb"), vec!["a\nb"]);
        // Whitespace-only paragraphs are discarded.
        assert_eq!(split_paragraphs("a\n\n \n\nb"), vec!["a", "b"]);
        assert!(split_paragraphs("").is_empty());
    }

    #[test]
    fn test_greedy_boundaries_500_900_400() {
        let text = format!("{}\n\n{}\n\n{}", para('a', 500), para('b', 900), para('c', 400));
        let chunks = segment(&text, &config());

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], para('a', 500));
        // 150-char tail of chunk 1, separator, second paragraph.
        assert_eq!(chunks[1], format!("{}\n\n{}", para('a', 150), para('b', 900)));
        assert_eq!(chunks[1].chars().count(), 1052);
        // 150-char tail of chunk 2 is all 'b'.
        assert_eq!(chunks[2], format!("{}\n\n{}", para('b', 150), para('c', 400)));
        assert_eq!(chunks[2].chars().count(), 552);
    }

    #[test]
    fn test_overlap_prefix_property() {
        let text = format!(
            "{}\n\n{}\n\n{}\n\n{}",
            para('a', 600),
            para('b', 600),
            para('c', 600),
            para('d', 600)
        );
        let cfg = SegmentConfig {
            chunk_chars: 700,
            overlap_chars: 100,
            min_fragment_chars: 50,
        };
        let chunks = segment(&text, &cfg);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail = char_tail(&pair[0], cfg.overlap_chars);
            assert!(
                pair[1].starts_with(tail),
                "chunk does not begin with its predecessor's tail"
            );
        }
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            para('a', 600),
            para('b', 600),
            para('c', 600)
        );
        let cfg = SegmentConfig {
            chunk_chars: 700,
            overlap_chars: 100,
            min_fragment_chars: 50,
        };
        let chunks = segment(&text, &cfg);
        assert_eq!(chunks.len(), 3);

        // Drop each successor's duplicated prefix (overlap + separator)
        // and rejoin: the normalized source comes back.
        let overlap_and_sep = cfg.overlap_chars + 2;
        let mut parts = vec![chunks[0].clone()];
        for chunk in &chunks[1..] {
            parts.push(chunk.chars().skip(overlap_and_sep).collect());
        }
        assert_eq!(parts.join("\n\n"), text);
    }

    #[test]
    fn test_window_split_3000() {
        let source: String = (0..3000)
            .map(|i| (b'a' + (i % 26) as u8) as char)
            .collect();
        let chunks = segment(&source, &config());

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], source[0..1200]);
        assert_eq!(chunks[1], source[1050..2250]);
        assert_eq!(chunks[2], source[2100..3000]);
    }

    #[test]
    fn test_chunk_bounds_property() {
        let mut text = String::new();
        for i in 0..40 {
            let letter = (b'a' + (i % 26) as u8) as char;
            text.push_str(&para(letter, 37 * (i as usize % 70) + 8));
            text.push_str("\n\n");
        }
        let cfg = config();
        let chunks = segment(&text, &cfg);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            let len = chunk.chars().count();
            assert!(len > cfg.min_fragment_chars);
            assert!(len <= cfg.max_chunk_chars());
        }
    }

    #[test]
    fn test_separator_not_counted_when_packing() {
        // 60 + 40 = 100 does not exceed the nominal size, so both
        // paragraphs pack into one chunk of 102 chars with the
        // separator.
        let text = format!("{}\n\n{}", para('a', 60), para('b', 40));
        let cfg = SegmentConfig {
            chunk_chars: 100,
            overlap_chars: 20,
            min_fragment_chars: 10,
        };
        let chunks = segment(&text, &cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 102);
    }

    #[test]
    fn test_short_fragments_dropped() {
        assert!(segment(&para('a', 40), &config()).is_empty());
        assert!(segment(&para('a', 50), &config()).is_empty());
        assert_eq!(segment(&para('a', 51), &config()).len(), 1);
        assert!(segment("", &config()).is_empty());
    }

    #[test]
    fn test_short_trailing_window_dropped() {
        // Windows at 0 and 1050; the 41-char remainder at 2100 is
        // below the fragment threshold and dropped.
        let chunks = segment(&para('a', 2141), &config());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1200);
        assert_eq!(chunks[1].chars().count(), 1091);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = format!("{}\n\n{}", para('é', 800), para('漢', 700));
        let chunks = segment(&text, &config());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 800);
        // 150-char tail of the first chunk carried into the second.
        assert_eq!(chunks[1].chars().count(), 852);
        assert!(chunks[1].starts_with(&para('é', 150)));
    }
}
