//! Raw text canonicalization ahead of segmentation.

/// Canonicalize raw extracted text.
///
/// Three rules, applied in order:
/// 1. All line endings (`\r\n`, `\r`) become a single `\n`.
/// 2. Runs of horizontal whitespace collapse to one space.
/// 3. Runs of more than three consecutive newlines collapse to exactly
///    two, preserving paragraph breaks while bounding vertical gaps.
///
/// No content beyond whitespace is removed. Total: never fails, and
/// normalized text passes through unchanged.
pub fn normalize(text: &str) -> String {
    let mut flat = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                flat.push('\n');
            }
            '\n' => flat.push('\n'),
            c if c.is_whitespace() => {
                // Swallow the rest of the horizontal run.
                while matches!(chars.peek(), Some(&n) if n.is_whitespace() && n != '\n' && n != '\r')
                {
                    chars.next();
                }
                flat.push(' ');
            }
            c => flat.push(c),
        }
    }

    cap_blank_runs(&flat)
}

/// Collapse runs of four or more newlines to exactly two.
fn cap_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\n' {
            out.push(c);
            continue;
        }

        let mut run = 1;
        while chars.peek() == Some(&'\n') {
            chars.next();
            run += 1;
        }

        let keep = if run > 3 { 2 } else { run };
        for _ in 0..keep {
            out.push('\n');
        }
    }

    out
}
