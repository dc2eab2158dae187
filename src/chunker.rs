//! Overlapping boundary-aware text chunker.
//!
//! Splits per-page text into segments of at most `chunk_size` characters,
//! preferring semantic breakpoints (paragraph, then sentence, then word,
//! then raw character cut) so a token is not severed mid-way when a
//! cleaner break exists within the window. Consecutive segments overlap
//! by roughly `overlap` characters so information spanning a boundary
//! remains retrievable from at least one chunk.
//!
//! The chunker is invoked once per page, never per document — that keeps
//! every chunk page-precise for citation.

use crate::models::DocumentPage;

/// Split one page's text. Page attribution is the caller's concern:
/// every returned segment belongs to `page.page_number`.
pub fn split_page(page: &DocumentPage, chunk_size: usize, overlap: usize) -> Vec<String> {
    split_text(&page.text, chunk_size, overlap)
}

/// Split text into overlapping segments of at most `chunk_size` chars.
///
/// Empty or whitespace-only input yields zero chunks. Zero-length
/// segments are never produced.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Operate on chars so limits are character counts, not bytes.
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let window_end = (start + chunk_size).min(chars.len());

        let cut = if window_end == chars.len() {
            window_end
        } else {
            find_break(&chars, start, window_end)
        };

        let piece: String = chars[start..cut].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if cut >= chars.len() {
            break;
        }

        // Step back for overlap, then advance onto a word boundary so the
        // overlapped region does not begin mid-token.
        let mut next = cut.saturating_sub(overlap);
        if next <= start {
            next = cut; // guarantee forward progress
        } else {
            while next < cut && !chars[next.saturating_sub(1)].is_whitespace() {
                next += 1;
            }
            if next >= cut {
                next = cut.saturating_sub(overlap).max(start + 1);
            }
        }
        start = next;
    }

    chunks
}

/// Find the best cut position in `chars[start..window_end]`.
///
/// Searches each separator class in precedence order (paragraph,
/// sentence, word) and accepts the last match in the window, provided it
/// falls in the second half — an early break would produce degenerate
/// short chunks. Falls back to a raw cut at the window end.
fn find_break(chars: &[char], start: usize, window_end: usize) -> usize {
    let min_cut = start + (window_end - start) / 2;

    if let Some(pos) = last_paragraph_break(chars, start, window_end) {
        if pos > min_cut {
            return pos;
        }
    }
    if let Some(pos) = last_sentence_break(chars, start, window_end) {
        if pos > min_cut {
            return pos;
        }
    }
    if let Some(pos) = last_word_break(chars, start, window_end) {
        if pos > min_cut {
            return pos;
        }
    }

    window_end
}

/// Position just after the last blank line (`\n\n`) in the window.
fn last_paragraph_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start + 1..end)
        .rev()
        .find(|&i| chars[i] == '\n' && chars[i - 1] == '\n')
        .map(|i| i + 1)
}

/// Position just after the last sentence terminator followed by whitespace.
fn last_sentence_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start..end.saturating_sub(1))
        .rev()
        .find(|&i| matches!(chars[i], '.' | '!' | '?') && chars[i + 1].is_whitespace())
        .map(|i| i + 2)
}

/// Position just after the last whitespace char in the window.
fn last_word_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start..end)
        .rev()
        .find(|&i| chars[i].is_whitespace())
        .map(|i| i + 1)
}
