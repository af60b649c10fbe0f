//! Fenced code block detection for line-based scanners.

/// Tracks whether a line-by-line scan is inside a fenced code block.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed the next line. Returns `true` if the line belongs to a fenced
    /// block, delimiters included.
    pub(crate) fn is_code(&mut self, line: &str) -> bool {
        let marker = fence_marker(line);

        match (self.open, marker) {
            (None, Some((ch, len, _))) => {
                self.open = Some((ch, len));
                true
            }
            (Some((ch, len)), Some((m_ch, m_len, rest)))
                if m_ch == ch && m_len >= len && rest.trim().is_empty() =>
            {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, None) => false,
        }
    }
}

/// Fence character, run length and trailing text of a fence line.
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }

    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then(|| (ch, len, &trimmed[len..]))
}
