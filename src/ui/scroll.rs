//! Scroll state for the display log.
//!
//! Follow-latest mode pins the viewport to the bottom as content streams in;
//! anchored mode preserves a manual scroll-back position. The pin-to-bottom
//! decision is the mode captured before a mutation: following stays pinned,
//! anchored stays put.

/// Scroll mode for the display viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollMode {
    /// Auto-scroll to show the latest content (bottom of the log).
    FollowLatest,
    /// User scrolled manually; offset is a line index from the top.
    Anchored { offset: usize },
}

/// Scroll mode plus the cached line count from the last render.
#[derive(Debug, Clone)]
pub struct ScrollState {
    pub mode: ScrollMode,
    /// Total rendered line count from the last render, for offset math.
    cached_line_count: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            mode: ScrollMode::FollowLatest,
            cached_line_count: 0,
        }
    }
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the view is pinned to the bottom.
    pub fn is_following(&self) -> bool {
        matches!(self.mode, ScrollMode::FollowLatest)
    }

    /// Returns the top line to render for the given viewport height.
    pub fn offset(&self, viewport_height: usize) -> usize {
        let max_offset = self.cached_line_count.saturating_sub(viewport_height);
        match &self.mode {
            ScrollMode::FollowLatest => max_offset,
            ScrollMode::Anchored { offset } => (*offset).min(max_offset),
        }
    }

    pub fn scroll_up(&mut self, lines: usize, viewport_height: usize) {
        let offset = self.offset(viewport_height).saturating_sub(lines);
        self.mode = ScrollMode::Anchored { offset };
    }

    /// Scrolls down, snapping back to follow mode at the bottom.
    pub fn scroll_down(&mut self, lines: usize, viewport_height: usize) {
        if self.is_following() {
            return;
        }
        let max_offset = self.cached_line_count.saturating_sub(viewport_height);
        let offset = (self.offset(viewport_height) + lines).min(max_offset);
        if offset >= max_offset {
            self.mode = ScrollMode::FollowLatest;
        } else {
            self.mode = ScrollMode::Anchored { offset };
        }
    }

    pub fn page_up(&mut self, viewport_height: usize) {
        self.scroll_up(viewport_height.max(1), viewport_height);
    }

    pub fn page_down(&mut self, viewport_height: usize) {
        self.scroll_down(viewport_height.max(1), viewport_height);
    }

    pub fn scroll_to_top(&mut self) {
        self.mode = ScrollMode::Anchored { offset: 0 };
    }

    pub fn scroll_to_bottom(&mut self) {
        self.mode = ScrollMode::FollowLatest;
    }

    /// Updates the cached line count. Call after rendering so offset math
    /// tracks the wrapped line total.
    pub fn update_line_count(&mut self, line_count: usize) {
        self.cached_line_count = line_count;
    }

    /// Shifts an anchored offset up after `lines` were trimmed from the top,
    /// so the view keeps showing the same content.
    pub fn adjust_for_trim(&mut self, lines: usize) {
        if lines == 0 {
            return;
        }
        if let ScrollMode::Anchored { offset } = &mut self.mode {
            *offset = offset.saturating_sub(lines);
        }
    }

    /// Resets to follow mode (e.g. after clearing the log).
    pub fn reset(&mut self) {
        self.mode = ScrollMode::FollowLatest;
        self.cached_line_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_mode_shows_bottom() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        assert!(scroll.is_following());
        assert_eq!(scroll.offset(20), 80);
    }

    #[test]
    fn test_scroll_up_anchors() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        scroll.scroll_up(10, 20);
        assert!(!scroll.is_following());
        assert_eq!(scroll.offset(20), 70);
    }

    #[test]
    fn test_scroll_down_snaps_back_to_follow() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        scroll.scroll_up(5, 20);
        scroll.scroll_down(10, 20);
        assert!(scroll.is_following());
    }

    #[test]
    fn test_anchored_position_survives_growth() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        scroll.scroll_up(30, 20);
        let anchored = scroll.offset(20);

        // New content arrives below; the anchor must not move.
        scroll.update_line_count(200);
        assert_eq!(scroll.offset(20), anchored);
    }

    #[test]
    fn test_adjust_for_trim_shifts_anchor() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        scroll.scroll_up(40, 20);
        assert_eq!(scroll.offset(20), 40);

        scroll.adjust_for_trim(15);
        scroll.update_line_count(85);
        assert_eq!(scroll.offset(20), 25);
    }

    #[test]
    fn test_adjust_for_trim_ignores_follow_mode() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(100);
        scroll.adjust_for_trim(15);
        assert!(scroll.is_following());
    }

    #[test]
    fn test_offset_clamped_to_content() {
        let mut scroll = ScrollState::new();
        scroll.update_line_count(10);
        scroll.mode = ScrollMode::Anchored { offset: 500 };
        assert_eq!(scroll.offset(20), 0);
    }
}
