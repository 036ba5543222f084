//! Title derivation for new tasks.

/// Title used when neither a title nor a detail is given.
pub const DEFAULT_TITLE: &str = "New task";

/// Number of characters of the detail used as a derived title.
pub const DEFAULT_PREVIEW_LEN: usize = 30;

const ELLIPSIS: &str = "...";

/// How a task without an explicit title gets one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePolicy {
    /// Fallback when there is nothing to derive from.
    pub default_title: String,
    /// Characters of the detail kept before the ellipsis.
    pub preview_len: usize,
}

impl Default for TitlePolicy {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

impl TitlePolicy {
    /// Picks the title to send for a new task.
    ///
    /// A non-blank `title` wins. Otherwise the first `preview_len`
    /// characters of `detail` are used, with `...` appended if anything was
    /// cut. An empty detail yields the default title.
    #[must_use]
    pub fn resolve(&self, title: Option<&str>, detail: &str) -> String {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        if detail.is_empty() {
            return self.default_title.clone();
        }
        let mut chars = detail.chars();
        let mut preview: String = chars.by_ref().take(self.preview_len).collect();
        if chars.next().is_some() {
            preview.push_str(ELLIPSIS);
        }
        preview
    }
}
