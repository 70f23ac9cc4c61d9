//! Windowing and loading configuration

/// How a changed row height is corrected in the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReanchorMode {
    /// Scroll once immediately, then once more after layout settles.
    ///
    /// For render surfaces that only report the new geometry after a layout
    /// pass. The second correction runs on [`ScrollStrategy::settle`].
    ///
    /// [`ScrollStrategy::settle`]: crate::scroll::ScrollStrategy::settle
    #[default]
    TwoPhase,
    /// Scroll once, then re-measure.
    ///
    /// For render surfaces whose geometry is updated synchronously.
    Immediate,
}

/// Configuration for the windowing engine.
///
/// # Example
///
/// ```
/// use gridstream_lib::config::{ReanchorMode, ScrollConfig};
///
/// let config = ScrollConfig::default()
///     .with_buffer(5)
///     .with_default_row_height(20.0)
///     .with_reanchor(ReanchorMode::Immediate);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollConfig {
    /// Rows materialized beyond each edge of the viewport.
    ///
    /// Default: 15
    pub buffer: usize,

    /// Row height used when the row-height accessor reports nothing usable.
    ///
    /// Default: 27.0
    pub default_row_height: f64,

    /// Header offset used when the header-offset accessor reports nothing usable.
    ///
    /// Default: 0.0
    pub default_header_offset: f64,

    /// Row-height change correction.
    ///
    /// Default: [`ReanchorMode::TwoPhase`]
    pub reanchor: ReanchorMode,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            buffer: 15,
            default_row_height: 27.0,
            default_header_offset: 0.0,
            reanchor: ReanchorMode::TwoPhase,
        }
    }
}

impl ScrollConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the buffer size.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Sets the fallback row height.
    pub fn with_default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = height;
        self
    }

    /// Sets the fallback header offset.
    pub fn with_default_header_offset(mut self, offset: f64) -> Self {
        self.default_header_offset = offset;
        self
    }

    /// Sets the re-anchoring mode.
    pub fn with_reanchor(mut self, reanchor: ReanchorMode) -> Self {
        self.reanchor = reanchor;
        self
    }
}

/// Which page the loader asks for next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageIndexing {
    /// The page containing the last loaded row: `(len - 1) / page_size`.
    ///
    /// Matches tables seeded with a placeholder row. An empty collection
    /// requests page 0.
    #[default]
    LastRow,
    /// The page after the last full page: `len / page_size`.
    NextPage,
}

impl PageIndexing {
    /// Page index to request when `len` rows are loaded.
    pub fn page_for(&self, len: usize, page_size: usize) -> usize {
        let page_size = page_size.max(1);
        match self {
            PageIndexing::LastRow => len.saturating_sub(1) / page_size,
            PageIndexing::NextPage => len / page_size,
        }
    }
}

/// Configuration for the incremental loader.
///
/// # Example
///
/// ```
/// use gridstream_lib::config::{LoaderConfig, PageIndexing};
///
/// let config = LoaderConfig::default()
///     .with_page_size(100)
///     .with_paging(PageIndexing::NextPage);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Rows requested per page.
    ///
    /// Default: 50
    pub page_size: usize,

    /// A page is requested once the rendered range ends within this many
    /// rows of the loaded data.
    ///
    /// Default: 5
    pub buffer: usize,

    /// Page index selection.
    ///
    /// Default: [`PageIndexing::LastRow`]
    pub paging: PageIndexing,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            buffer: 5,
            paging: PageIndexing::LastRow,
        }
    }
}

impl LoaderConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the trigger buffer.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Sets the page index selection.
    pub fn with_paging(mut self, paging: PageIndexing) -> Self {
        self.paging = paging;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_row_paging() {
        let paging = PageIndexing::LastRow;
        assert_eq!(paging.page_for(0, 50), 0);
        assert_eq!(paging.page_for(1, 50), 0);
        assert_eq!(paging.page_for(51, 50), 1);
        assert_eq!(paging.page_for(100, 50), 1);
    }

    #[test]
    fn test_next_page_paging() {
        let paging = PageIndexing::NextPage;
        assert_eq!(paging.page_for(0, 50), 0);
        assert_eq!(paging.page_for(50, 50), 1);
        assert_eq!(paging.page_for(99, 50), 1);
    }
}
