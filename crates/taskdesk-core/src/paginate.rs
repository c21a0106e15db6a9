//! Fixed-size page slicing and navigation.

/// Number of pages needed for `len` items. Never less than one.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    len.div_ceil(size).max(1)
}

/// Clamp a 1-based page number into the valid range for `len` items.
pub fn clamp_page(page: usize, len: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(len, page_size))
}

/// One visible page of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice<'a, T> {
    pub items: &'a [T],
    /// The page actually shown, after clamping
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> PageSlice<'_, T> {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `collection` to the requested page, clamping out-of-range pages.
pub fn paginate<T>(collection: &[T], page: usize, page_size: usize) -> PageSlice<'_, T> {
    let page_size = page_size.max(1);
    let total = collection.len();
    let page = clamp_page(page, total, page_size);
    let start = ((page - 1) * page_size).min(total);
    let end = (start + page_size).min(total);
    PageSlice {
        items: &collection[start..end],
        page,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
    }
}

/// Current page window. Changing the size always returns to page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Set the page without clamping; use `clamp_to` once the total is known.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn first_page(&mut self) {
        self.page = 1;
    }

    pub fn next_page(&mut self, total: usize) {
        self.page = clamp_page(self.page + 1, total, self.page_size);
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn last_page(&mut self, total: usize) {
        self.page = total_pages(total, self.page_size);
    }

    pub fn clamp_to(&mut self, total: usize) {
        self.page = clamp_page(self.page, total, self.page_size);
    }

    pub fn slice<'a, T>(&self, collection: &'a [T]) -> PageSlice<'a, T> {
        paginate(collection, self.page, self.page_size)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(10)
    }
}
