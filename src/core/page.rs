// Simple offset pagination shared by the history views.

/// Rows per page in warning and incident history listings.
pub const PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32) -> Self {
        let total_pages = total.div_ceil(PAGE_SIZE as u64) as u32;
        Self {
            items,
            total,
            page,
            total_pages,
        }
    }
}

/// Clamp a user-supplied page number and return `(page, offset)`.
pub fn page_offset(page: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    (page, (page - 1) * PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(None), (1, 0));
        assert_eq!(page_offset(Some(0)), (1, 0));
        assert_eq!(page_offset(Some(3)), (3, 50));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Page::<u8>::new(vec![], 0, 1).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 25, 1).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 26, 1).total_pages, 2);
    }
}
