//! Zero-based paging for catalog listings

use crate::error::{AppError, AppResult};

/// Requested page: zero-based index and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> AppResult<Self> {
        if size == 0 {
            return Err(AppError::InvalidArgument(
                "Page size must not be less than one".to_string(),
            ));
        }
        Ok(Self { page, size })
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }

    /// Cuts this page out of a fully materialized, already ordered listing
    pub fn slice<T: Clone>(&self, all: &[T]) -> Page<T> {
        let start = (self.offset() as usize).min(all.len());
        let end = (start + self.size as usize).min(all.len());
        Page {
            items: all[start..end].to_vec(),
            total: all.len() as u64,
            page: self.page,
            size: self.size,
        }
    }
}

/// One page of results plus the size of the whole listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size as u64)
    }
}
