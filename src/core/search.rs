//! Provides logic for filtering, ordering and paging lists of `FileRecord`s.

use super::models::{Category, FileRecord};
use super::query::{SearchRequest, SortDir, SortField};
use rayon::prelude::*;
use std::cmp::Ordering;

/// The most suggestions any lookup returns.
pub const MAX_SUGGESTIONS: usize = 5;

/// Filter criteria applied before sorting.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub query: String,
    /// Empty means every category.
    pub categories: Vec<Category>,
}

impl From<&SearchRequest> for SearchFilter {
    fn from(request: &SearchRequest) -> Self {
        SearchFilter {
            query: request.q.clone(),
            categories: request.categories.clone(),
        }
    }
}

/// A utility struct for searching file records in memory.
///
/// This struct is stateless and provides methods as associated functions.
pub struct SearchEngine;

impl SearchEngine {
    /// Runs a full request: filter, stable sort, then slice out the requested page.
    /// Returns the page and the total number of matches.
    pub fn execute(records: &[FileRecord], request: &SearchRequest) -> (Vec<FileRecord>, u64) {
        let mut matches = Self::filter_records(records, &SearchFilter::from(request));
        Self::sort_records(&mut matches, request.sort_field, request.sort_dir);
        let total = matches.len() as u64;
        (Self::paginate(matches, request.page, request.size), total)
    }

    /// Filters records, keeping catalog order.
    pub fn filter_records(records: &[FileRecord], filter: &SearchFilter) -> Vec<FileRecord> {
        records
            .par_iter()
            .filter(|record| Self::matches_filter(record, filter))
            .cloned()
            .collect()
    }

    /// Checks if a single record matches the given filter criteria.
    pub fn matches_filter(record: &FileRecord, filter: &SearchFilter) -> bool {
        if !filter.categories.is_empty() && !filter.categories.contains(&record.category) {
            return false;
        }

        let query = filter.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        record.title.to_lowercase().contains(&query)
            || record.filename.to_lowercase().contains(&query)
            || record.metadata_text.to_lowercase().contains(&query)
    }

    /// Stable sort. Equal keys keep their input order in both directions.
    pub fn sort_records(records: &mut [FileRecord], field: SortField, dir: SortDir) {
        records.sort_by(|a, b| match dir {
            SortDir::Asc => Self::compare(a, b, field),
            SortDir::Desc => Self::compare(b, a, field),
        });
    }

    fn compare(a: &FileRecord, b: &FileRecord, field: SortField) -> Ordering {
        match field {
            SortField::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
            SortField::Title => compare_case_insensitive(&a.title, &b.title),
            SortField::Filename => compare_case_insensitive(&a.filename, &b.filename),
            SortField::Category => compare_case_insensitive(a.category.as_str(), b.category.as_str()),
            SortField::UploadedBy => compare_case_insensitive(&a.uploaded_by, &b.uploaded_by),
            SortField::FileSize => a.file_size.cmp(&b.file_size),
        }
    }

    /// Slices out the 1-indexed `page`. Pages past the end are empty.
    pub fn paginate(records: Vec<FileRecord>, page: u32, size: u32) -> Vec<FileRecord> {
        let size = size.max(1) as usize;
        let start = (page.max(1) as usize - 1).saturating_mul(size);
        records.into_iter().skip(start).take(size).collect()
    }

    /// Distinct titles and filenames containing `q`, in catalog order, at most five.
    pub fn suggest(records: &[FileRecord], q: &str, categories: &[Category]) -> Vec<String> {
        let query = q.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let mut suggestions: Vec<String> = Vec::new();

        for record in records
            .iter()
            .filter(|r| categories.is_empty() || categories.contains(&r.category))
        {
            for candidate in [&record.title, &record.filename] {
                if candidate.to_lowercase().contains(&query) && !suggestions.contains(candidate) {
                    suggestions.push(candidate.clone());
                }
            }
            if suggestions.len() >= MAX_SUGGESTIONS {
                break;
            }
        }

        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
