use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::traits::{Page, PageSource, RawDocument};

pub const DEFAULT_PAGE_SIZE: usize = 100;

type Decoder<T> = fn(RawDocument) -> Result<T, StoreError>;

/// Lazy, restartable iterator over a store listing.
///
/// Pages are fetched on demand. A failure ends the iteration and is kept
/// for [`DocumentIterator::error`] so callers can tell a complete listing
/// from a partial one; items already yielded stay valid.
pub struct DocumentIterator<T> {
    source: Arc<dyn PageSource>,
    decode: Decoder<T>,
    page_size: usize,
    buffer: VecDeque<RawDocument>,
    continuation: Option<String>,
    exhausted: bool,
    error: Option<StoreError>,
}

impl DocumentIterator<RawDocument> {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            decode: Ok,
            page_size: DEFAULT_PAGE_SIZE,
            buffer: VecDeque::new(),
            continuation: None,
            exhausted: false,
            error: None,
        }
    }

    /// Decode every document with `decode` instead of yielding raw documents.
    pub fn decode_with<U>(self, decode: Decoder<U>) -> DocumentIterator<U> {
        DocumentIterator {
            source: self.source,
            decode,
            page_size: self.page_size,
            buffer: self.buffer,
            continuation: self.continuation,
            exhausted: self.exhausted,
            error: self.error,
        }
    }
}

impl<T> DocumentIterator<T> {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Next item, or `None` when the listing is finished or failed.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if self.error.is_some() {
                return None;
            }
            if let Some(raw) = self.buffer.pop_front() {
                match (self.decode)(raw) {
                    Ok(item) => return Some(item),
                    Err(err) => {
                        self.error = Some(err);
                        return None;
                    }
                }
            }
            if self.exhausted {
                return None;
            }
            match self
                .source
                .fetch_page(self.continuation.as_deref(), self.page_size)
                .await
            {
                Ok(Page {
                    documents,
                    continuation,
                }) => {
                    self.exhausted = continuation.is_none();
                    self.continuation = continuation;
                    self.buffer.extend(documents);
                }
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            }
        }
    }

    /// Set once the iteration stopped because of a failure.
    pub fn error(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<StoreError> {
        self.error.take()
    }

    /// Start over from the first page, clearing any recorded failure.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.continuation = None;
        self.exhausted = false;
        self.error = None;
    }

    /// Drain the remaining items, failing if the listing did not complete.
    pub async fn try_collect(mut self) -> Result<Vec<T>, StoreError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(items),
        }
    }
}
