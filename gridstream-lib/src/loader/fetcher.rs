//! The page-fetch capability supplied by the host.

use std::future::Future;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};

use crate::error::FetchError;

/// Fetches one page of rows.
///
/// Implemented by the embedding application, typically over a remote query.
/// Page indices start at 0.
///
/// # Example
///
/// ```ignore
/// struct Accounts { client: Client }
///
/// #[async_trait]
/// impl PageFetcher<Record> for Accounts {
///     async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<Record>, FetchError> {
///         self.client.accounts(page * page_size, page_size).await.map_err(|e| FetchError::new(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetches the rows of page `page`, at most `page_size` of them.
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<T>, FetchError>;
}

/// A [`PageFetcher`] backed by an async closure.
pub struct FnFetcher<F> {
    f: F,
}

/// Wraps an async closure as a [`PageFetcher`].
///
/// # Example
///
/// ```
/// use gridstream_lib::error::FetchError;
/// use gridstream_lib::loader::fetcher_fn;
///
/// let fetcher = fetcher_fn(|page: usize, size: usize| async move {
///     Ok::<_, FetchError>((page * size..(page + 1) * size).collect::<Vec<usize>>())
/// });
/// ```
pub fn fetcher_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(usize, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
{
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<T>, FetchError> {
        (self.f)(page, page_size).await
    }
}

/// A [`PageFetcher`] backed by a closure that streams the rows of a page.
pub struct StreamFetcher<F> {
    f: F,
}

/// Wraps a closure returning a row stream as a [`PageFetcher`].
///
/// The page is complete once the stream ends. The first error fails the
/// whole page and rows already received are dropped.
///
/// # Example
///
/// ```
/// use futures::stream;
/// use gridstream_lib::error::FetchError;
/// use gridstream_lib::loader::fetcher_stream;
///
/// let fetcher = fetcher_stream(|page: usize, size: usize| {
///     stream::iter((page * size..(page + 1) * size).map(Ok::<usize, FetchError>))
/// });
/// ```
pub fn fetcher_stream<F>(f: F) -> StreamFetcher<F> {
    StreamFetcher { f }
}

#[async_trait]
impl<T, F, S> PageFetcher<T> for StreamFetcher<F>
where
    T: Send + 'static,
    F: Fn(usize, usize) -> S + Send + Sync,
    S: Stream<Item = Result<T, FetchError>> + Send,
{
    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<Vec<T>, FetchError> {
        (self.f)(page, page_size).try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[tokio::test]
    async fn test_fetcher_fn_passes_page_and_size() {
        let fetcher = fetcher_fn(|page: usize, size: usize| async move {
            Ok::<_, FetchError>(vec![page, size])
        });
        assert_eq!(
            PageFetcher::<usize>::fetch_page(&fetcher, 3, 20).await,
            Ok(vec![3, 20])
        );
    }

    #[tokio::test]
    async fn test_stream_fetcher_collects_rows() {
        let fetcher = fetcher_stream(|page: usize, size: usize| {
            stream::iter((page * size..(page + 1) * size).map(Ok::<usize, FetchError>))
        });
        assert_eq!(
            PageFetcher::<usize>::fetch_page(&fetcher, 1, 3).await,
            Ok(vec![3, 4, 5])
        );
    }

    #[tokio::test]
    async fn test_stream_fetcher_fails_on_first_error() {
        let fetcher = fetcher_stream(|_page: usize, _size: usize| {
            stream::iter(vec![Ok(1), Err(FetchError::new("connection reset")), Ok(2)])
        });
        let result = PageFetcher::<i32>::fetch_page(&fetcher, 0, 3).await;
        assert_eq!(result, Err(FetchError::new("connection reset")));
    }
}
