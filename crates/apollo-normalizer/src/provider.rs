//! Caching of normalized documents across requests.
//!
//! A [`NormalizedDocumentProvider`] is given a key and a function that creates the document,
//! and decides whether to call it.
//! Key derivation (from query text, operation name, schema identity…) is up to the caller.

use crate::NormalizationError;
use crate::NormalizedDocument;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;

/// Creates a normalized document. Called at most once.
pub type CreateNormalizedDocument =
    Box<dyn FnOnce() -> Result<NormalizedDocument, NormalizationError> + Send + 'static>;

/// A normalized document as stored by a provider, cheap to clone.
#[derive(Debug, Clone)]
pub struct NormalizedDocumentEntry {
    document: Arc<NormalizedDocument>,
}

impl NormalizedDocumentEntry {
    pub fn new(document: NormalizedDocument) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    pub fn document(&self) -> &Arc<NormalizedDocument> {
        &self.document
    }
}

pub trait NormalizedDocumentProvider: Send + Sync {
    /// Returns the document for `key`, calling `create` if needed.
    ///
    /// An error returned by `create` is returned as-is.
    fn get_normalized_document(
        &self,
        key: &str,
        create: CreateNormalizedDocument,
    ) -> BoxFuture<'static, Result<NormalizedDocumentEntry, NormalizationError>>;
}

/// A provider that does not cache: it calls `create` on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNormalizedDocumentProvider;

impl NormalizedDocumentProvider for NoOpNormalizedDocumentProvider {
    fn get_normalized_document(
        &self,
        _key: &str,
        create: CreateNormalizedDocument,
    ) -> BoxFuture<'static, Result<NormalizedDocumentEntry, NormalizationError>> {
        futures::future::ready(create().map(NormalizedDocumentEntry::new)).boxed()
    }
}

type InFlight = Shared<BoxFuture<'static, Result<NormalizedDocumentEntry, NormalizationError>>>;

/// A provider that deduplicates concurrent creation of the same document.
///
/// The first request for a key starts creation.
/// Requests for that key made before it completes wait for the same result,
/// and their own `create` function is dropped without being called.
///
/// By default the key is forgotten as soon as creation completes,
/// so only concurrent requests are coalesced.
/// With [`retain_completed`][Self::retain_completed], successfully created documents are kept
/// and served to later requests. Errors are never kept: the next request retries.
///
/// Creation runs when the returned future is first polled, by whichever waiter polls it.
/// Dropping a waiter does not cancel creation for the others.
#[derive(Clone, Default)]
pub struct CoalescingDocumentProvider {
    entries: Arc<Mutex<HashMap<String, InFlight>>>,
    retain_completed: bool,
}

impl CoalescingDocumentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure whether successfully created documents are kept after creation completes.
    pub fn retain_completed(mut self, value: bool) -> Self {
        self.retain_completed = value;
        self
    }

    /// Number of keys with a document being created or retained
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every retained document. Creations in progress are not affected.
    pub fn clear(&self) {
        self.lock().retain(|_key, in_flight| in_flight.peek().is_none())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NormalizedDocumentProvider for CoalescingDocumentProvider {
    fn get_normalized_document(
        &self,
        key: &str,
        create: CreateNormalizedDocument,
    ) -> BoxFuture<'static, Result<NormalizedDocumentEntry, NormalizationError>> {
        let mut entries = self.lock();
        if let Some(in_flight) = entries.get(key) {
            tracing::debug!(key, "joining in-flight normalized document creation");
            return in_flight.clone().boxed();
        }
        tracing::debug!(key, "creating normalized document");
        let weak_entries: Weak<_> = Arc::downgrade(&self.entries);
        let retain_completed = self.retain_completed;
        let owned_key = key.to_owned();
        let in_flight = async move {
            let result = create().map(NormalizedDocumentEntry::new);
            if let Err(error) = &result {
                tracing::debug!(
                    key = owned_key.as_str(),
                    %error,
                    "normalized document creation failed"
                );
            }
            if !(retain_completed && result.is_ok()) {
                if let Some(entries) = weak_entries.upgrade() {
                    entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&owned_key);
                }
            }
            result
        }
        .boxed()
        .shared();
        entries.insert(key.to_owned(), in_flight.clone());
        in_flight.boxed()
    }
}

impl fmt::Debug for CoalescingDocumentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingDocumentProvider")
            .field("len", &self.len())
            .field("retain_completed", &self.retain_completed)
            .finish()
    }
}
