//! registry::cursor
//!
//! Lazy, restartable listing over token-paginated store results.
//!
//! # Design
//!
//! A [`PaginationCursor`] holds its filter, the current page token, a buffer
//! of already-fetched entities and an exhausted flag. Each page advance is
//! exactly one `list_nodes` call; a page with no continuation token ends the
//! sequence. A failed fetch leaves the cursor where it was, so calling again
//! retries the same page.
//!
//! Consistency is weak: nodes created or updated while a listing is in
//! progress may or may not appear, and may shift between pages.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::TryStreamExt;
//!
//! let mut cursor = registry.list_models(ListOptions::default().page_size(50));
//! while let Some(model) = cursor.next().await? {
//!     println!("{}", model.name);
//! }
//!
//! cursor.restart();
//! let names: Vec<String> = cursor
//!     .into_stream()
//!     .map_ok(|m| m.name)
//!     .try_collect()
//!     .await?;
//! ```

use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::error::RegistryError;
use super::mapping::{from_primitive, Entity};
use super::upsert::UpsertEngine;
use crate::core::config::DEFAULT_PAGE_SIZE;
use crate::core::types::{NodeId, ParentRef};
use crate::registry::type_cache::TypeCache;
use crate::store::{CallOptions, ListRequest, MetadataStore, OrderBy, SortOrder};

/// Filter and ordering for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Name filter; `*` matches any run of characters
    pub name_pattern: Option<String>,
    pub order_by: OrderBy,
    pub sort_order: SortOrder,
    /// Page size hint; the client default applies when unset
    pub page_size: Option<usize>,
}

impl ListOptions {
    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Forward-only sequence of entities of one kind.
///
/// Cloning a cursor yields an independent consumer starting from the same
/// position.
#[derive(Clone)]
pub struct PaginationCursor<E: Entity> {
    store: Arc<dyn MetadataStore>,
    types: Arc<TypeCache>,
    opts: CallOptions,
    parent: Option<ParentRef>,
    options: ListOptions,
    page_size: usize,
    /// Parent id, once a named parent has been resolved
    scope: Option<NodeId>,
    page_token: Option<String>,
    buffer: VecDeque<E>,
    done: bool,
}

impl<E: Entity> PaginationCursor<E> {
    /// Create a cursor over children of `parent` (or all entities when `None`).
    ///
    /// A page size of 0 is clamped to 1. Nothing is fetched until the first
    /// call to [`next`](Self::next) or [`next_page`](Self::next_page).
    pub fn new(
        store: Arc<dyn MetadataStore>,
        types: Arc<TypeCache>,
        opts: CallOptions,
        parent: Option<ParentRef>,
        options: ListOptions,
    ) -> Self {
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        Self {
            store,
            types,
            opts,
            scope: parent.as_ref().and_then(ParentRef::as_id),
            parent,
            options,
            page_size,
            page_token: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Effective page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Check whether the store has no more pages for this cursor.
    pub fn is_exhausted(&self) -> bool {
        self.done && self.buffer.is_empty()
    }

    /// Start over from the first page.
    pub fn restart(&mut self) {
        self.page_token = None;
        self.buffer.clear();
        self.done = false;
    }

    /// Get the next entity, fetching a page when the buffer runs dry.
    pub async fn next(&mut self) -> Result<Option<E>, RegistryError> {
        loop {
            if let Some(entity) = self.buffer.pop_front() {
                return Ok(Some(entity));
            }
            if self.done {
                return Ok(None);
            }
            let page = self.fetch().await?;
            self.buffer.extend(page);
        }
    }

    /// Get the rest of the current page, or fetch the next one.
    ///
    /// Returns `None` once the sequence is exhausted. A page may be empty
    /// while the store still reports more to come.
    pub async fn next_page(&mut self) -> Result<Option<Vec<E>>, RegistryError> {
        if !self.buffer.is_empty() {
            return Ok(Some(self.buffer.drain(..).collect()));
        }
        if self.done {
            return Ok(None);
        }
        self.fetch().await.map(Some)
    }

    /// Drain the remaining entities into a vector.
    pub async fn collect_all(&mut self) -> Result<Vec<E>, RegistryError> {
        let mut all = Vec::new();
        while let Some(entity) = self.next().await? {
            all.push(entity);
        }
        Ok(all)
    }

    /// Turn the cursor into a `Stream` of entities.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<E, RegistryError>> + Send {
        stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, RegistryError>(next.map(|entity| (entity, cursor)))
        })
    }

    /// Fetch one page and advance the token.
    async fn fetch(&mut self) -> Result<Vec<E>, RegistryError> {
        let table = E::table();
        let engine = UpsertEngine::new(self.store.as_ref(), &self.types, self.opts);
        let type_id = engine.type_id(table).await?;

        if self.scope.is_none() {
            if let Some(parent) = &self.parent {
                self.scope = Some(engine.resolve_parent(table, parent).await?);
            }
        }

        debug!(
            type_name = %table.type_name,
            page_size = self.page_size,
            has_token = self.page_token.is_some(),
            "fetching page"
        );
        let request = ListRequest {
            type_id,
            scope: self.scope,
            name_pattern: self.options.name_pattern.clone(),
            order_by: self.options.order_by,
            sort_order: self.options.sort_order,
            page_token: self.page_token.clone(),
            page_size: self.page_size,
        };
        let page = self.store.list_nodes(request, &self.opts).await?;

        let entities = page
            .items
            .iter()
            .map(|node| from_primitive(node, type_id))
            .collect::<Result<Vec<E>, _>>()?;

        self.done = page.next_page_token.is_none();
        self.page_token = page.next_page_token;
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entities::{ModelVersion, RegisteredModel};
    use crate::store::mock::{FailOn, MockStore};
    use crate::store::StoreError;
    use futures_util::TryStreamExt;

    async fn seeded(count: usize) -> (MockStore, Arc<TypeCache>) {
        let store = MockStore::new();
        let types = Arc::new(TypeCache::new());
        let engine = UpsertEngine::new(&store, &types, CallOptions::default());
        for i in 0..count {
            engine
                .upsert(&RegisteredModel::new(format!("model-{:02}", i)), None)
                .await
                .unwrap();
        }
        (store, types)
    }

    fn cursor(
        store: &MockStore,
        types: &Arc<TypeCache>,
        options: ListOptions,
    ) -> PaginationCursor<RegisteredModel> {
        PaginationCursor::new(
            Arc::new(store.clone()),
            Arc::clone(types),
            CallOptions::default(),
            None,
            options,
        )
    }

    #[tokio::test]
    async fn pages_through_everything() {
        let (store, types) = seeded(5).await;
        store.clear_operations();

        let mut c = cursor(&store, &types, ListOptions::default().page_size(2));
        let all = c.collect_all().await.unwrap();

        assert_eq!(all.len(), 5);
        assert_eq!(all[0].name, "model-00");
        assert_eq!(store.count("list_nodes"), 3);
        assert!(c.is_exhausted());
        assert!(c.next().await.unwrap().is_none());
        assert_eq!(store.count("list_nodes"), 3);
    }

    #[tokio::test]
    async fn zero_page_size_is_clamped() {
        let (store, types) = seeded(2).await;
        let c = cursor(&store, &types, ListOptions::default().page_size(0));
        assert_eq!(c.page_size(), 1);
    }

    #[tokio::test]
    async fn restart_starts_over() {
        let (store, types) = seeded(3).await;
        let mut c = cursor(&store, &types, ListOptions::default().page_size(2));

        let first = c.next().await.unwrap().unwrap();
        c.next().await.unwrap();
        c.next().await.unwrap();
        c.restart();

        assert_eq!(c.next().await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn next_page_drains_buffer_first() {
        let (store, types) = seeded(3).await;
        let mut c = cursor(&store, &types, ListOptions::default().page_size(2));

        c.next().await.unwrap();
        let rest = c.next_page().await.unwrap().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "model-01");

        let last = c.next_page().await.unwrap().unwrap();
        assert_eq!(last.len(), 1);
        assert!(c.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clones_are_independent() {
        let (store, types) = seeded(2).await;
        let mut a = cursor(&store, &types, ListOptions::default());
        let mut b = a.clone();

        assert_eq!(a.collect_all().await.unwrap().len(), 2);
        assert_eq!(b.collect_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn filter_and_order() {
        let (store, types) = seeded(4).await;
        let mut c = cursor(
            &store,
            &types,
            ListOptions::default()
                .name_pattern("model-0*")
                .sort_order(SortOrder::Desc),
        );
        let names: Vec<String> = c
            .collect_all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["model-03", "model-02", "model-01", "model-00"]);
    }

    #[tokio::test]
    async fn stream_yields_all() {
        let (store, types) = seeded(3).await;
        let c = cursor(&store, &types, ListOptions::default().page_size(1));
        let all: Vec<RegisteredModel> = c.into_stream().try_collect().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_can_be_retried() {
        let (store, types) = seeded(2).await;
        let store = store.fail_on(FailOn::ListNodes(StoreError::Unavailable("down".into())));
        let mut c = cursor(&store, &types, ListOptions::default());

        let err = c.next().await.unwrap_err();
        assert!(err.is_retryable());

        store.clear_fail_on();
        assert_eq!(c.collect_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_named_parent_fails_on_first_fetch() {
        let (store, types) = seeded(1).await;
        let mut c: PaginationCursor<ModelVersion> = PaginationCursor::new(
            Arc::new(store.clone()),
            Arc::clone(&types),
            CallOptions::default(),
            Some(ParentRef::from("mnist")),
            ListOptions::default(),
        );
        let err = c.next().await.unwrap_err();
        assert!(matches!(err, RegistryError::ParentNotFound { .. }));
    }
}
