//! Dual-mode data source for master/detail task data.
//!
//! *Paged* mode hands filtering and pagination to the server, one request
//! per page. *Aggregate* mode loads the whole light series collection once
//! and filters and paginates it in memory. Both consult the owned
//! [`CacheStore`] before touching the network.
//!
//! Every trigger takes `&mut self`, so a fetch can never interleave with a
//! filter change on the same source: the last write to state always wins
//! and stale responses cannot land on newer state.

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

use crate::api::{PageQuery, TaskApi};
use crate::cache::{CacheKey, CachePolicy, CacheStore, EndpointKind};
use crate::debounce::Debouncer;
use crate::error::{ApiError, CoreError, IntegrityWarning};
use crate::filter::{FilterContext, FilterPipeline, Filterable};
use crate::models::{
    EngineConfig, FilterState, MasterSeriesRecord, TaskPage, TaskRecord, Viewer, ViewKind,
};
use crate::notify::{LogNotifier, Notifier};
use crate::paginate::{self, Paginator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Server filters and paginates, one request per page
    Paged,
    /// Whole series collection held client-side
    Aggregate,
}

impl DataMode {
    pub fn toggled(self) -> Self {
        match self {
            DataMode::Paged => DataMode::Aggregate,
            DataMode::Aggregate => DataMode::Paged,
        }
    }
}

/// Values held by a data source's cache.
#[derive(Debug, Clone)]
pub enum CachedResult {
    Page(TaskPage),
    Series(Vec<MasterSeriesRecord>),
    Detail(MasterSeriesRecord),
}

/// What the UI should currently render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisiblePage<'a> {
    Instances(&'a [TaskRecord]),
    Series(&'a [MasterSeriesRecord]),
}

impl VisiblePage<'_> {
    pub fn len(&self) -> usize {
        match self {
            VisiblePage::Instances(items) => items.len(),
            VisiblePage::Series(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which page to land on after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadAt {
    FirstPage,
    CurrentPage,
}

/// Enforce one-series-per-id and instance-to-series resolution within a
/// batch. Offending records are dropped and reported, never raised.
pub fn reconcile_batch(
    batch: Vec<MasterSeriesRecord>,
) -> (Vec<MasterSeriesRecord>, Vec<IntegrityWarning>) {
    let mut warnings = Vec::new();
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());
    let mut kept = Vec::with_capacity(batch.len());

    for mut series in batch {
        if series.series_id.trim().is_empty() {
            warnings.push(IntegrityWarning::MissingSeries {
                title: series.title.clone(),
            });
            continue;
        }
        if !seen.insert(series.series_id.clone()) {
            warnings.push(IntegrityWarning::DuplicateSeries {
                series_id: series.series_id.clone(),
            });
            continue;
        }
        if let Some(tasks) = series.tasks.take() {
            let (owned, orphans): (Vec<_>, Vec<_>) = tasks.into_iter().partition(|task| {
                task.series_id
                    .as_deref()
                    .map_or(true, |id| id == series.series_id)
            });
            warnings.extend(orphans.into_iter().map(|task| IntegrityWarning::OrphanInstance {
                series_id: task.series_id.unwrap_or_default(),
                task_id: task.id,
            }));
            series.tasks = Some(owned);
        }
        kept.push(series);
    }

    (kept, warnings)
}

pub struct DataSource<A: TaskApi> {
    api: A,
    cache: CacheStore<CachedResult>,
    config: EngineConfig,
    viewer: Viewer,
    tz: Tz,
    notifier: Arc<dyn Notifier>,
    mode: DataMode,
    filters: FilterState,
    paginator: Paginator,
    search_input: Debouncer<String>,
    date_input: Debouncer<(Option<NaiveDate>, Option<NaiveDate>)>,
    page_data: TaskPage,
    series: Vec<MasterSeriesRecord>,
    filtered_series: Vec<MasterSeriesRecord>,
    loading: bool,
}

impl<A: TaskApi> DataSource<A> {
    pub fn new(api: A, viewer: Viewer, tz: Tz, config: EngineConfig) -> Self {
        let cache = CacheStore::new(CachePolicy::from(&config));
        Self {
            api,
            cache,
            viewer,
            tz,
            notifier: Arc::new(LogNotifier),
            mode: DataMode::Paged,
            filters: FilterState::default(),
            paginator: Paginator::new(config.page_size),
            search_input: Debouncer::new(config.search_debounce),
            date_input: Debouncer::new(config.date_debounce),
            page_data: TaskPage::default(),
            series: Vec::new(),
            filtered_series: Vec::new(),
            loading: false,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }

    /// Start with `filters` in place. Nothing is fetched until the first trigger.
    pub fn with_filters(mut self, filters: FilterState) -> Self {
        self.filters = filters.normalized();
        self
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> ViewKind {
        self.api.view()
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn cache(&self) -> &CacheStore<CachedResult> {
        &self.cache
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page(&self) -> usize {
        self.paginator.page()
    }

    pub fn page_size(&self) -> usize {
        self.paginator.page_size()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn visible_page(&self) -> VisiblePage<'_> {
        match self.mode {
            DataMode::Paged => VisiblePage::Instances(&self.page_data.tasks),
            DataMode::Aggregate => VisiblePage::Series(self.paginator.slice(&self.filtered_series).items),
        }
    }

    pub fn total(&self) -> usize {
        match self.mode {
            DataMode::Paged => self.page_data.total,
            DataMode::Aggregate => self.filtered_series.len(),
        }
    }

    pub fn total_pages(&self) -> usize {
        match self.mode {
            DataMode::Paged => self.page_data.total_pages.max(1),
            DataMode::Aggregate => paginate::total_pages(self.filtered_series.len(), self.page_size()),
        }
    }

    pub fn has_more(&self) -> bool {
        match self.mode {
            DataMode::Paged => self.page_data.has_more,
            DataMode::Aggregate => self.page() < self.total_pages(),
        }
    }

    /// Every series that survived the current filters (aggregate mode).
    pub fn filtered_series(&self) -> &[MasterSeriesRecord] {
        &self.filtered_series
    }

    /// A series from the loaded aggregate collection.
    pub fn find_series(&self, series_id: &str) -> Option<&MasterSeriesRecord> {
        self.series.iter().find(|s| s.series_id == series_id)
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Initial load for the current mode.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        self.fetch_active().await
    }

    pub async fn set_filter(&mut self, filters: FilterState) -> Result<(), CoreError> {
        let filters = filters.normalized();
        if filters == self.filters {
            return Ok(());
        }
        tracing::debug!(?filters, "filters changed");
        self.filters = filters;
        self.cache
            .invalidate_by_prefix(&CacheKey::kind_prefix(self.view(), EndpointKind::Paged));
        self.paginator.first_page();
        match self.mode {
            DataMode::Paged => self.fetch_paged().await,
            DataMode::Aggregate => {
                self.refilter();
                Ok(())
            }
        }
    }

    pub async fn reset_filters(&mut self) -> Result<(), CoreError> {
        self.search_input.cancel();
        self.date_input.cancel();
        self.set_filter(FilterState::default()).await
    }

    /// Feed raw search box text; applied once it settles.
    pub fn set_search_input(&mut self, text: impl Into<String>) {
        self.search_input.push(text.into());
    }

    /// Feed raw date range edits; applied once they settle.
    pub fn set_date_input(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        self.date_input.push((from, to));
    }

    pub fn has_pending_input(&self) -> bool {
        self.search_input.is_pending() || self.date_input.is_pending()
    }

    /// Apply any debounced inputs that have settled by `now`. Returns whether
    /// the filters changed.
    pub async fn settle_inputs(&mut self, now: Instant) -> Result<bool, CoreError> {
        let search = self.search_input.poll_at(now);
        let dates = self.date_input.poll_at(now);
        if search.is_none() && dates.is_none() {
            return Ok(false);
        }

        let mut next = self.filters.clone();
        if let Some(text) = search {
            next.search = Some(text);
        }
        if let Some((from, to)) = dates {
            next.date_from = from;
            next.date_to = to;
        }
        let next = next.normalized();
        let changed = next != self.filters;
        self.set_filter(next).await?;
        Ok(changed)
    }

    /// Sleep until the earliest pending input settles, then apply it.
    pub async fn wait_for_inputs(&mut self) -> Result<bool, CoreError> {
        let deadline = [self.search_input.deadline(), self.date_input.deadline()]
            .into_iter()
            .flatten()
            .min();
        match deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.settle_inputs(deadline).await
            }
            None => Ok(false),
        }
    }

    pub async fn set_page(&mut self, page: usize) -> Result<(), CoreError> {
        self.paginator.set_page(page);
        match self.mode {
            DataMode::Paged => self.fetch_paged().await,
            DataMode::Aggregate => {
                self.paginator.clamp_to(self.filtered_series.len());
                Ok(())
            }
        }
    }

    pub async fn next_page(&mut self) -> Result<(), CoreError> {
        let next = self.page() + 1;
        if next > self.total_pages() {
            return Ok(());
        }
        self.set_page(next).await
    }

    pub async fn prev_page(&mut self) -> Result<(), CoreError> {
        if self.page() <= 1 {
            return Ok(());
        }
        let prev = self.page() - 1;
        self.set_page(prev).await
    }

    pub async fn set_page_size(&mut self, page_size: usize) -> Result<(), CoreError> {
        self.paginator.set_page_size(page_size);
        match self.mode {
            DataMode::Paged => self.fetch_paged().await,
            DataMode::Aggregate => Ok(()),
        }
    }

    pub async fn toggle_mode(&mut self) -> Result<(), CoreError> {
        self.set_mode(self.mode.toggled()).await
    }

    pub async fn set_mode(&mut self, mode: DataMode) -> Result<(), CoreError> {
        if mode == self.mode {
            return Ok(());
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "switching data mode");
        self.paginator.first_page();
        match mode {
            DataMode::Aggregate => {
                self.page_data = TaskPage::default();
                self.mode = DataMode::Aggregate;
                self.fetch_aggregate().await
            }
            DataMode::Paged => {
                // The aggregate entry stays valid for the next switch back.
                self.cache
                    .invalidate_by_prefix(&CacheKey::kind_prefix(self.view(), EndpointKind::Paged));
                self.cache
                    .invalidate_by_prefix(&CacheKey::kind_prefix(self.view(), EndpointKind::Detail));
                self.series.clear();
                self.filtered_series.clear();
                self.mode = DataMode::Paged;
                self.fetch_paged().await
            }
        }
    }

    /// User-requested refresh: drop the active mode's cached data and refetch.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        let kind = match self.mode {
            DataMode::Paged => EndpointKind::Paged,
            DataMode::Aggregate => EndpointKind::Aggregate,
        };
        self.cache
            .invalidate_by_prefix(&CacheKey::kind_prefix(self.view(), kind));
        self.fetch_active().await
    }

    /// Drop every cached entry of this source's collection family.
    pub fn invalidate_family(&mut self) -> usize {
        self.cache
            .invalidate_by_prefix(&CacheKey::family_prefix(self.view()))
    }

    /// Refetch the active mode after a mutation.
    pub async fn reload(&mut self, at: ReloadAt) -> Result<(), CoreError> {
        if at == ReloadAt::FirstPage {
            self.paginator.first_page();
        }
        self.fetch_active().await
    }

    pub async fn reload_current(&mut self) -> Result<(), CoreError> {
        self.reload(ReloadAt::CurrentPage).await
    }

    /// Clear everything owned by this source. Call when the view goes away.
    pub fn teardown(&mut self) {
        self.cache.clear();
        self.search_input.cancel();
        self.date_input.cancel();
        self.page_data = TaskPage::default();
        self.series.clear();
        self.filtered_series.clear();
        self.paginator.first_page();
    }

    /// The detailed representation of one series, instances sorted by due date.
    pub async fn series_detail(&mut self, series_id: &str) -> Result<MasterSeriesRecord, CoreError> {
        let scope = self.viewer.scope();
        let key = CacheKey::detail(self.view(), series_id, &scope);
        if let Some(CachedResult::Detail(series)) = self.cache.get(&key, &scope) {
            return Ok(series);
        }

        self.loading = true;
        let result = self.api.fetch_series_detail(series_id).await;
        self.loading = false;

        let detail = match result {
            Ok(detail) => detail,
            Err(err) => {
                tracing::warn!(error = %err, series_id, "series detail fetch failed");
                self.notifier
                    .error(&format!("Failed to load series details: {}", err));
                return Err(CoreError::Network(err));
            }
        };

        let (mut reconciled, warnings) = reconcile_batch(vec![detail]);
        warnings.iter().for_each(IntegrityWarning::log);
        let mut detail = reconciled
            .pop()
            .ok_or_else(|| CoreError::NotFound(format!("Series {}", series_id)))?;
        detail.sort_tasks_by_due_date();
        self.cache.set(&key, CachedResult::Detail(detail.clone()), &scope);
        Ok(detail)
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    async fn fetch_active(&mut self) -> Result<(), CoreError> {
        match self.mode {
            DataMode::Paged => self.fetch_paged().await,
            DataMode::Aggregate => self.fetch_aggregate().await,
        }
    }

    /// Filters as sent to the server; non-privileged viewers are always
    /// scoped to themselves.
    fn server_filters(&self) -> FilterState {
        let mut filters = self.filters.clone();
        if !self.viewer.role.is_privileged() {
            filters.assignee = Some(self.viewer.user_id.clone());
        }
        filters
    }

    async fn fetch_paged(&mut self) -> Result<(), CoreError> {
        let page = self.fetch_page_at(self.paginator.page()).await?;

        // The collection shrank under us; land on its last page instead.
        let last_page = page.total_pages.max(1);
        if self.paginator.page() > last_page {
            self.paginator.set_page(last_page);
            self.page_data = if page.total_pages == 0 {
                page
            } else {
                self.fetch_page_at(last_page).await?
            };
        } else {
            self.page_data = page;
        }
        Ok(())
    }

    async fn fetch_page_at(&mut self, page: usize) -> Result<TaskPage, CoreError> {
        let scope = self.viewer.scope();
        let key = CacheKey::paged(self.view(), page, self.paginator.page_size(), &scope);
        let query = PageQuery::new(page, self.paginator.page_size(), &self.server_filters());

        if let Some(CachedResult::Page(cached)) = self.cache.get(&key, &query) {
            return Ok(cached);
        }

        self.loading = true;
        let result = self.api.fetch_page(&query).await;
        self.loading = false;

        match result {
            Ok(fetched) => {
                tracing::debug!(page, total = fetched.total, "fetched page");
                self.cache.set(&key, CachedResult::Page(fetched.clone()), &query);
                Ok(fetched)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn fetch_aggregate(&mut self) -> Result<(), CoreError> {
        let scope = self.viewer.scope();
        let key = CacheKey::aggregate(self.view(), &scope);

        if let Some(CachedResult::Series(cached)) = self.cache.get(&key, &scope) {
            self.series = cached;
            self.refilter();
            return Ok(());
        }

        self.loading = true;
        let result = self.load_series_collection().await;
        self.loading = false;

        match result {
            Ok(series) => {
                tracing::debug!(count = series.len(), "loaded series collection");
                self.cache.set(&key, CachedResult::Series(series.clone()), &scope);
                self.series = series;
                self.refilter();
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Light endpoint first. An empty light result is treated as degraded and
    /// answered from the full endpoint, reshaped to match.
    async fn load_series_collection(&self) -> Result<Vec<MasterSeriesRecord>, ApiError> {
        let light = self.api.fetch_series_light().await?;
        let (light, warnings) = reconcile_batch(light);
        warnings.iter().for_each(IntegrityWarning::log);
        if !light.is_empty() {
            return Ok(light);
        }

        tracing::warn!(view = %self.view(), "light series endpoint returned nothing, using full endpoint");
        let full = self.api.fetch_series_full(self.config.fallback_limit).await?;
        Ok(self.derive_from_full(full))
    }

    fn derive_from_full(&self, full: Vec<MasterSeriesRecord>) -> Vec<MasterSeriesRecord> {
        let (reconciled, warnings) = reconcile_batch(full);
        warnings.iter().for_each(IntegrityWarning::log);

        reconciled
            .into_iter()
            .filter(|series| series.task_type.is_recurring())
            .filter(|series| {
                self.viewer.role.is_privileged() || series.is_assigned_to(&self.viewer.user_id)
            })
            .map(|mut series| {
                series.sort_tasks_by_due_date();
                series
            })
            .collect()
    }

    fn refilter(&mut self) {
        let ctx = FilterContext::now(self.viewer.clone(), self.tz);
        self.filtered_series = FilterPipeline::apply(&self.series, &self.filters, &ctx);
        self.paginator.clamp_to(self.filtered_series.len());
    }

    /// Report a failed fetch and reset the affected collection. No retry.
    fn fail(&mut self, err: ApiError) -> CoreError {
        tracing::warn!(error = %err, mode = ?self.mode, view = %self.view(), "fetch failed");
        self.notifier.error(&format!("Failed to load tasks: {}", err));
        match self.mode {
            DataMode::Paged => {
                self.page_data = TaskPage {
                    total_pages: 1,
                    ..TaskPage::default()
                };
            }
            DataMode::Aggregate => {
                self.series.clear();
                self.filtered_series.clear();
            }
        }
        self.paginator.first_page();
        CoreError::Network(err)
    }
}
