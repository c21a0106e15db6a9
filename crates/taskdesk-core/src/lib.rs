//! # Taskdesk Core Library
//!
//! Client-side data engine for recurring-task dashboards: caching,
//! pagination, filtering and bulk operations over master series and their
//! instances, served by a remote task API.
//!
//! ## Features
//!
//! - **Dual-Mode Data Source**: server-side paging or a client-side
//!   aggregate of the whole series collection, switchable at runtime
//! - **TTL Cache**: per-source cache keyed by collection family, window and
//!   viewer scope, with parameter fingerprints and prefix invalidation
//! - **Filter Pipeline**: pure, composable stages shared by instances and series
//! - **Debounced Inputs**: search and date range edits settle before they fetch
//! - **Mutations**: delete, restore, purge and reassign with attachment decisions
//! - **Bulk Reassignment**: concurrent reassign with eligibility checks and
//!   partial-failure accounting
//!
//! ## Core Modules
//!
//! - [`api`]: Remote endpoint adapter (`TaskApi`) and its HTTP implementation
//! - [`cache`]: TTL cache store and key scheme
//! - [`source`]: The dual-mode data source
//! - [`filter`]: In-memory filter pipeline
//! - [`paginate`]: Page slicing and navigation
//! - [`debounce`]: Quiet-period input coalescing
//! - [`mutation`]: Single-record mutations
//! - [`bulk`]: Multi-series reassignment sessions
//! - [`models`]: Wire records, filter state and engine configuration
//! - [`timezone`]: Local-midnight and timezone helpers
//! - [`notify`]: User-visible notifications
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use taskdesk_core::{
//!     api::HttpTaskApi,
//!     models::{EngineConfig, FilterState, Role, Viewer, ViewKind},
//!     source::{DataMode, DataSource},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = HttpTaskApi::new("https://tasks.example.com/api/tasks", ViewKind::Recurring, "acme")?;
//!     let viewer = Viewer::new("u1", Role::Admin);
//!     let mut source = DataSource::new(api, viewer, chrono_tz::UTC, EngineConfig::default())
//!         .with_mode(DataMode::Aggregate);
//!
//!     source.load().await?;
//!     source
//!         .set_filter(FilterState {
//!             search: Some("report".to_string()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("{} matching series", source.total());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bulk;
pub mod cache;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod models;
pub mod mutation;
pub mod notify;
pub mod paginate;
pub mod source;
pub mod timezone;
