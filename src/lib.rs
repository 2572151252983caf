//! # Folder Gal
//!
//! A local web gallery for folder-structured media collections. Point it at a
//! directory of photos, GIFs and videos and it serves a JSON API with folder
//! browsing, favorites, tags and a justified (Flickr-style) grid layout.
//!
//! # Architecture: Scan → Store → Serve
//!
//! ```text
//! 1. Scan    dataset/   →  SQLite rows + .thumbnails/   (background, per folder)
//! 2. Store   media rows →  paginated folder queries       (metadata cache)
//! 3. Serve   rows       →  justified layout → JSON        (per request)
//! ```
//!
//! A folder view never waits for a scan. The [`cache`] policy looks at when the
//! folder was last indexed; if that is too long ago (or never), a scan is
//! queued on the [`queue`] and the request is answered from whatever rows
//! already exist. The next request sees the refreshed data.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`layout`] | Justified row layout: item sizes in, rendered sizes out. Pure. |
//! | [`media`] | Classification, dimension/duration probing, JPEG thumbnails |
//! | [`scan`] | Walks a folder subtree and upserts media rows in batches |
//! | [`cache`] | Decides whether a folder's rows are fresh enough to serve |
//! | [`queue`] | Bounded, deduplicating worker pool for background scans |
//! | [`store`] | SQLite repository: media rows, favorites, tags |
//! | [`folders`] | Folder listing and breadcrumbs, derived from the filesystem |
//! | [`paths`] | Traversal-safe resolution of user supplied relative paths |
//! | [`gallery`] | The operations the HTTP API exposes |
//! | [`server`] | axum routes over [`gallery`] |
//! | [`config`] | `folder-gal.toml` loading, merging and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Greedy Rows, Exact Widths
//!
//! The layout engine fills rows greedily at the target row height and then
//! rescales each closed row so it spans the container exactly. This is a
//! single linear pass; a full dynamic-programming justified layout would pick
//! slightly better row breaks, but at gallery scale the difference is not
//! visible. See [`layout::justify`].
//!
//! ## Thumbnails Next To The Source
//!
//! Thumbnails live in a hidden `.thumbnails/` directory beside the files they
//! preview and are only regenerated when the source is newer than the
//! thumbnail. Deleting a dataset folder deletes its thumbnails with it, and a
//! rescan of an unchanged folder encodes nothing.
//!
//! ## Video Through ffmpeg
//!
//! Images and GIFs are decoded in-process with the `image` crate. Videos are
//! probed with `ffprobe` and their first frame is extracted with `ffmpeg`.
//! Both tools are optional at runtime: without them videos are still listed,
//! just without dimensions or thumbnails.

pub mod cache;
pub mod config;
pub mod folders;
pub mod gallery;
pub mod layout;
pub mod logging;
pub mod media;
pub mod output;
pub mod paths;
pub mod queue;
pub mod scan;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
