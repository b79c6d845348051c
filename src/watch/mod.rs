// src/watch/mod.rs

//! Directory watching building blocks.
//!
//! This module is responsible for:
//! - The native per-directory watch abstraction ([`primitive`]) and its
//!   `notify` implementation ([`notify_backend`]).
//! - Enumerating directory trees ([`walker`]).
//! - Deciding which entries are invisible (hidden marker, exclude globs).
//! - The table of live watches ([`set`]).
//! - The public [`Watcher`] handle.
//!
//! The policy tying these together lives in `crate::engine`.

pub mod notify_backend;
pub mod path_utils;
pub mod patterns;
pub mod primitive;
pub mod set;
pub mod walker;
pub mod watcher;

pub use notify_backend::NotifyPrimitive;
pub use patterns::EntryFilter;
pub use primitive::{RawEventSink, WatchHandle, WatchOptions, WatchPrimitive};
pub use set::{EntryId, WatchEntry, WatchSet};
pub use walker::{DirectoryWalker, WalkId, WalkItem, WalkRequest, WalkSink, WalkdirWalker};
pub use watcher::{Ready, Watcher, WatcherBuilder};
