#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! HTTP client and artifact download for forma
//!
//! Network access happens in exactly one place in the pipeline: fetching the
//! formula's source artifact. The client pools connections and retries
//! transient failures within a single fetch attempt; the pipeline itself
//! never retries.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{download_to_path, filename_from_url, DownloadResult};
