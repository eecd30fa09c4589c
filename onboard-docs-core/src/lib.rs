#![doc = "onboard-docs-core: document generation and publishing library for onboard-docs."]

//! This crate holds the data models, document pipelines and remote-drive client
//! used by the `onboard-docs` CLI.
//!
//! # Layout
//! - generation: [`payload`], [`form_filler`], [`docx`], [`converter`], [`template_renderer`]
//! - publishing: [`credentials`], [`graph`], [`session`], [`catalog`], [`provision`], [`uploader`]
//! - [`orchestrate`] ties both halves together; [`contract`] holds the trait seams.

pub mod catalog;
pub mod config;
pub mod contract;
pub mod converter;
pub mod credentials;
pub mod docx;
pub mod error;
pub mod form_filler;
pub mod graph;
pub mod orchestrate;
pub mod payload;
pub mod provision;
pub mod session;
pub mod template_renderer;
pub mod uploader;

pub use error::{DocError, Result};
