// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns workflow-engine log batches into duration metrics.
//!
//! A batch travels `decoder` → `classifier` → `correlator` → (`fetcher`) →
//! `publisher`, sequenced per record by the [`driver::BatchDriver`]. The
//! [`receiver::LogReceiver`] exposes the driver over HTTP.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod classifier;
pub mod config;
pub mod correlator;
pub mod decoder;
pub mod driver;
pub mod errors;
pub mod fetcher;
pub mod http_utils;
pub mod logger;
pub mod metric;
pub mod publisher;
pub mod receiver;
pub mod util;
pub mod workflow;
