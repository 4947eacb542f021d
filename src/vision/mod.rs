// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image ingestion for the detection service
//!
//! Turns uploaded bytes into a decoded pixel grid plus the image's true
//! dimensions. Decoding is the only place client bytes are interpreted, so
//! every malformed-input failure is a typed [`DecodeError`] here.

pub mod ingest;

pub use ingest::{decode_image, detect_format, DecodeError, DecodedImage};
