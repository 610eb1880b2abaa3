// Copyright 2025 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmark-only member crate; see the `benches/` directory.
