// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Beacon Core
//!
//! A generic publish/subscribe primitive: typed event channels with weakly
//! held listeners, one-shot subscriptions and channel-to-channel forwarding.
//!
//! Dispatch is synchronous and single-threaded. See [`EventChannel`] for the
//! ordering and reentrancy rules.

#![warn(missing_docs)]

pub mod event;

pub use event::{ChannelConfig, EventChannel};
