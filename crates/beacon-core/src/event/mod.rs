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

//! Provides the weak-listener event channel.
//!
//! An [`EventChannel`] notifies listeners synchronously with a typed payload.
//! Listeners are bound to an owner object that the channel only references
//! weakly, so a subscription never keeps its observer alive. Channels can be
//! chained with [`EventChannel::forward`] to build relay topologies.

mod channel;
mod config;
mod registration;

pub use self::channel::EventChannel;
pub use self::config::ChannelConfig;
