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

// Demo: a composite widget relays its button's clicks on its own channel.
// Run with: RUST_LOG=trace cargo run -p sandbox -- <clicks>

use anyhow::Context;
use beacon_core::{ChannelConfig, EventChannel};
use std::cell::Cell;
use std::rc::Rc;

struct Button {
    clicked: EventChannel<u32>,
}

struct Toolbar {
    button: Button,
    clicked: EventChannel<u32>,
}

impl Toolbar {
    fn new() -> Self {
        let toolbar = Self {
            button: Button {
                clicked: EventChannel::with_config(ChannelConfig::labeled("button.clicked")),
            },
            clicked: EventChannel::with_config(ChannelConfig::labeled("toolbar.clicked")),
        };
        toolbar.button.clicked.forward(&toolbar.clicked);
        toolbar
    }
}

struct StatusBar {
    clicks: Cell<u32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let clicks = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("invalid click count: {arg}"))?,
        None => 3,
    };

    let toolbar = Toolbar::new();
    let status = Rc::new(StatusBar {
        clicks: Cell::new(0),
    });

    toolbar.clicked.add(&status, |bar, n| {
        bar.clicks.set(bar.clicks.get() + 1);
        log::info!("Status bar saw click #{n}.");
    });
    toolbar.clicked.once_payload(&status, |n| {
        log::info!("First click observed (#{n}).");
    });

    for n in 1..=clicks {
        toolbar.button.clicked.notify(&n);
    }
    log::info!("Status bar counted {} click(s).", status.clicks.get());

    drop(status);
    toolbar.button.clicked.notify(&0);
    log::info!(
        "After dropping the status bar the toolbar has {} listener(s).",
        toolbar.clicked.listener_count()
    );

    Ok(())
}
