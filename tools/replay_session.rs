// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Session Replay Tool

Replays a JSON-lines log of raw armband records through the dispatcher using
the scripted backend, reacting the way the pose demo does: a Fist vibrates the
armband (Medium), every connect asks for a signal-strength sample.

Usage:
  cargo run --bin replay_session -- <events.jsonl> [options] [--debug-<crate>]

Options:
  --config <path>        Configuration file (default: search for armband.toml)
  --profile-dir <dir>    Override profiles.storage_dir
  --log-level <level>    Override logging.level
  --log-dir <dir>        Write JSON log files under <dir> (needs the file-logging feature)
  --no-load              Do not restore stored profiles on connect
  --train                Train and save a profile for every live device at the end

Each line is one record, e.g.
  {"handle": 1, "kind": 1, "timestamp_us": 1000}
  {"handle": 1, "kind": 4, "timestamp_us": 2000, "pose": 1}
*/

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use armband::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ArmbandConfig,
    ConfigError,
};
use armband::device::{
    Device, DeviceRegistry, EventDispatcher, Pose, RawEvent, ScriptedBackend, VibrationType,
};
use armband::logging_config;
use armband::observability::{debug_flags_help, init_logging, parse_debug_flags};

struct Options {
    events: PathBuf,
    config: Option<PathBuf>,
    overrides: HashMap<String, String>,
    train: bool,
}

fn usage() -> String {
    format!(
        "Usage: replay_session <events.jsonl> [--config <path>] [--profile-dir <dir>] \
         [--log-level <level>] [--log-dir <dir>] [--no-load] [--train]\n\n{}",
        debug_flags_help()
    )
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut events = None;
    let mut config = None;
    let mut overrides = HashMap::new();
    let mut train = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().context("--config needs a path")?;
                config = Some(PathBuf::from(value));
            }
            "--profile-dir" => {
                let value = iter.next().context("--profile-dir needs a directory")?;
                overrides.insert("profile_dir".to_string(), value.clone());
            }
            "--log-level" => {
                let value = iter.next().context("--log-level needs a level")?;
                overrides.insert("log_level".to_string(), value.clone());
            }
            "--log-dir" => {
                let value = iter.next().context("--log-dir needs a directory")?;
                overrides.insert("log_dir".to_string(), value.clone());
            }
            "--no-load" => {
                overrides.insert("load_on_connect".to_string(), "false".to_string());
            }
            "--train" => train = true,
            // Handled by parse_debug_flags
            flag if flag.starts_with("--debug-") => {}
            flag if flag.starts_with("--") => bail!("Unknown option {}\n\n{}", flag, usage()),
            path => {
                if events.replace(PathBuf::from(path)).is_some() {
                    bail!("Only one event log can be replayed\n\n{}", usage());
                }
            }
        }
    }

    let Some(events) = events else {
        bail!("Missing event log\n\n{}", usage());
    };

    Ok(Options {
        events,
        config,
        overrides,
        train,
    })
}

/// Explicit path must exist; a missing searched-for file falls back to defaults
fn load_configuration(options: &Options) -> Result<ArmbandConfig> {
    let config = match load_config(options.config.as_deref(), Some(&options.overrides)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) if options.config.is_none() => {
            let mut config = ArmbandConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &options.overrides);
            config
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    validate_config(&config)?;
    Ok(config)
}

fn read_events(path: &Path) -> Result<Vec<RawEvent>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: RawEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), index + 1))?;
        events.push(event);
    }
    Ok(events)
}

fn attach_reactions(device: &Arc<Device>) {
    device.on_connected(|event| {
        info!("[REPLAY] {} connected", event.device().hardware_id());
        event.device().request_rssi()?;
        Ok(())
    });

    device.on_disconnected(|event| {
        info!(
            "[REPLAY] {} disconnected at {}us",
            event.device().hardware_id(),
            event.timestamp().as_micros()
        );
        Ok(())
    });

    device.on_pose_changed(|event| {
        let pose = *event.data();
        info!("[REPLAY] {} pose -> {}", event.device().hardware_id(), pose);
        if pose == Pose::Fist {
            event.device().vibrate(VibrationType::Medium)?;
        }
        Ok(())
    });

    device.on_signal_strength(|event| {
        info!("[REPLAY] {} rssi {} dBm", event.device().hardware_id(), event.data());
        Ok(())
    });

    device.on_orientation(|event| {
        let q = event.data();
        debug!(
            "[REPLAY] {} orientation ({:.3}, {:.3}, {:.3}, {:.3})",
            event.device().hardware_id(),
            q.x,
            q.y,
            q.z,
            q.w
        );
        Ok(())
    });
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", usage());
        return Ok(());
    }

    let options = parse_options(&args)?;
    let config = load_configuration(&options)?;
    let logging = init_logging(&parse_debug_flags(), &logging_config(&config.logging))?;
    if let Some(dir) = logging.log_dir() {
        info!("[REPLAY] Writing logs to {}", dir.display());
    }

    let events = read_events(&options.events)?;
    info!(
        "[REPLAY] Replaying {} records from {}",
        events.len(),
        options.events.display()
    );

    let backend = ScriptedBackend::new();
    backend.extend(events);

    let registry = Arc::new(DeviceRegistry::new(backend.shared()));
    let dispatcher =
        EventDispatcher::from_config(Arc::clone(&registry), &config).with_session_hook(attach_reactions);

    let mut source = backend.source();
    let mut total = 0;
    loop {
        let pulled = dispatcher.drain(&mut source)?;
        if pulled == 0 {
            break;
        }
        total += pulled;
    }
    info!("[REPLAY] Dispatched {} records", total);

    if options.train {
        let profiles = dispatcher
            .profiles()
            .context("Dispatcher was built without a profile manager")?;
        for device in registry.live_devices() {
            if !device.is_connected() {
                warn!(
                    "[REPLAY] Skipping training for {}: handle no longer valid",
                    device.hardware_id()
                );
                continue;
            }
            profiles.train(&device)?;
            profiles.save(&device)?;
        }
    }

    for device in registry.live_devices() {
        info!(
            "[REPLAY] {}: pose {}, trained {}",
            device.hardware_id(),
            device.pose(),
            device.is_trained()
        );
    }
    let vibrations = backend.vibrations().len();
    if vibrations > 0 {
        info!("[REPLAY] {} vibration(s) requested", vibrations);
    }
    if registry.is_empty() && total > 0 {
        warn!("[REPLAY] No devices left connected at end of log");
    }

    Ok(())
}
