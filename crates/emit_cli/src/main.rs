//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `emit_core` linkage and run one publish cycle end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `emit_cli [LOG_DIR [LEVEL]]`. Logging is only enabled when
//! `LOG_DIR` is given; `LEVEL` defaults to the build's default level.

use emit_core::{
    ListenerError, LogConfig, Property, PropertyGroup, PropertyGroupChangeListener,
    PropertyGroupResult,
};
use std::collections::BTreeSet;
use std::process::ExitCode;
use std::rc::Rc;

struct PrintingListener;

impl PropertyGroupChangeListener for PrintingListener {
    fn apply_properties(
        &self,
        group_id: &str,
        changed_ids: &BTreeSet<String>,
    ) -> Result<(), ListenerError> {
        let changed = changed_ids.iter().cloned().collect::<Vec<_>>().join(",");
        println!("group changed: {group_id} [{changed}]");
        Ok(())
    }
}

fn run() -> PropertyGroupResult<()> {
    let mut water = PropertyGroup::new("triton", "Water Surface");
    water.register_property(Property::new("height", 0.0_f32, "Ocean Height (m)"))?;

    let mut sky = PropertyGroup::new("silverlining", "Sky");
    sky.register_property(Property::new("brightness", 0.0_f32, "Sky Brightness"))?;

    let listener = Rc::new(PrintingListener);
    water.add_change_listener(&listener);
    sky.add_change_listener(&listener);

    water.set("height", 11.0_f32)?;
    water.apply()?;
    sky.apply()?;

    if let Some(height) = water.get::<f32>("height") {
        println!("triton.height={height}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(log_dir) = args.first() {
        let configured = LogConfig::from_args(log_dir, args.get(1).map(String::as_str))
            .and_then(|config| emit_core::init_logging(&config));
        if let Err(err) = configured {
            eprintln!("emit_cli: {err}");
            return ExitCode::FAILURE;
        }
    }

    println!("emit_core version={}", emit_core::core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("emit_cli: {err}");
            ExitCode::FAILURE
        }
    }
}
