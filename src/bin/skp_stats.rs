//! Diagnostic: print statistics of a model file and optionally re-save it.
//!
//! ```text
//! skp_stats <input> [<output> [<version>]]
//! ```
//!
//! `version` is a format name such as `SU2017`; the default is the current
//! format. Set `RUST_LOG=skpdoc=debug` to trace section decoding.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use skpdoc::{EntityKind, Model, ModelVersion};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        bail!("usage: skp_stats <input> [<output> [<version>]]");
    };
    let output = args.next().map(PathBuf::from);
    let version = match args.next() {
        Some(name) => ModelVersion::parse(&name)
            .with_context(|| format!("unknown format version '{name}'"))?,
        None => ModelVersion::CURRENT,
    };

    let mut model = Model::load_from_file(&input)
        .with_context(|| format!("failed to load {}", input.display()))?;

    println!("Model:   {}", model.title());
    println!("Written: {}", model.version());
    println!("GUID:    {}", model.guid());
    println!("Units:   {:?}", model.units());

    let stats = model.statistics();
    println!("\n--- Statistics ---");
    for kind in EntityKind::STATISTICS {
        println!("  {:<22} {}", kind.name(), stats.count(kind));
    }

    println!("\n--- Layers ---");
    let default_layer = model.default_layer();
    for pid in model.layers(usize::MAX) {
        let layer = model.entity(pid)?;
        let marker = if pid == default_layer { " (default)" } else { "" };
        println!("  {pid:>6}  {}{marker}", layer.name().unwrap_or_default());
    }

    if model.num_scenes() > 0 {
        println!("\n--- Scenes ---");
        for pid in model.scenes(usize::MAX)? {
            println!("  {pid:>6}  {}", model.entity(pid)?.name().unwrap_or_default());
        }
    }

    if !model.notifications.is_empty() {
        println!("\n--- Notifications ---");
        for note in &model.notifications {
            println!("  {note}");
        }
    }

    if let Some(output) = output {
        model
            .save_with_version(&output, version)
            .with_context(|| format!("failed to save {} as {version}", output.display()))?;
        println!("\nSaved {} ({version}, GUID {})", output.display(), model.guid());
    }
    Ok(())
}
