mod script;

use anyhow::{bail, Context};
use script::{Replay, Script};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use trimline_core::media::SimulatedMedia;
use trimline_core::{EditorConfig, SaveScheduler, TrimEditor};
use trimline_sync::{AutoSave, HttpPersistence, SyncConfig};
use trimline_sync::save_flow::SaveFlow;

const USAGE: &str = "usage: trimline-replay <script.json> [--config editor.json] [--sync sync.json]";

struct Args {
    script: PathBuf,
    editor_config: Option<PathBuf>,
    sync_config: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut script = None;
        let mut editor_config = None;
        let mut sync_config = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => editor_config = args.next().map(PathBuf::from),
                "--sync" => sync_config = args.next().map(PathBuf::from),
                "-h" | "--help" => bail!(USAGE),
                other if script.is_none() => script = Some(PathBuf::from(other)),
                other => bail!("unexpected argument {other:?}\n{USAGE}"),
            }
        }
        let Some(script) = script else {
            bail!(USAGE);
        };
        Ok(Self {
            script,
            editor_config,
            sync_config,
        })
    }
}

/// Offline stand-in for auto-save: counts the signals it would have acted on.
struct SignalCounter(Rc<Cell<usize>>);

impl SaveScheduler for SignalCounter {
    fn schedule_save(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    let editor_config = match &args.editor_config {
        Some(path) => EditorConfig::load_from_file(path)
            .with_context(|| format!("loading editor config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let data = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&data).context("parsing script")?;

    let mut editor = TrimEditor::new(SimulatedMedia::new(script.duration), editor_config);

    let report = match &args.sync_config {
        Some(path) => {
            let sync = SyncConfig::load_from_file(path)
                .with_context(|| format!("loading sync config {}", path.display()))?;
            let persistence = Arc::new(HttpPersistence::new(&sync));
            let autosave = AutoSave::spawn(persistence.clone(), editor.mirror(), &sync);
            editor.set_save_scheduler(Box::new(autosave.handle()));
            let flow = SaveFlow::new(persistence, &sync);

            let mut replay = Replay::new(editor);
            replay.run(&script, Some(&flow)).await?;

            // Give the last debounced save time to land.
            tokio::time::sleep(sync.autosave_debounce() + Duration::from_millis(250)).await;
            let status = autosave.status().borrow().clone();
            tracing::info!(
                saves = status.saves,
                failures = status.failures,
                last_saved_at = ?status.last_saved_at,
                "auto-save finished"
            );
            autosave.shutdown();
            replay.report()
        }
        None => {
            let signals = Rc::new(Cell::new(0));
            editor.set_save_scheduler(Box::new(SignalCounter(signals.clone())));

            let mut replay = Replay::new(editor);
            replay.run::<HttpPersistence>(&script, None).await?;
            tracing::info!(
                signals = signals.get(),
                segments = replay.editor().segments().len(),
                "auto-save signals (offline)"
            );
            replay.report()
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> anyhow::Result<Args> {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_script_and_flags() {
        let parsed = args(&["demo.json", "--config", "editor.json", "--sync", "sync.json"]).unwrap();
        assert_eq!(parsed.script, PathBuf::from("demo.json"));
        assert_eq!(parsed.editor_config, Some(PathBuf::from("editor.json")));
        assert_eq!(parsed.sync_config, Some(PathBuf::from("sync.json")));
    }

    #[test]
    fn script_is_required() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }
}
