use std::io::stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory as _, Parser as _};
use clap_complete::aot::generate;

use chowntree::cli::Args;
use chowntree::counters::Counters;
use chowntree::diagnostics::Diagnostics;
use chowntree::dirread;
use chowntree::error::ChownError;
use chowntree::pool::WorkerPool;
use chowntree::stats_printer;
use chowntree::task::DirectoryTask;
use chowntree::walker::WalkerEnv;

fn main() {
    let args = Args::parse();

    if let Some(shell) = args.generate_shell() {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_owned();
        generate(clap_complete::aot::Shell::from(shell), &mut cmd, name, &mut stdout());
        return;
    }

    match run(args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("chowntree: {e}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<(), ChownError> {
    let started = Instant::now();
    let parsed = args.resolve()?;
    let config = parsed.config;

    let counters = Arc::new(Counters::new());
    let diag = Arc::new(Diagnostics::new());

    let verbose_handle = (config.verbosity > 0).then(|| spawn_progress_reporter(Arc::clone(&counters)));

    let pool = Arc::new(WorkerPool::new(config.discipline.build(), config.worker_count));
    for dir in &parsed.dirs {
        let path = dir
            .to_str()
            .ok_or_else(|| ChownError::InvalidRoot {
                path: dir.display().to_string(),
                reason: "path is not valid UTF-8".to_string(),
            })?
            .to_string();
        let stat = dirread::lstat(&path).map_err(|e| ChownError::InvalidRoot {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        pool.seed(DirectoryTask::new(path, 0, &stat), &counters);
    }

    let env = Arc::new(WalkerEnv::new(Arc::clone(&config), Arc::clone(&counters), diag));
    pool.run(env);

    if let Some((stop, handle)) = verbose_handle {
        stop.store(true, Ordering::Relaxed);
        let _ = handle.join();
    }

    let snapshot = counters.snapshot();
    if config.print_stats {
        stats_printer::print_stats(&snapshot);
    }
    if config.print_elapsed {
        stats_printer::print_elapsed(started.elapsed());
    }

    Ok(())
}

/// `-v`: a background thread that wakes roughly once a second and prints the
/// delta in `entries_seen` since its last wake, until told to stop.
fn spawn_progress_reporter(counters: Arc<Counters>) -> (Arc<AtomicBool>, std::thread::JoinHandle<()>) {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);
    let handle = std::thread::spawn(move || {
        let mut last_seen = 0_u64;
        while !stop_clone.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_secs(1));
            let seen = counters.snapshot().entries_seen;
            eprintln!("chowntree: {} entries/s", seen.saturating_sub(last_seen));
            last_seen = seen;
        }
    });
    (stop, handle)
}
