//! Periodic Reporter
//!
//! A background task that, once per interval, rotates both pools, ranks the
//! closed windows and writes the report to stdout and/or a file.
//!
//! ## Design
//!
//! The reporter runs as a Tokio task and:
//! 1. Sleeps for the remainder of the interval
//! 2. Rotates the key and error pools
//! 3. Renders one line per ranked entry
//! 4. Writes the lines, logging (not propagating) write failures
//!
//! Time spent reporting is subtracted from the next sleep. An overrun gives a
//! zero sleep, never a burst of catch-up reports.

use crate::config::Config;
use crate::pool::{HotKeyEntry, HotKeyPool, ReportLimit, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the reporter.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Time between reports (default: 5s)
    pub interval: Duration,

    /// Prefix of every metric name
    pub namespace: String,

    /// How many key entries each report carries
    pub key_limit: ReportLimit,

    /// Whether the error pool is reported
    pub show_errors: bool,

    /// Suppress stdout output
    pub quiet: bool,

    /// File overwritten with every report
    pub output_file: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig::from(&Config::default())
    }
}

impl From<&Config> for ReportConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.interval_duration(),
            namespace: config.namespace.clone(),
            // Pattern names are few, so they are all reported
            key_limit: ReportLimit::new(config.num_items_to_report, config.has_patterns()),
            show_errors: config.show_errors,
            quiet: config.quiet,
            output_file: config.output_file.clone(),
        }
    }
}

/// Renders one report from the closed key and error windows.
///
/// ```
/// use keyheat::pool::{HotKeyPool, Observation};
/// use keyheat::report::{render, ReportConfig};
///
/// let keys = HotKeyPool::new();
/// keys.record(&[Observation::new("user", "get"), Observation::new("user", "get")]);
///
/// let report = render(keys.rotate(), HotKeyPool::new().rotate(), &ReportConfig::default());
/// assert_eq!(report, "keyheat.keys.user get 2\n");
/// ```
pub fn render(keys: Snapshot, errors: Snapshot, config: &ReportConfig) -> String {
    let mut out = String::new();

    for HotKeyEntry { name, command, hits } in keys.top(config.key_limit) {
        out.push_str(&format!("{}.keys.{} {} {}\n", config.namespace, name, command, hits));
    }

    if config.show_errors {
        for HotKeyEntry { name, hits, .. } in errors.top(ReportLimit::Unlimited) {
            out.push_str(&format!("{}.errors.{} {}\n", config.namespace, name, hits));
        }
    }

    out
}

/// What the reporter task should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Run,
    Stop,
    FlushAndStop,
}

/// A handle to the running reporter.
///
/// When this handle is dropped, the reporter task is stopped without a
/// final report. Use [`Reporter::shutdown`] to flush the current window.
#[derive(Debug)]
pub struct Reporter {
    /// Sender to signal shutdown
    signal_tx: watch::Sender<Signal>,

    /// The reporting task, taken by `shutdown`
    task: Option<JoinHandle<()>>,
}

impl Reporter {
    /// Starts the reporter as a background task.
    ///
    /// # Arguments
    ///
    /// * `keys` - Pool of key observations
    /// * `errors` - Pool of error observations
    /// * `config` - Output settings
    pub fn start(keys: Arc<HotKeyPool>, errors: Arc<HotKeyPool>, config: ReportConfig) -> Self {
        let (signal_tx, signal_rx) = watch::channel(Signal::Run);

        info!(
            interval_secs = config.interval.as_secs_f64(),
            namespace = %config.namespace,
            output_file = ?config.output_file,
            "Reporter started"
        );

        let task = tokio::spawn(report_loop(keys, errors, config, signal_rx));

        Self {
            signal_tx,
            task: Some(task),
        }
    }

    /// Stops the reporter without a final report.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.signal_tx.send(Signal::Stop);
    }

    /// Emits one last report for the open window, then waits for the task.
    pub async fn shutdown(mut self) {
        let _ = self.signal_tx.send(Signal::FlushAndStop);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Reporter task failed");
            }
        }
        info!("Reporter stopped");
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop();
        }
    }
}

/// The main reporting loop.
async fn report_loop(
    keys: Arc<HotKeyPool>,
    errors: Arc<HotKeyPool>,
    config: ReportConfig,
    mut signal_rx: watch::Receiver<Signal>,
) {
    let mut sleep_for = config.interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            result = signal_rx.changed() => {
                let signal = if result.is_err() { Signal::Stop } else { *signal_rx.borrow() };
                match signal {
                    Signal::Run => continue,
                    Signal::Stop => {
                        debug!("Reporter received shutdown signal");
                        return;
                    }
                    Signal::FlushAndStop => {
                        debug!("Reporter flushing final window");
                        report_once(&keys, &errors, &config).await;
                        return;
                    }
                }
            }
        }

        let started = Instant::now();
        report_once(&keys, &errors, &config).await;
        let elapsed = started.elapsed();

        if elapsed > config.interval {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                interval_ms = config.interval.as_millis(),
                "Report overran the interval"
            );
        }
        sleep_for = config.interval.saturating_sub(elapsed);
    }
}

/// Rotates both pools and writes one report.
async fn report_once(keys: &HotKeyPool, errors: &HotKeyPool, config: &ReportConfig) {
    let key_window = keys.rotate();
    let error_window = errors.rotate();

    debug!(
        keys = key_window.len(),
        key_hits = key_window.total_hits(),
        errors = error_window.total_hits(),
        window_ms = key_window.window().as_millis(),
        "Pools rotated"
    );

    let report = render(key_window, error_window, config);

    if !config.quiet && !report.is_empty() {
        let mut stdout = tokio::io::stdout();
        let written = async {
            stdout.write_all(report.as_bytes()).await?;
            stdout.flush().await
        };
        if let Err(e) = written.await {
            error!(error = %e, "Failed to write report to stdout");
        }
    }

    if let Some(path) = &config.output_file {
        if let Err(e) = tokio::fs::write(path, report.as_bytes()).await {
            error!(path = %path.display(), error = %e, "Failed to write report file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Observation;

    fn config(limit: ReportLimit) -> ReportConfig {
        ReportConfig {
            interval: Duration::from_millis(50),
            namespace: "mc".to_string(),
            key_limit: limit,
            show_errors: true,
            quiet: true,
            output_file: None,
        }
    }

    fn pool(observations: &[(&str, &str)]) -> HotKeyPool {
        let pool = HotKeyPool::new();
        for (name, command) in observations {
            pool.record(&[Observation::new(name, command)]);
        }
        pool
    }

    #[test]
    fn test_render_lines() {
        let keys = pool(&[("a", "get"), ("a", "get"), ("b", "set")]);
        let errors = pool(&[("invalid_cmd", ""), ("truncated", ""), ("truncated", "")]);

        let report = render(keys.rotate(), errors.rotate(), &config(ReportLimit::Top(20)));
        assert_eq!(
            report,
            "mc.keys.a get 2\nmc.keys.b set 1\nmc.errors.truncated 2\nmc.errors.invalid_cmd 1\n"
        );
    }

    #[test]
    fn test_render_caps_keys_but_not_errors() {
        let keys = pool(&[("a", "get"), ("a", "get"), ("b", "get"), ("c", "get")]);
        let errors = pool(&[("x", ""), ("y", ""), ("z", "")]);

        let report = render(keys.rotate(), errors.rotate(), &config(ReportLimit::Top(1)));
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "mc.keys.a get 2");
        assert_eq!(lines.iter().filter(|l| l.contains(".keys.")).count(), 1);
        assert_eq!(lines.iter().filter(|l| l.contains(".errors.")).count(), 3);
    }

    #[test]
    fn test_render_cardinality_bound() {
        let keys = HotKeyPool::new();
        for (name, hits) in [("a", 5), ("b", 3), ("c", 1)] {
            for _ in 0..hits {
                keys.record(&[Observation::new(name, "get")]);
            }
        }

        let report = render(keys.rotate(), HotKeyPool::new().rotate(), &config(ReportLimit::Top(2)));
        assert_eq!(report, "mc.keys.a get 5\nmc.keys.b get 3\n");
    }

    #[test]
    fn test_render_empty_window() {
        let report = render(
            HotKeyPool::new().rotate(),
            HotKeyPool::new().rotate(),
            &config(ReportLimit::Unlimited),
        );
        assert!(report.is_empty());
    }

    #[test]
    fn test_render_hides_errors() {
        let errors = pool(&[("invalid_key", "")]);
        let mut cfg = config(ReportLimit::Unlimited);
        cfg.show_errors = false;

        let report = render(HotKeyPool::new().rotate(), errors.rotate(), &cfg);
        assert!(report.is_empty());
    }

    #[test]
    fn test_config_uncapped_with_patterns() {
        let mut cfg = Config {
            num_items_to_report: 3,
            ..Config::default()
        };
        assert_eq!(ReportConfig::from(&cfg).key_limit, ReportLimit::Top(3));

        cfg.regexps.push(crate::config::RegexpConfig {
            re: "^a".into(),
            name: "a".into(),
        });
        assert_eq!(ReportConfig::from(&cfg).key_limit, ReportLimit::Unlimited);
    }

    #[tokio::test]
    async fn test_reporter_rotates_each_interval() {
        let keys = Arc::new(HotKeyPool::new());
        let errors = Arc::new(HotKeyPool::new());
        keys.record(&[Observation::new("hot", "get")]);
        errors.record(&[Observation::new("no_cmd", "")]);

        let reporter = Reporter::start(
            Arc::clone(&keys),
            Arc::clone(&errors),
            config(ReportLimit::Top(20)),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(keys.is_empty());
        assert!(errors.is_empty());
        assert!(keys.stats().rotations >= 2);
        reporter.shutdown().await;
    }

    #[tokio::test]
    async fn test_report_overwrites_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.out");
        tokio::fs::write(&path, "stale.keys.old get 99\n").await.unwrap();

        let keys = Arc::new(HotKeyPool::new());
        let mut cfg = config(ReportLimit::Top(20));
        cfg.interval = Duration::from_secs(3600);
        cfg.output_file = Some(path.clone());
        let reporter = Reporter::start(Arc::clone(&keys), Arc::new(HotKeyPool::new()), cfg);

        keys.record(&[Observation::new("later", "set")]);
        reporter.shutdown().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "mc.keys.later set 1\n");
    }

    #[tokio::test]
    async fn test_shutdown_flushes_final_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.out");

        let keys = Arc::new(HotKeyPool::new());
        let errors = Arc::new(HotKeyPool::new());

        let mut cfg = config(ReportLimit::Top(20));
        cfg.interval = Duration::from_secs(3600);
        cfg.output_file = Some(path.clone());
        let reporter = Reporter::start(Arc::clone(&keys), Arc::clone(&errors), cfg);

        keys.record(&[Observation::new("k", "get"), Observation::new("k", "get")]);
        errors.record(&[Observation::new("no_cmd", "")]);
        reporter.shutdown().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "mc.keys.k get 2\nmc.errors.no_cmd 1\n");
    }

    #[tokio::test]
    async fn test_drop_stops_without_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.out");

        let keys = Arc::new(HotKeyPool::new());
        let mut cfg = config(ReportLimit::Top(20));
        cfg.interval = Duration::from_secs(3600);
        cfg.output_file = Some(path.clone());

        let reporter = Reporter::start(Arc::clone(&keys), Arc::new(HotKeyPool::new()), cfg);
        keys.record(&[Observation::new("k", "get")]);
        drop(reporter);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!path.exists());
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_not_fatal() {
        let keys = Arc::new(HotKeyPool::new());
        let mut cfg = config(ReportLimit::Top(20));
        cfg.output_file = Some(PathBuf::from("/nonexistent/dir/report.out"));

        let reporter = Reporter::start(Arc::clone(&keys), Arc::new(HotKeyPool::new()), cfg);
        keys.record(&[Observation::new("k", "get")]);
        tokio::time::sleep(Duration::from_millis(120)).await;

        // Still rotating after the failed writes
        assert!(keys.is_empty());
        reporter.shutdown().await;
    }
}
