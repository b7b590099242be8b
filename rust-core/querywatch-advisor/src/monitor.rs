// SPDX-License-Identifier: PMPL-1.0-or-later
//! Periodic cache monitor.
//!
//! Polls a [`CacheStatisticsSource`] on a fixed schedule, logs the counters,
//! and emits an [`OptimizationReport`] per cycle. The first evaluation runs
//! as soon as the monitor starts. A failed cycle is logged and the schedule
//! continues. Each cycle runs on the blocking thread pool, so sources may do
//! blocking I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{CacheAdvisor, CacheGauges, CacheStatisticsSource, OptimizationReport};
use crate::config::MonitorConfig;
use crate::error::AdvisorError;

/// Scheduled cache evaluation, not yet started.
pub struct CacheMonitor {
    source: Arc<dyn CacheStatisticsSource>,
    advisor: CacheAdvisor,
    config: MonitorConfig,
    report_sender: Option<mpsc::Sender<OptimizationReport>>,
    gauges: Option<CacheGauges>,
}

impl CacheMonitor {
    pub fn new(
        source: Arc<dyn CacheStatisticsSource>,
        advisor: CacheAdvisor,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            advisor,
            config,
            report_sender: None,
            gauges: None,
        }
    }

    /// Deliver every cycle's report to `sender`. A full or closed channel
    /// fails that cycle only.
    pub fn with_report_channel(mut self, sender: mpsc::Sender<OptimizationReport>) -> Self {
        self.report_sender = Some(sender);
        self
    }

    /// Mirror each cycle into Prometheus gauges.
    pub fn with_gauges(mut self, gauges: CacheGauges) -> Self {
        self.gauges = Some(gauges);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one evaluation cycle.
    pub fn evaluate_once(&self) -> Result<OptimizationReport, AdvisorError> {
        let snapshot = self.source.cache_snapshot();

        if snapshot.statistics_enabled {
            info!(
                l2_hits = snapshot.l2_hits,
                l2_misses = snapshot.l2_misses,
                l2_puts = snapshot.l2_puts,
                l2_hit_ratio = snapshot.l2_hit_ratio(),
                "Cache statistics"
            );
            for (region, stats) in &snapshot.regions {
                info!(
                    region = %region,
                    hits = stats.hits,
                    misses = stats.misses,
                    puts = stats.puts,
                    size = stats.element_count_in_memory,
                    "Cache region statistics"
                );
            }

            if snapshot.l2_hits.saturating_add(snapshot.l2_misses) > 0 {
                let ratio = snapshot.l2_hit_ratio();
                if ratio < self.advisor.thresholds().l2_warn_hit_ratio {
                    warn!(
                        hit_ratio_pct = ratio * 100.0,
                        threshold = self.advisor.thresholds().l2_warn_hit_ratio,
                        "Low L2 cache hit ratio, consider cache tuning"
                    );
                }
            }
        } else {
            debug!("Cache statistics disabled");
        }

        let report = self.advisor.optimize_cache(&snapshot);
        for recommendation in &report.recommendations {
            warn!(recommendation = %recommendation, "Cache recommendation");
        }

        if let Some(ref gauges) = self.gauges {
            gauges.update(&snapshot, &report);
        }

        if let Some(ref sender) = self.report_sender {
            sender
                .try_send(report.clone())
                .map_err(|e| AdvisorError::Channel(e.to_string()))?;
        }

        Ok(report)
    }

    /// Spawn the schedule on the current Tokio runtime.
    pub fn start(self) -> Result<CacheMonitorHandle, AdvisorError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AdvisorError::Runtime(e.to_string()))?;
        if self.config.interval_secs == 0 {
            return Err(AdvisorError::InvalidConfiguration(
                "monitor.interval_secs must be greater than 0".to_string(),
            ));
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let task_running = Arc::clone(&running);
        let period = Duration::from_secs(self.config.interval_secs);

        info!(interval_secs = self.config.interval_secs, "Cache monitor started");

        let monitor = Arc::new(self);
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Explicit stop or dropped handle.
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let cycle = Arc::clone(&monitor);
                        match tokio::task::spawn_blocking(move || cycle.evaluate_once()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => warn!(error = %e, "Cache monitor cycle failed"),
                            Err(e) => warn!(error = %e, "Cache monitor cycle panicked"),
                        }
                    }
                }
            }

            task_running.store(false, Ordering::Release);
            info!("Cache monitor stopped");
        });

        Ok(CacheMonitorHandle {
            shutdown: Some(shutdown_tx),
            running,
        })
    }
}

/// Control handle for a started [`CacheMonitor`]. Dropping it stops the
/// monitor.
#[derive(Debug)]
pub struct CacheMonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    running: Arc<AtomicBool>,
}

impl CacheMonitorHandle {
    /// Signal shutdown without waiting. An evaluation already in progress
    /// completes.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Whether the schedule task is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheRegionStats, CacheSnapshot};
    use crate::collector::InMemoryStatistics;

    fn source_with_low_region() -> Arc<InMemoryStatistics> {
        let stats = Arc::new(InMemoryStatistics::new());
        stats.set_region(
            "orders",
            CacheRegionStats {
                hits: 1,
                misses: 9,
                puts: 1,
                element_count_in_memory: 5,
            },
        );
        stats.update_cache(|c: &mut CacheSnapshot| {
            c.l2_hits = 1;
            c.l2_misses = 9;
        });
        stats
    }

    #[test]
    fn test_evaluate_once() {
        let monitor = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig::default(),
        );
        let report = monitor.evaluate_once().unwrap();
        assert!(report.has_issues);
        assert!(report.recommendations[0].contains("'orders'"));
    }

    #[test]
    fn test_evaluate_once_disabled_statistics() {
        let stats = source_with_low_region();
        stats.set_enabled(false);
        let monitor = CacheMonitor::new(stats, CacheAdvisor::default(), MonitorConfig::default());
        let report = monitor.evaluate_once().unwrap();
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].starts_with("Enable statistics"));
    }

    #[test]
    fn test_full_channel_fails_cycle() {
        let (tx, _rx) = mpsc::channel(1);
        let monitor = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig::default(),
        )
        .with_report_channel(tx);

        assert!(monitor.evaluate_once().is_ok());
        assert!(matches!(
            monitor.evaluate_once(),
            Err(AdvisorError::Channel(_))
        ));
    }

    #[test]
    fn test_start_without_runtime() {
        let monitor = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig::default(),
        );
        assert!(matches!(monitor.start(), Err(AdvisorError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_zero_interval() {
        let monitor = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig { interval_secs: 0 },
        );
        assert!(matches!(
            monitor.start(),
            Err(AdvisorError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_first_cycle_is_immediate_and_stop_ends_task() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig { interval_secs: 3600 },
        )
        .with_report_channel(tx)
        .start()
        .unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("first report should arrive without waiting an interval")
            .unwrap();
        assert!(report.has_issues);

        let running = Arc::clone(&handle.running);
        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while running.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("monitor should stop");

        // The task dropped its sender when it finished.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_monitor() {
        let handle = CacheMonitor::new(
            source_with_low_region(),
            CacheAdvisor::default(),
            MonitorConfig { interval_secs: 3600 },
        )
        .start()
        .unwrap();
        let running = Arc::clone(&handle.running);
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), async {
            while running.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("monitor should stop when its handle is dropped");
    }

    struct SlowSource {
        inner: Arc<InMemoryStatistics>,
        delay: Duration,
    }

    impl CacheStatisticsSource for SlowSource {
        fn cache_snapshot(&self) -> CacheSnapshot {
            std::thread::sleep(self.delay);
            self.inner.cache_snapshot()
        }
    }

    #[tokio::test]
    async fn test_blocking_source_does_not_stall_runtime() {
        let (tx, mut rx) = mpsc::channel(4);
        let source = SlowSource {
            inner: source_with_low_region(),
            delay: Duration::from_millis(600),
        };
        let handle = CacheMonitor::new(
            Arc::new(source),
            CacheAdvisor::default(),
            MonitorConfig { interval_secs: 3600 },
        )
        .with_report_channel(tx)
        .start()
        .unwrap();

        // The single-threaded test runtime keeps serving timers while the
        // first cycle sleeps inside the source.
        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(400));

        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("slow cycle should still deliver a report")
            .unwrap();
        assert!(report.has_issues);
        handle.stop();
    }
}
