//! Periodic job scheduling
//!
//! Two flavors: fixed interval ticks with single-flight protection, and cron
//! schedules for wall clock jobs (daily cleanup, per-minute reports).

use chrono::{DateTime, Utc};
use croner::Cron;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::prelude::*;

/// Delay before retrying when a schedule has no computable next occurrence
const CRON_RETRY: Duration = Duration::from_secs(60);

/// Cron schedule wrapper using the croner crate
#[derive(Debug, Clone)]
pub struct CronSchedule {
	expr: Box<str>,
	cron: Cron,
}

impl CronSchedule {
	/// Parse a cron expression (5 fields: minute hour day month weekday)
	pub fn parse(expr: &str) -> ClResult<Self> {
		let cron = Cron::from_str(expr)
			.map_err(|e| Error::ConfigError(format!("invalid cron expression '{}': {}", expr, e)))?;
		Ok(Self { expr: expr.into(), cron })
	}

	/// Next occurrence strictly after `after`
	pub fn next_execution(&self, after: Timestamp) -> ClResult<Timestamp> {
		let dt = DateTime::<Utc>::from_timestamp_millis(after.0 as i64).unwrap_or_else(Utc::now);

		self.cron
			.find_next_occurrence(&dt, false)
			.map(|next| Timestamp(next.timestamp_millis() as u64))
			.map_err(|e| {
				error!("Failed to find next cron occurrence for '{}': {}", self.expr, e);
				Error::ValidationError(format!("cron next_execution failed: {}", e))
			})
	}

	pub fn expr(&self) -> &str {
		&self.expr
	}
}

/// Busy flag letting at most one run of a job be in flight
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
	busy: Arc<AtomicBool>,
}

/// Clears the busy flag of its [`SingleFlight`] when dropped
#[derive(Debug)]
pub struct FlightGuard {
	busy: Arc<AtomicBool>,
}

impl SingleFlight {
	pub fn new() -> Self {
		Self::default()
	}

	/// `None` if a run is already in flight
	pub fn try_begin(&self) -> Option<FlightGuard> {
		self.busy
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| FlightGuard { busy: Arc::clone(&self.busy) })
	}

	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::Acquire)
	}
}

impl Drop for FlightGuard {
	fn drop(&mut self) {
		self.busy.store(false, Ordering::Release);
	}
}

/// Run `task` every `period`. A tick arriving while the previous run is still
/// in flight is dropped, not queued.
pub fn spawn_interval<F, Fut>(name: &'static str, period: Duration, task: F) -> JoinHandle<()>
where
	F: Fn() -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	let flight = SingleFlight::new();
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(period);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
		info!(job = name, period_ms = period.as_millis() as u64, "interval job started");
		loop {
			ticker.tick().await;
			let Some(guard) = flight.try_begin() else {
				trace!(job = name, "previous run still in flight, skipping tick");
				continue;
			};
			let run = task();
			tokio::spawn(async move {
				let _guard = guard;
				run.await;
			});
		}
	})
}

/// Run `task` at every occurrence of `schedule`, one run at a time
pub fn spawn_cron<F, Fut>(name: &'static str, schedule: CronSchedule, task: F) -> JoinHandle<()>
where
	F: Fn() -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	tokio::spawn(async move {
		info!(job = name, cron = schedule.expr(), "cron job started");
		loop {
			let now = Timestamp::now();
			let delay = match schedule.next_execution(now) {
				Ok(next) => Duration::from_millis(next.0.saturating_sub(now.0)),
				Err(_) => {
					tokio::time::sleep(CRON_RETRY).await;
					continue;
				}
			};
			tokio::time::sleep(delay).await;
			task().await;
		}
	})
}


// vim: ts=4
