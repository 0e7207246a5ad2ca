//! Transition scheduler keeping period observers fed across day boundaries.
//!
//! The scheduler owns today's and tomorrow's prayer times and three
//! independent cancellable tasks:
//!
//! - **Day rollover** wakes shortly after local midnight, promotes tomorrow to
//!   today, fetches a new tomorrow, and re-arms itself for the next midnight.
//!   When today's Islamic midnight falls after 00:00 it waits for that instead,
//!   so Isha and the night that follows are derived against the day they
//!   belong to.
//! - **Sunset** wakes shortly after today's Maghrib and signals that the Hijri
//!   date changed. It fires once and is re-armed only when today is replaced.
//! - **Recalculation** re-derives the period on a fixed cadence and catches up
//!   on a missed rollover when the wall-clock date moved while the process was
//!   suspended.
//!
//! ## Concurrency
//!
//! Day data lives behind one mutex that is never held across an await; the
//! mutation and the re-derivation that follows it happen under that lock, so
//! observers always receive snapshots in order. Async steps that fetch from
//! the provider are serialized by a separate async mutex, which makes rollover
//! idempotent per calendar date.
//!
//! Observer delivery goes through a gate holding the live generation. `stop()`
//! clears the generation under the gate, so once it returns no task (even one
//! that already woke up) can reach the observer again.

mod collaborators;


pub use collaborators::{NotificationRescheduler, PeriodObserver, PrayerTimeProvider};

use chrono::{DateTime, Duration as ChronoDuration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::common::constants::{
    DEFAULT_RECALCULATION_INTERVAL, DEFAULT_ROLLOVER_BUFFER, DEFAULT_SUNSET_BUFFER,
};
use crate::common::error::{PeriodError, SchedulerError, TimesError};
use crate::core::period::{
    PeriodState, PrayerPeriod, fallback_state, log_state_announcement, should_update_state,
    try_derive,
};
use crate::core::prayer::DailyPrayerTimes;
use crate::time::source::{RealTimeSource, TimeSource, until};

/// Timing parameters for the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Zone whose calendar days delimit "today" and "tomorrow"
    pub timezone: Tz,
    /// Cadence of the periodic re-derivation
    pub recalculation_interval: Duration,
    /// Delay after local midnight before rolling over
    pub rollover_buffer: Duration,
    /// Delay after Maghrib before signalling the Hijri date change
    pub sunset_buffer: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            recalculation_interval: Duration::from_secs(DEFAULT_RECALCULATION_INTERVAL),
            rollover_buffer: Duration::from_secs(DEFAULT_ROLLOVER_BUFFER),
            sunset_buffer: Duration::from_secs(DEFAULT_SUNSET_BUFFER),
        }
    }
}

/// Builder for [`TransitionScheduler`].
///
/// ```no_run
/// # use std::sync::Arc;
/// # use salatr::scheduler::{TransitionScheduler, PrayerTimeProvider, SchedulerSettings};
/// # use salatr::core::PrayerPeriod;
/// # async fn run(provider: Arc<dyn PrayerTimeProvider>) -> anyhow::Result<()> {
/// let observer = Arc::new(|period: &PrayerPeriod| println!("{}", period.state));
/// let scheduler = TransitionScheduler::builder(provider, observer)
///     .settings(SchedulerSettings::default())
///     .build();
/// scheduler.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct SchedulerBuilder {
    provider: Arc<dyn PrayerTimeProvider>,
    observer: Arc<dyn PeriodObserver>,
    notifier: Option<Arc<dyn NotificationRescheduler>>,
    clock: Arc<dyn TimeSource>,
    settings: SchedulerSettings,
}

impl SchedulerBuilder {
    /// Override the default timing settings.
    pub fn settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a best-effort notification rescheduler.
    pub fn notifier(mut self, notifier: Arc<dyn NotificationRescheduler>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Read wall-clock time from `clock` instead of the system clock.
    pub fn time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> TransitionScheduler {
        let (snapshots, _) = watch::channel(None);
        TransitionScheduler {
            inner: Arc::new(Inner {
                provider: self.provider,
                observer: self.observer,
                notifier: self.notifier,
                clock: self.clock,
                settings: self.settings,
                days: Mutex::new(DayBook::default()),
                gate: Mutex::new(Gate::default()),
                tasks: Mutex::new(TaskSlots::default()),
                mutation: tokio::sync::Mutex::new(()),
                snapshots,
            }),
        }
    }
}

/// Stateful coordinator that re-derives the prayer period on a timeline.
///
/// Lifecycle: `stopped → running → stopped`. Dropping the scheduler stops it.
pub struct TransitionScheduler {
    inner: Arc<Inner>,
}

impl TransitionScheduler {
    pub fn builder(
        provider: Arc<dyn PrayerTimeProvider>,
        observer: Arc<dyn PeriodObserver>,
    ) -> SchedulerBuilder {
        SchedulerBuilder {
            provider,
            observer,
            notifier: None,
            clock: Arc::new(RealTimeSource),
            settings: SchedulerSettings::default(),
        }
    }

    /// Load prayer times if needed, publish the current period, and arm the
    /// rollover, sunset, and recalculation tasks.
    ///
    /// Calling `start()` on a running scheduler arms nothing new and returns
    /// the latest snapshot.
    ///
    /// # Errors
    /// Fails when today's times cannot be loaded; the scheduler stays stopped.
    /// A failure to load tomorrow is reported to the observer and retried.
    pub async fn start(&self) -> Result<PrayerPeriod, SchedulerError> {
        let inner = &self.inner;
        let _mutation = inner.mutation.lock().await;

        if inner.live_generation().is_some() {
            return inner.snapshots.borrow().clone().ok_or(SchedulerError::NoData);
        }

        let generation = {
            let mut gate = lock(&inner.gate);
            gate.generation += 1;
            gate.live = Some(gate.generation);
            gate.generation
        };

        log_block_start!("Starting prayer period scheduler");
        log_indented!("Timezone: {}", inner.settings.timezone);
        log_indented!(
            "Recalculation interval: {}s",
            inner.settings.recalculation_interval.as_secs()
        );

        if let Err(e) = inner.ensure_loaded(Some(generation)).await {
            lock(&inner.gate).live = None;
            return Err(e);
        }
        if !inner.is_live(generation) {
            return Err(SchedulerError::Stopped);
        }

        inner.arm_all(generation);
        let period = inner
            .recalculate(Some(generation))
            .ok_or(SchedulerError::NoData)?;
        inner.reschedule_notifications(Some(generation), &period.today);
        Ok(period)
    }

    /// Cancel every pending task.
    ///
    /// Once this returns the observer receives no further callbacks. If a
    /// callback is being delivered concurrently, `stop()` waits for it.
    pub fn stop(&self) {
        let was_live = lock(&self.inner.gate).live.take().is_some();
        let slots = lock(&self.inner.tasks).drain();
        for slot in slots {
            slot.cancel();
        }
        if was_live {
            log_block_start!("Prayer period scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.live_generation().is_some()
    }

    /// Re-derive the period now, bypassing the timers.
    ///
    /// Publishes to the observer when running. If the calendar date moved on
    /// or tomorrow is missing (e.g. after returning from background), a
    /// catch-up rollover/refetch is started in the background.
    pub fn force_recalculate(&self) -> Result<PrayerPeriod, SchedulerError> {
        let inner = &self.inner;
        let generation = inner.live_generation();
        let period = inner.recalculate(generation).ok_or(SchedulerError::NoData)?;

        if let Some(generation) = generation {
            let stale = inner.rollover_due(&period.today, period.calculated_at);
            if stale || period.tomorrow.is_none() {
                inner.spawn_catch_up(generation);
            }
        }

        Ok(period)
    }

    /// Refetch today and tomorrow (location change, manual refresh) and re-arm
    /// every task against the new data.
    ///
    /// # Errors
    /// Fails when today's times cannot be fetched; the previous data is kept.
    pub async fn refresh(&self) -> Result<PrayerPeriod, SchedulerError> {
        let inner = &self.inner;
        let _mutation = inner.mutation.lock().await;
        let generation = inner.live_generation();

        log_block_start!("Refreshing prayer times");
        let date = inner.local_date(inner.clock.now());
        let today = match inner.load_today(date).await {
            Ok(today) => today,
            Err(e) => {
                inner.report(generation, &e);
                return Err(e);
            }
        };
        let tomorrow = match inner.load_tomorrow(&today).await {
            Ok(tomorrow) => Some(tomorrow),
            Err(e) => {
                inner.report(generation, &e);
                None
            }
        };

        inner.install(generation, today, tomorrow)
    }

    /// Replace the held prayer times with externally supplied ones and re-arm
    /// every task against them.
    pub async fn replace_times(
        &self,
        today: DailyPrayerTimes,
        tomorrow: Option<DailyPrayerTimes>,
    ) -> Result<PrayerPeriod, SchedulerError> {
        today.validate()?;
        if let Some(tomorrow) = &tomorrow {
            tomorrow.validate()?;
            today.validate_against_next(tomorrow)?;
        }

        let inner = &self.inner;
        let _mutation = inner.mutation.lock().await;
        let generation = inner.live_generation();
        log_block_start!("Prayer times replaced for {}", today.date);
        inner.install(generation, today, tomorrow)
    }

    /// Run the day-rollover logic now.
    ///
    /// Returns `Ok(false)` when today's times already belong to the current
    /// calendar date, so repeated calls never advance more than once per day.
    pub async fn rollover(&self) -> Result<bool, SchedulerError> {
        let generation = self.inner.live_generation();
        self.inner.rollover(generation).await
    }

    /// Latest published snapshot.
    pub fn current_period(&self) -> Option<PrayerPeriod> {
        self.inner.snapshots.borrow().clone()
    }

    /// Channel carrying every published snapshot, for consumers that prefer
    /// polling a receiver over registering callbacks.
    pub fn subscribe(&self) -> watch::Receiver<Option<PrayerPeriod>> {
        self.inner.snapshots.subscribe()
    }

    pub fn today(&self) -> Option<DailyPrayerTimes> {
        lock(&self.inner.days).today.clone()
    }

    pub fn tomorrow(&self) -> Option<DailyPrayerTimes> {
        lock(&self.inner.days).tomorrow.clone()
    }

    /// Calendar date of the most recent rollover.
    pub fn last_rollover(&self) -> Option<NaiveDate> {
        lock(&self.inner.days).last_rollover
    }

    /// Number of armed tasks that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        lock(&self.inner.tasks).pending()
    }
}

impl Drop for TransitionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Prayer times held by the scheduler. Single writer: only scheduler code
/// mutates it, always under its mutex.
#[derive(Default)]
struct DayBook {
    today: Option<DailyPrayerTimes>,
    tomorrow: Option<DailyPrayerTimes>,
    last_rollover: Option<NaiveDate>,
    last_state: Option<PeriodState>,
    last_hijri_signal: Option<NaiveDate>,
}

/// Delivery gate. `live` is the generation allowed to reach the observer.
#[derive(Default)]
struct Gate {
    live: Option<u64>,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
enum Purpose {
    Rollover,
    Sunset,
    Recalculation,
    CatchUp,
}

struct TaskSlot {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskSlot {
    fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }

    fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// At most one task per purpose.
#[derive(Default)]
struct TaskSlots {
    rollover: Option<TaskSlot>,
    sunset: Option<TaskSlot>,
    recalculation: Option<TaskSlot>,
    catch_up: Option<TaskSlot>,
}

impl TaskSlots {
    fn slot(&mut self, purpose: Purpose) -> &mut Option<TaskSlot> {
        match purpose {
            Purpose::Rollover => &mut self.rollover,
            Purpose::Sunset => &mut self.sunset,
            Purpose::Recalculation => &mut self.recalculation,
            Purpose::CatchUp => &mut self.catch_up,
        }
    }

    fn drain(&mut self) -> Vec<TaskSlot> {
        [
            self.rollover.take(),
            self.sunset.take(),
            self.recalculation.take(),
            self.catch_up.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn pending(&self) -> usize {
        [&self.rollover, &self.sunset, &self.recalculation, &self.catch_up]
            .into_iter()
            .flatten()
            .filter(|slot| slot.is_pending())
            .count()
    }
}

struct Inner {
    provider: Arc<dyn PrayerTimeProvider>,
    observer: Arc<dyn PeriodObserver>,
    notifier: Option<Arc<dyn NotificationRescheduler>>,
    clock: Arc<dyn TimeSource>,
    settings: SchedulerSettings,
    days: Mutex<DayBook>,
    gate: Mutex<Gate>,
    tasks: Mutex<TaskSlots>,
    // Serializes the async fetch-then-commit sequences
    mutation: tokio::sync::Mutex<()>,
    snapshots: watch::Sender<Option<PrayerPeriod>>,
}

impl Inner {
    fn live_generation(&self) -> Option<u64> {
        lock(&self.gate).live
    }

    fn is_live(&self, generation: u64) -> bool {
        self.live_generation() == Some(generation)
    }

    /// `None` marks an out-of-band call on a stopped scheduler: allowed to
    /// mutate, never allowed to reach the observer.
    fn still_valid(&self, generation: Option<u64>) -> bool {
        generation.is_none_or(|generation| self.is_live(generation))
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.settings.timezone).date_naive()
    }

    /// When the held day may be replaced: past local midnight, and past its
    /// Islamic midnight when that falls after 00:00.
    fn rollover_due(&self, today: &DailyPrayerTimes, now: DateTime<Utc>) -> bool {
        let buffer = chrono_duration(self.settings.rollover_buffer);
        today.date < self.local_date(now) && today.midnight.is_none_or(|m| now >= m + buffer)
    }

    fn next_rollover_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let buffer = chrono_duration(self.settings.rollover_buffer);
        let date = self.local_date(now);
        let next_midnight =
            start_of_day(date.succ_opt().unwrap_or(date), self.settings.timezone) + buffer;

        let held = lock(&self.days)
            .today
            .as_ref()
            .map(|today| (today.date, today.midnight));
        match held {
            // Isha of the held day is still open past 00:00
            Some((held_date, Some(midnight))) if midnight + buffer > now => {
                if held_date < date {
                    midnight + buffer
                } else {
                    next_midnight.max(midnight + buffer)
                }
            }
            _ => next_midnight,
        }
    }

    // # Provider access

    async fn load_today(&self, date: NaiveDate) -> Result<DailyPrayerTimes, SchedulerError> {
        let times = self.provider.fetch_today(date).await?;
        if times.date != date {
            return Err(TimesError::UnexpectedDate {
                expected: date,
                actual: times.date,
            }
            .into());
        }
        times.validate()?;
        Ok(times)
    }

    async fn load_tomorrow(
        &self,
        today: &DailyPrayerTimes,
    ) -> Result<DailyPrayerTimes, SchedulerError> {
        let times = self.provider.fetch_tomorrow(today.date).await?;
        times.validate()?;
        today.validate_against_next(&times)?;
        Ok(times)
    }

    /// Make sure today (and, best-effort, tomorrow) match the current date.
    async fn ensure_loaded(&self, generation: Option<u64>) -> Result<(), SchedulerError> {
        let date = self.local_date(self.clock.now());
        let (held_today, held_tomorrow) = {
            let days = lock(&self.days);
            (days.today.clone(), days.tomorrow.clone())
        };

        let today = match (held_today, held_tomorrow.clone()) {
            (Some(today), _) if today.date == date => today,
            (_, Some(tomorrow)) if tomorrow.date == date => tomorrow,
            _ => match self.load_today(date).await {
                Ok(today) => today,
                Err(e) => {
                    self.report(generation, &e);
                    return Err(e);
                }
            },
        };

        let tomorrow = match held_tomorrow {
            Some(tomorrow) if today.date.succ_opt() == Some(tomorrow.date) => Some(tomorrow),
            _ => match self.load_tomorrow(&today).await {
                Ok(tomorrow) => Some(tomorrow),
                Err(e) => {
                    self.report(generation, &e);
                    None
                }
            },
        };

        log_decorated!("Loaded prayer times for {}", today.date);
        let mut days = lock(&self.days);
        days.today = Some(today);
        days.tomorrow = tomorrow;
        Ok(())
    }

    /// Swap in new days, re-arm tasks when running, and publish.
    fn install(
        self: &Arc<Self>,
        generation: Option<u64>,
        today: DailyPrayerTimes,
        tomorrow: Option<DailyPrayerTimes>,
    ) -> Result<PrayerPeriod, SchedulerError> {
        if !self.still_valid(generation) {
            return Err(SchedulerError::Stopped);
        }
        {
            let mut days = lock(&self.days);
            days.today = Some(today.clone());
            days.tomorrow = tomorrow;
        }
        if let Some(generation) = generation {
            self.arm_all(generation);
        }
        let period = self.recalculate(generation).ok_or(SchedulerError::NoData)?;
        self.reschedule_notifications(generation, &today);
        Ok(period)
    }

    // # Day rollover

    /// Promote tomorrow to today for the current calendar date.
    ///
    /// Idempotent: returns `Ok(false)` when today already matches the date or
    /// its Isha window has not closed yet.
    async fn rollover(self: &Arc<Self>, generation: Option<u64>) -> Result<bool, SchedulerError> {
        let _mutation = self.mutation.lock().await;
        if !self.still_valid(generation) {
            return Ok(false);
        }

        let now = self.clock.now();
        let target = self.local_date(now);
        let promoted = {
            let days = lock(&self.days);
            if let Some(today) = &days.today
                && !self.rollover_due(today, now)
            {
                return Ok(false);
            }
            days.tomorrow.clone().filter(|tomorrow| tomorrow.date == target)
        };

        log_block_start!("Rolling over to {}", target);
        let today = match promoted {
            Some(tomorrow) => tomorrow,
            None => {
                log_indented!("Tomorrow's times unavailable, fetching {}", target);
                match self.load_today(target).await {
                    Ok(today) => today,
                    Err(e) => {
                        self.report(generation, &e);
                        return Err(e);
                    }
                }
            }
        };
        let tomorrow = match self.load_tomorrow(&today).await {
            Ok(tomorrow) => Some(tomorrow),
            Err(e) => {
                self.report(generation, &e);
                None
            }
        };

        if !self.still_valid(generation) {
            return Ok(false);
        }
        {
            let mut days = lock(&self.days);
            days.today = Some(today.clone());
            days.tomorrow = tomorrow;
            days.last_rollover = Some(target);
        }

        self.recalculate(generation);
        self.reschedule_notifications(generation, &today);
        if let Some(generation) = generation {
            self.arm_sunset(generation);
        }
        Ok(true)
    }

    /// One periodic tick: catch up on a missed rollover, retry a missing
    /// tomorrow, then re-derive.
    async fn tick(self: &Arc<Self>, generation: Option<u64>) {
        let now = self.clock.now();
        let (stale, missing_tomorrow) = {
            let days = lock(&self.days);
            (
                days.today
                    .as_ref()
                    .is_some_and(|today| self.rollover_due(today, now)),
                days.tomorrow.is_none(),
            )
        };

        if stale {
            log_pipe!();
            log_warning!("Calendar date advanced without a rollover, catching up");
            if let Ok(true) = self.rollover(generation).await {
                return;
            }
        } else if missing_tomorrow {
            self.retry_tomorrow(generation).await;
        }

        self.recalculate(generation);
    }

    async fn retry_tomorrow(&self, generation: Option<u64>) {
        let _mutation = self.mutation.lock().await;
        let today = {
            let days = lock(&self.days);
            match (&days.today, &days.tomorrow) {
                (Some(today), None) => today.clone(),
                _ => return,
            }
        };

        match self.load_tomorrow(&today).await {
            Ok(tomorrow) => {
                if !self.still_valid(generation) {
                    return;
                }
                let mut days = lock(&self.days);
                if days.today.as_ref().map(|t| t.date) == Some(today.date) {
                    log_decorated!("Fetched prayer times for {}", tomorrow.date);
                    days.tomorrow = Some(tomorrow);
                }
            }
            Err(e) => self.report(generation, &e),
        }
    }

    // # Derivation and delivery

    /// Derive a snapshot for now and publish it.
    fn recalculate(&self, generation: Option<u64>) -> Option<PrayerPeriod> {
        let now = self.clock.now();
        let mut days = lock(&self.days);
        let today = days.today.clone()?;
        let tomorrow = days.tomorrow.clone();

        let (state, failure) = match try_derive(now, &today, tomorrow.as_ref()) {
            Ok(state) => (state, None),
            Err(e) => (fallback_state(&e, &today), Some(e)),
        };

        match days.last_state {
            Some(previous) => {
                should_update_state(&previous, &state);
            }
            None => log_state_announcement(&state),
        }
        days.last_state = Some(state);

        let period = PrayerPeriod::from_state(state, today, tomorrow, now);
        // Gate before releasing the days so deliveries keep derivation order
        let gate = lock(&self.gate);
        drop(days);
        self.publish(&gate, generation, &period);
        drop(gate);

        if let Some(failure) = failure {
            let error = match failure {
                PeriodError::MissingTomorrow => SchedulerError::MissingTomorrow {
                    date: period.today.date,
                },
                PeriodError::InvalidTimes(e) => SchedulerError::InvalidTimes(e),
            };
            self.report(generation, &error);
        }

        Some(period)
    }

    /// Deliver to subscribers and the observer. A task whose generation was
    /// stopped delivers nothing; an out-of-band call (`None`) only updates the
    /// snapshot channel.
    fn publish(&self, gate: &Gate, generation: Option<u64>, period: &PrayerPeriod) {
        if generation.is_some() && gate.live != generation {
            return;
        }
        self.snapshots.send_replace(Some(period.clone()));
        if generation.is_some() {
            self.observer.on_period_updated(period);
        }
    }

    fn signal_hijri(&self, generation: u64, sunset_of: NaiveDate) {
        let mut days = lock(&self.days);
        if days.last_hijri_signal == Some(sunset_of) {
            return;
        }
        let gate = lock(&self.gate);
        if gate.live != Some(generation) {
            return;
        }
        days.last_hijri_signal = Some(sunset_of);
        drop(days);
        log_block_start!("Maghrib has passed, the Hijri date advanced 󰖛 ");
        self.observer.on_hijri_date_changed(sunset_of);
    }

    /// Log a failure and pass it to the observer when running.
    fn report(&self, generation: Option<u64>, error: &SchedulerError) {
        log_pipe!();
        if error.is_fatal() {
            log_critical!("{error}");
        } else {
            log_warning!("{error}");
            log_indented!("Keeping current prayer times, will retry on the next tick");
        }

        let gate = lock(&self.gate);
        if generation.is_some() && gate.live == generation {
            self.observer.on_error(error);
        }
    }

    fn reschedule_notifications(&self, generation: Option<u64>, times: &DailyPrayerTimes) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.reschedule_notifications(times) {
            self.report(generation, &SchedulerError::Notification(format!("{e:#}")));
        }
    }

    // # Task management

    /// Spawn a task for `purpose`, cancelling any pending one first.
    fn arm<F, Fut>(self: &Arc<Self>, purpose: Purpose, task: F)
    where
        F: FnOnce(Arc<Inner>, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(task(Arc::clone(self), token.clone()));
        let previous = lock(&self.tasks).slot(purpose).replace(TaskSlot { token, handle });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    fn arm_all(self: &Arc<Self>, generation: u64) {
        self.arm_rollover(generation);
        self.arm_sunset(generation);
        self.arm_recalculation(generation);
    }

    fn arm_rollover(self: &Arc<Self>, generation: u64) {
        self.arm(Purpose::Rollover, move |inner, token| async move {
            loop {
                let deadline = inner.next_rollover_deadline(inner.clock.now());
                if !inner.sleep_until(deadline, &token).await || !inner.is_live(generation) {
                    return;
                }
                // Publish the outgoing day's closing state before replacing it
                inner.recalculate(Some(generation));
                if let Err(e) = inner.rollover(Some(generation)).await {
                    log_debug!("Rollover deferred to the next tick: {e}");
                }
            }
        });
    }

    fn arm_sunset(self: &Arc<Self>, generation: u64) {
        let now = self.clock.now();
        let target = {
            let days = lock(&self.days);
            days.today
                .as_ref()
                .filter(|today| today.maghrib > now && days.last_hijri_signal != Some(today.date))
                .map(|today| (today.date, today.maghrib))
        };

        let Some((date, maghrib)) = target else {
            if let Some(previous) = lock(&self.tasks).sunset.take() {
                previous.cancel();
            }
            return;
        };

        let deadline = maghrib + chrono_duration(self.settings.sunset_buffer);
        self.arm(Purpose::Sunset, move |inner, token| async move {
            if inner.sleep_until(deadline, &token).await && inner.is_live(generation) {
                inner.signal_hijri(generation, date);
            }
        });
    }

    fn arm_recalculation(self: &Arc<Self>, generation: u64) {
        let period = self.settings.recalculation_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.arm(Purpose::Recalculation, move |inner, token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = interval.tick() => {}
                }
                if token.is_cancelled() || !inner.is_live(generation) {
                    return;
                }
                inner.tick(Some(generation)).await;
            }
        });
    }

    /// Run one tick in the background unless a catch-up is already pending.
    fn spawn_catch_up(self: &Arc<Self>, generation: u64) {
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        if lock(&self.tasks)
            .catch_up
            .as_ref()
            .is_some_and(TaskSlot::is_pending)
        {
            return;
        }
        self.arm(Purpose::CatchUp, move |inner, token| async move {
            if !token.is_cancelled() && inner.is_live(generation) {
                inner.tick(Some(generation)).await;
            }
        });
    }

    /// Sleep until a wall-clock deadline. Returns false when cancelled,
    /// including a cancellation that races with the wake-up.
    async fn sleep_until(&self, deadline: DateTime<Utc>, token: &CancellationToken) -> bool {
        let wait = until(self.clock.now(), deadline);
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(wait) => !token.is_cancelled(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn chrono_duration(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::zero())
}

/// First instant of `date` in `tz`. Where a DST change skips local midnight
/// the day starts at the first valid local time an hour later.
pub(crate) fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let local = match tz.from_local_datetime(&midnight) {
        LocalResult::Single(start) | LocalResult::Ambiguous(start, _) => Some(start),
        LocalResult::None => tz
            .from_local_datetime(&(midnight + ChronoDuration::hours(1)))
            .earliest(),
    };
    local
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
