use crate::modules::ModuleInstance;
use crate::pipeline::cache::RenderCache;
use crate::pipeline::emitter::Emitter;
use crate::pipeline::pause::RunState;
use log::{debug, info, trace};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no module instances could be constructed")]
    NoInstances,

    #[error("failed to write to the bar: {0}")]
    Output(#[from] io::Error),
}

/// Drives the render cache at a fixed tick period and writes every frame.
///
/// Renders run one after another on the caller's thread, so a blocking
/// module delays the rest of its frame and the next tick.
pub struct Scheduler<W: Write> {
    instances: Vec<Box<dyn ModuleInstance>>,
    cache: RenderCache,
    emitter: Emitter<W>,
    run_state: RunState,
    tick_interval: Duration,
}

impl<W: Write> Scheduler<W> {
    /// Refuses an empty instance list: a bar that can never show anything is
    /// not worth starting. Nothing is written in that case.
    pub fn new(
        instances: Vec<Box<dyn ModuleInstance>>,
        emitter: Emitter<W>,
        run_state: RunState,
        tick_interval: Duration,
    ) -> Result<Self, SchedulerError> {
        if instances.is_empty() {
            return Err(SchedulerError::NoInstances);
        }
        Ok(Self {
            instances,
            cache: RenderCache::new(),
            emitter,
            run_state,
            tick_interval,
        })
    }

    /// Write the protocol header and a fully rendered first frame.
    /// The first frame is written even if output is currently suspended.
    pub fn start(&mut self, now: Instant) -> Result<(), SchedulerError> {
        self.emitter.write_header()?;
        self.emit(now)?;
        debug!("Initial frame written, {} entries cached", self.cache.len());
        Ok(())
    }

    /// One timer fire at its scheduled deadline `now`. Returns whether a
    /// frame was written.
    pub fn tick(&mut self, now: Instant) -> Result<bool, SchedulerError> {
        if !self.run_state.is_emitting() {
            trace!("Suspended, skipping tick");
            return Ok(false);
        }
        self.emit(now)?;
        Ok(true)
    }

    fn emit(&mut self, now: Instant) -> Result<(), SchedulerError> {
        let frame = self.cache.render_frame(&mut self.instances, now);
        self.emitter.write_frame(&frame)?;
        Ok(())
    }

    /// Start, then tick forever. Only returns when the output breaks,
    /// e.g. the bar host closed the pipe.
    pub async fn run(mut self) -> Result<(), SchedulerError> {
        info!(
            "Running {} modules every {:?}",
            self.instances.len(),
            self.tick_interval
        );
        // Frames are stamped with their deadline, not the wake-up time, so
        // timer jitter cannot push a module with interval == tick past a frame.
        let origin = time::Instant::now();
        self.start(origin.into_std())?;

        let mut ticker = time::interval_at(origin + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = ticker.tick().await;
            self.tick(deadline.into_std())?;
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    #[cfg(test)]
    pub fn emitter(&self) -> &Emitter<W> {
        &self.emitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ModuleError, Segment};
    use crate::pipeline::testing::ScriptedModule;
    use chrono::{DateTime, Local, TimeZone};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    const TICK: Duration = Duration::from_secs(1);

    fn frames(scheduler: &Scheduler<Vec<u8>>) -> Vec<String> {
        let text = String::from_utf8(scheduler.emitter().get_ref().clone()).unwrap();
        text.lines()
            .skip(3)
            .map(|line| line.trim_end_matches(',').to_string())
            .collect()
    }

    fn scheduler_with(modules: Vec<ScriptedModule>, run_state: RunState) -> Scheduler<Vec<u8>> {
        let instances = modules
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn ModuleInstance>)
            .collect();
        Scheduler::new(instances, Emitter::new(Vec::new()), run_state, TICK).unwrap()
    }

    #[test]
    fn test_empty_instance_set_writes_nothing() {
        let result = Scheduler::new(Vec::new(), Emitter::new(Vec::<u8>::new()), RunState::new(), TICK);
        assert!(matches!(result, Err(SchedulerError::NoInstances)));
    }

    #[test]
    fn test_start_writes_header_and_first_frame() {
        let mut scheduler = scheduler_with(vec![ScriptedModule::new("a", TICK)], RunState::new());
        scheduler.start(Instant::now()).unwrap();

        let text = String::from_utf8(scheduler.emitter().get_ref().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("{\"stop_signal\":20"));
        assert_eq!(lines[1], "[");
        assert_eq!(lines[2], "[],");
        assert_eq!(
            frames(&scheduler),
            vec![r#"[{"name":"a","full_text":"a#1","markup":"none"}]"#]
        );
    }

    #[test]
    fn test_first_frame_is_written_while_suspended() {
        let run_state = RunState::new();
        run_state.suspend();
        let mut scheduler = scheduler_with(vec![ScriptedModule::new("a", TICK)], run_state);
        scheduler.start(Instant::now()).unwrap();
        assert_eq!(frames(&scheduler).len(), 1);
    }

    #[test]
    fn test_suspended_ticks_write_nothing_and_keep_timestamps() {
        let module = ScriptedModule::new("slow", Duration::from_secs(5));
        let renders = module.renders();
        let run_state = RunState::new();
        let mut scheduler = scheduler_with(vec![module], run_state.clone());
        let t0 = Instant::now();

        scheduler.start(t0).unwrap();
        run_state.suspend();
        for tick in 1..20 {
            assert!(!scheduler.tick(t0 + TICK * tick).unwrap());
        }
        assert_eq!(frames(&scheduler).len(), 1);
        assert_eq!(renders.get(), 1);
        assert_eq!(scheduler.cache().timestamp("slow"), Some(t0));

        // Staleness is measured from the last real render, not from the resume.
        run_state.resume();
        assert!(scheduler.tick(t0 + TICK * 20).unwrap());
        assert_eq!(renders.get(), 2);
        assert_eq!(scheduler.cache().timestamp("slow"), Some(t0 + TICK * 20));
    }

    #[test]
    fn test_resume_reuses_entries_that_are_still_fresh() {
        let module = ScriptedModule::new("slow", Duration::from_secs(10));
        let renders = module.renders();
        let run_state = RunState::new();
        let mut scheduler = scheduler_with(vec![module], run_state.clone());
        let t0 = Instant::now();

        scheduler.start(t0).unwrap();
        run_state.suspend();
        scheduler.tick(t0 + TICK * 2).unwrap();
        run_state.resume();
        assert!(scheduler.tick(t0 + TICK * 3).unwrap());
        assert_eq!(renders.get(), 1);
        assert_eq!(frames(&scheduler).len(), 2);
    }

    #[test]
    fn test_frames_follow_tick_and_configured_order() {
        let a = ScriptedModule::new("a", Duration::from_secs(2));
        let b = ScriptedModule::new("b", TICK);
        let b_failing = b.failing();
        let mut scheduler = scheduler_with(vec![a, b], RunState::new());
        let t0 = Instant::now();

        scheduler.start(t0).unwrap();
        b_failing.set(true);
        scheduler.tick(t0 + TICK).unwrap();
        b_failing.set(false);
        scheduler.tick(t0 + TICK * 2).unwrap();

        assert_eq!(
            frames(&scheduler),
            vec![
                r#"[{"name":"a","full_text":"a#1","markup":"none"},{"name":"b","full_text":"b#1","markup":"none"}]"#,
                r#"[{"name":"a","full_text":"a#1","markup":"none"}]"#,
                r#"[{"name":"a","full_text":"a#2","markup":"none"},{"name":"b","full_text":"b#3","markup":"none"}]"#,
            ]
        );
    }

    #[test]
    fn test_all_positions_absent_still_writes_empty_frame() {
        let module = ScriptedModule::new("a", TICK);
        module.failing().set(true);
        let mut scheduler = scheduler_with(vec![module], RunState::new());
        scheduler.start(Instant::now()).unwrap();
        assert_eq!(frames(&scheduler), vec!["[]"]);
    }

    /// Clock-like module reading a time the test controls.
    struct MockClock {
        now: Rc<Cell<DateTime<Local>>>,
    }

    impl ModuleInstance for MockClock {
        fn name(&self) -> &str {
            "clock"
        }

        fn refresh_interval(&self) -> Duration {
            TICK
        }

        fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
            let text = self.now.get().format("%H:%M:%S").to_string();
            Ok(Some(Segment::plain("clock", text)))
        }
    }

    #[test]
    fn test_clock_scenario() {
        let mocked = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap();
        let now = Rc::new(Cell::new(mocked));
        let clock: Box<dyn ModuleInstance> = Box::new(MockClock { now: Rc::clone(&now) });
        let mut scheduler =
            Scheduler::new(vec![clock], Emitter::new(Vec::<u8>::new()), RunState::new(), TICK).unwrap();
        let t0 = Instant::now();

        scheduler.start(t0).unwrap();
        for tick in 1..4 {
            scheduler.tick(t0 + TICK * tick).unwrap();
        }
        now.set(mocked + chrono::Duration::seconds(2));
        scheduler.tick(t0 + TICK * 4).unwrap();

        let expected_noon = r#"[{"name":"clock","full_text":"12:00:00","markup":"none"}]"#;
        let written = frames(&scheduler);
        for frame in &written[..4] {
            assert_eq!(frame, expected_noon);
        }
        assert_eq!(
            written[4],
            r#"[{"name":"clock","full_text":"12:00:02","markup":"none"}]"#
        );
    }

    struct ClosingPipe {
        frames_left: usize,
    }

    impl Write for ClosingPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.frames_left == 0 {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.frames_left = self.frames_left.saturating_sub(1);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_output_breaks() {
        let instances: Vec<Box<dyn ModuleInstance>> = vec![Box::new(ScriptedModule::new("a", TICK))];
        let pipe = ClosingPipe { frames_left: 5 };
        let scheduler = Scheduler::new(instances, Emitter::new(pipe), RunState::new(), TICK).unwrap();

        let result = scheduler.run().await;
        assert!(matches!(result, Err(SchedulerError::Output(e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test(start_paused = true)]
    async fn test_module_refreshing_every_tick_renders_every_frame() {
        let module = ScriptedModule::new("a", TICK);
        let renders = module.renders();
        let instances: Vec<Box<dyn ModuleInstance>> = vec![Box::new(module)];
        // header + first frame + 3 ticks, then the 4th tick fails to write
        let pipe = ClosingPipe { frames_left: 5 };
        let scheduler = Scheduler::new(instances, Emitter::new(pipe), RunState::new(), TICK).unwrap();

        assert!(scheduler.run().await.is_err());
        assert_eq!(renders.get(), 5);
    }
}
