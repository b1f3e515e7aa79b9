//! Module doubles for pipeline tests.

use crate::modules::{ModuleError, ModuleInstance, Segment};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Renders `"<name>#<n>"` where `n` counts calls to `render`.
/// Failure modes are switchable from the test through shared cells.
pub(crate) struct ScriptedModule {
    name: String,
    interval: Duration,
    renders: Rc<Cell<u32>>,
    failing: Rc<Cell<bool>>,
    empty: Rc<Cell<bool>>,
}

impl ScriptedModule {
    pub(crate) fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            renders: Rc::new(Cell::new(0)),
            failing: Rc::new(Cell::new(false)),
            empty: Rc::new(Cell::new(false)),
        }
    }

    pub(crate) fn renders(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.renders)
    }

    pub(crate) fn failing(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.failing)
    }

    pub(crate) fn empty(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.empty)
    }
}

impl ModuleInstance for ScriptedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Duration {
        self.interval
    }

    fn render(&mut self) -> Result<Option<Segment>, ModuleError> {
        let n = self.renders.get() + 1;
        self.renders.set(n);
        if self.failing.get() {
            return Err(ModuleError::Unavailable(format!("{} is down", self.name)));
        }
        if self.empty.get() {
            return Ok(None);
        }
        Ok(Some(Segment::plain(&self.name, format!("{}#{}", self.name, n))))
    }
}
