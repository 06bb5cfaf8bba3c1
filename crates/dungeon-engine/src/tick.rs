//! The per-tick driver for systems.
//!
//! [`SystemController::update`] runs one tick:
//!
//! 1. [`begin_frame`](dungeon_ecs::registry::EntityRegistry::begin_frame)
//!    applies the additions and removals queued during the previous tick.
//! 2. Every system runs once, in registration order.
//!
//! Systems run sequentially on the same registry, so a system sees the
//! component changes of every system registered before it in the same tick,
//! but no structural change made during the tick.

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use dungeon_ecs::registry::FrameReport;

use crate::components::Registry;
use crate::systems::{System, SystemKind, TickContext};

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(SystemKind, Duration)>,
    /// Total time for the tick, frame boundary included.
    pub total_time: Duration,
    /// What the frame boundary applied.
    pub frame: FrameReport,
}

// ---------------------------------------------------------------------------
// SystemController
// ---------------------------------------------------------------------------

/// Owns the ordered systems and runs them once per tick.
#[derive(Default)]
pub struct SystemController {
    systems: Vec<Box<dyn System>>,
    last_diagnostics: TickDiagnostics,
}

impl SystemController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system.
    ///
    /// A system of a kind that is already registered replaces the old one in
    /// place, keeping its position in the execution order. The replaced
    /// system is returned.
    pub fn add(&mut self, system: impl System + 'static) -> Option<Box<dyn System>> {
        self.add_boxed(Box::new(system))
    }

    pub fn add_boxed(&mut self, system: Box<dyn System>) -> Option<Box<dyn System>> {
        let kind = system.kind();
        match self.systems.iter().position(|s| s.kind() == kind) {
            Some(slot) => {
                warn!(system = %kind, "system of this kind already registered; replacing it");
                Some(std::mem::replace(&mut self.systems[slot], system))
            }
            None => {
                debug!(system = %kind, position = self.systems.len(), "system registered");
                self.systems.push(system);
                None
            }
        }
    }

    /// Unregister the system of `kind`.
    pub fn remove(&mut self, kind: SystemKind) -> Option<Box<dyn System>> {
        let slot = self.systems.iter().position(|s| s.kind() == kind)?;
        Some(self.systems.remove(slot))
    }

    pub fn contains(&self, kind: SystemKind) -> bool {
        self.systems.iter().any(|s| s.kind() == kind)
    }

    /// Registered kinds in execution order.
    pub fn kinds(&self) -> Vec<SystemKind> {
        self.systems.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run one tick: apply the frame boundary, then every system in order.
    pub fn update(&mut self, registry: &mut Registry, ctx: &mut TickContext<'_>) -> FrameReport {
        let tick_start = Instant::now();
        let frame = registry.begin_frame();

        let mut system_times = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let sys_start = Instant::now();
            system.update(registry, ctx);
            system_times.push((system.kind(), sys_start.elapsed()));
        }

        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
            frame,
        };
        trace!(
            tick = ctx.tick,
            live = registry.live_count(),
            elapsed_us = self.last_diagnostics.total_time.as_micros() as u64,
            "tick complete"
        );
        frame
    }

    /// Diagnostics from the last tick.
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for SystemController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemController")
            .field("systems", &self.kinds())
            .finish()
    }
}
