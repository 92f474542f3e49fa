use crate::calls::{CallGate, TickOutcome};
use crate::config::GateConfig;
use crate::excep::Exception;
use crate::mem::PhysMemory;

/// Guest memory together with the call gate, driven one virtual cycle at a time.
///
/// The cpu loop of an embedding host executes one guest instruction and then calls [`Machine::tick`].
/// Loads and stores that target the gates register page should be routed to [`CallGate::registers_mut`].
pub struct Machine {
    memory: PhysMemory,
    calls: CallGate,
    cycles: u64,
}

impl Machine {
    /// Create a machine with `npages` pages of readable and writable guest memory.
    pub fn new(npages: usize, config: GateConfig) -> Self {
        log::debug!(
            "creating machine with {} pages of guest memory and {:?}",
            npages,
            config
        );
        Self {
            memory: PhysMemory::new(npages),
            calls: CallGate::new(config),
            cycles: 0,
        }
    }

    pub fn memory(&self) -> &PhysMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut PhysMemory {
        &mut self.memory
    }

    pub fn calls(&self) -> &CallGate {
        &self.calls
    }

    pub fn calls_mut(&mut self) -> &mut CallGate {
        &mut self.calls
    }

    /// Number of cycles that have been executed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Execute one virtual cycle, which runs exactly one tick of the call gate.
    ///
    /// A fault is returned to the caller which then decides whether the guest is trapped or halted.
    pub fn tick(&mut self) -> Result<TickOutcome, Exception> {
        self.cycles += 1;
        let result = self.calls.tick(&mut self.memory);
        if let Err(e) = &result {
            log::debug!("cycle {} faulted: {}", self.cycles, e);
        }
        result
    }

    /// Tick until a tick does something other than [`TickOutcome::Retry`] or `max_cycles` have passed.
    ///
    /// Returns the outcome of the last tick.
    pub fn run_while_retrying(&mut self, max_cycles: u64) -> Result<TickOutcome, Exception> {
        let mut outcome = TickOutcome::Idle;
        for _ in 0..max_cycles {
            outcome = self.tick()?;
            if outcome != TickOutcome::Retry {
                break;
            }
        }
        Ok(outcome)
    }
}
