//! Edit propagation.
//!
//! [`Engine`] is the single writer of the electrical state. Each edit runs a
//! settle pass under one lock:
//!
//! 1. decode and validate the raw value for its field
//! 2. compute the next state on a copy (power edits go through the solver)
//! 3. commit the copy and snapshot every derived quantity
//! 4. collect a programmatic write-back for every field outside the pass's
//!    exclusion set
//! 5. notify settle callbacks once
//!
//! A failed edit returns before step 3, so the stored state never holds a
//! partial update. User edits exclude their own field from the write-back;
//! playback edits exclude nothing, since the phase dial must follow them.

use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use pp_core::{Phase, Real};
use pp_phasor::{ElectricalState, PhasorTraces, Snapshot, TraceSpec};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::field::{DisplayContract, FieldEvent, FieldId, FieldSet, Origin};

/// Outcome of one settle pass, handed to every settle callback.
#[derive(Clone, Debug, PartialEq)]
pub struct Settled {
    /// Settle passes completed so far, this one included.
    pub sequence: u64,
    pub edited: FieldId,
    pub origin: Origin,
    pub excluded: FieldSet,
    pub snapshot: Snapshot,
    /// Values the UI must show for every non-excluded field.
    pub pushes: Vec<FieldEvent>,
}

impl Settled {
    /// Display value pushed for `field`, if it was not excluded.
    pub fn pushed(&self, field: FieldId) -> Option<Real> {
        self.pushes
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.value)
    }

    /// Canonical instantaneous phase in degrees, (−180, 180].
    pub fn inst_phase_degrees(&self) -> Real {
        Phase::from_radians(self.snapshot.inst_phi).degrees()
    }
}

type SettleCallback = Arc<dyn Fn(&Settled) + Send + Sync>;

thread_local! {
    static SETTLING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside a settle pass.
struct SettleGuard;

impl SettleGuard {
    fn enter() -> AppResult<Self> {
        SETTLING.with(|s| {
            if s.replace(true) {
                Err(AppError::Reentrant)
            } else {
                Ok(SettleGuard)
            }
        })
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        SETTLING.with(|s| s.set(false));
    }
}

/// Whether the current thread is inside a settle pass, i.e. running a settle
/// callback.
pub(crate) fn in_settle_pass() -> bool {
    SETTLING.with(Cell::get)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Engine {
    contract: DisplayContract,
    /// Serializes settle passes; counts completed ones.
    settle: Mutex<u64>,
    state: RwLock<ElectricalState>,
    callbacks: Mutex<Vec<SettleCallback>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DisplayContract::default())
    }
}

impl Engine {
    pub fn new(contract: DisplayContract) -> Self {
        Self {
            contract,
            settle: Mutex::new(0),
            state: RwLock::new(ElectricalState::default()),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(config: &EngineConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self::new(DisplayContract::new(config.scale()?)))
    }

    pub fn contract(&self) -> DisplayContract {
        self.contract
    }

    /// Apply a user edit in display units. The edited field is not written back.
    pub fn apply(&self, field: FieldId, raw: Real) -> AppResult<Settled> {
        self.propagate(field, Origin::User, FieldSet::only(field), |_| raw)
    }

    /// Entry point for a UI "value changed" handler.
    ///
    /// Programmatic events are the engine's own write-backs echoing through
    /// the UI; they are dropped so a settle pass never triggers another.
    pub fn handle_field_event(&self, event: FieldEvent) -> AppResult<Option<Settled>> {
        match event.origin {
            Origin::Programmatic => Ok(None),
            Origin::User => self.apply(event.field, event.value).map(Some),
            Origin::Playback => self
                .propagate(event.field, Origin::Playback, FieldSet::empty(), |_| {
                    event.value
                })
                .map(Some),
        }
    }

    /// Advance the instantaneous phase dial by `delta_deg`.
    ///
    /// The current value is read under the settle lock, so a concurrent user
    /// edit is never overwritten by a stale increment.
    pub fn advance_phase(&self, delta_deg: Real) -> AppResult<Settled> {
        self.propagate(
            FieldId::InstantaneousPhase,
            Origin::Playback,
            FieldSet::empty(),
            |state| state.inst_phi().to_dial().advanced(delta_deg).get(),
        )
    }

    /// Return the instantaneous phase to its zero reference.
    pub fn reset_phase(&self) -> AppResult<Settled> {
        self.propagate(
            FieldId::InstantaneousPhase,
            Origin::Playback,
            FieldSet::empty(),
            |_| Phase::ZERO.to_dial().get(),
        )
    }

    /// Register a callback run once after every settle pass.
    ///
    /// Callbacks run on the thread that issued the edit, inside the settle
    /// lock, so they observe passes in sequence order. They may read
    /// [`Engine::snapshot`]. Editing from a callback returns
    /// [`AppError::Reentrant`]; so does
    /// [`PlaybackScheduler::stop`](crate::PlaybackScheduler::stop), after
    /// cancelling playback without waiting for the stepping thread.
    pub fn on_settled<F>(&self, callback: F)
    where
        F: Fn(&Settled) + Send + Sync + 'static,
    {
        lock(&self.callbacks).push(Arc::new(callback));
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn display_value(&self, field: FieldId) -> Real {
        self.contract.encode(field, &self.snapshot())
    }

    pub fn traces(&self, spec: &TraceSpec) -> PhasorTraces {
        PhasorTraces::compute(&self.snapshot().model(), spec)
    }

    fn propagate<F>(
        &self,
        field: FieldId,
        origin: Origin,
        excluded: FieldSet,
        value: F,
    ) -> AppResult<Settled>
    where
        F: FnOnce(&ElectricalState) -> Real,
    {
        let _guard = SettleGuard::enter()?;
        let mut sequence = lock(&self.settle);

        let current = *self.state.read().unwrap_or_else(PoisonError::into_inner);
        let raw = value(&current);
        let next = self.contract.decode(field, raw)?.apply_to(&current)?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        *sequence += 1;

        let snapshot = next.snapshot();
        let pushes = FieldId::ALL
            .into_iter()
            .filter(|f| !excluded.contains(*f))
            .map(|f| FieldEvent {
                field: f,
                value: self.contract.encode(f, &snapshot),
                origin: Origin::Programmatic,
            })
            .collect();
        let settled = Settled {
            sequence: *sequence,
            edited: field,
            origin,
            excluded,
            snapshot,
            pushes,
        };
        debug!(
            seq = settled.sequence,
            field = %field,
            ?origin,
            raw,
            "settled"
        );

        let callbacks = lock(&self.callbacks).clone();
        for callback in &callbacks {
            callback(&settled);
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(engine: &Engine) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        engine.on_settled(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn user_edit_excludes_itself() {
        let engine = Engine::default();
        let settled = engine.apply(FieldId::CurrentAmplitude, 50.0).unwrap();
        assert_eq!(settled.pushes.len(), 7);
        assert_eq!(settled.pushed(FieldId::CurrentAmplitude), None);
        assert_eq!(settled.pushed(FieldId::VoltageAmplitude), Some(0.0));
        assert!(settled.pushes.iter().all(|e| e.origin == Origin::Programmatic));
        assert_eq!(engine.snapshot().i0, 0.5);
    }

    #[test]
    fn playback_edit_pushes_every_field() {
        let engine = Engine::default();
        let settled = engine.advance_phase(1.0).unwrap();
        assert_eq!(settled.pushes.len(), 8);
        assert!((settled.pushed(FieldId::InstantaneousPhase).unwrap() - 91.0).abs() < 1e-9);
        assert!((settled.inst_phase_degrees() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn one_callback_per_settle() {
        let engine = Engine::default();
        let count = counting(&engine);
        engine.apply(FieldId::VoltageAmplitude, 100.0).unwrap();
        engine.apply(FieldId::CurrentAmplitude, 100.0).unwrap();
        engine.apply(FieldId::ReactivePower, 100.0).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_edit_neither_writes_nor_notifies() {
        let engine = Engine::default();
        let count = counting(&engine);
        let before = engine.snapshot();
        let err = engine.apply(FieldId::ApparentPower, 100.0).unwrap_err();
        assert!(err.is_domain());
        let err = engine.apply(FieldId::CurrentAmplitude, -10.0).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(engine.snapshot(), before);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn edit_from_callback_is_rejected() {
        let engine = Arc::new(Engine::default());
        let inner = Arc::downgrade(&engine);
        let result = Arc::new(Mutex::new(None));
        let r = result.clone();
        engine.on_settled(move |_| {
            if let Some(engine) = inner.upgrade() {
                let outcome = engine.apply(FieldId::CurrentAmplitude, 10.0);
                *r.lock().unwrap() = Some(matches!(outcome, Err(AppError::Reentrant)));
            }
        });
        engine.apply(FieldId::VoltageAmplitude, 100.0).unwrap();
        assert_eq!(*result.lock().unwrap(), Some(true));
        assert_eq!(engine.snapshot().i0, 0.0);
        // the guard is released once the pass ends
        engine.apply(FieldId::CurrentAmplitude, 10.0).unwrap();
    }
}
