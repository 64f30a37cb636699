use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{ChartError, ChartResult};

use super::{DirtyFlags, MutationEffectTable, StepSpec, StepTable};

/// Sweeps a single flush may perform: the rank-ordered sweep plus one
/// follow-up for cascades that landed on steps which already ran.
const MAX_SWEEPS: usize = 2;

/// Per-step view handed to the step body while it runs.
#[derive(Debug)]
pub struct StepContext<'a> {
    step: &'a StepSpec,
    triggered: DirtyFlags,
    pending: DirtyFlags,
    sweep: usize,
    cascaded: DirtyFlags,
}

impl<'a> StepContext<'a> {
    fn new(step: &'a StepSpec, pending: DirtyFlags, sweep: usize) -> Self {
        Self {
            step,
            triggered: pending.intersection(step.clears()),
            pending,
            sweep,
            cascaded: DirtyFlags::none(),
        }
    }

    #[must_use]
    pub fn step(&self) -> &StepSpec {
        self.step
    }

    /// Dirty flags this step is about to clear.
    #[must_use]
    pub fn triggered(&self) -> DirtyFlags {
        self.triggered
    }

    /// Every flag pending when the step started.
    #[must_use]
    pub fn pending(&self) -> DirtyFlags {
        self.pending
    }

    #[must_use]
    pub fn sweep(&self) -> usize {
        self.sweep
    }

    /// Requests that later steps run in this flush.
    ///
    /// Only flags listed in the step's declared cascades are accepted.
    pub fn cascade(&mut self, flags: impl Into<DirtyFlags>) -> ChartResult<()> {
        let flags = flags.into();
        let undeclared = flags.difference(self.step.cascades());
        if !undeclared.is_none() {
            return Err(ChartError::RuntimeInvariant(format!(
                "step `{}` cascaded undeclared flags {undeclared:?}",
                self.step.name()
            )));
        }
        self.cascaded.merge(flags);
        Ok(())
    }

    #[must_use]
    pub fn cascaded(&self) -> DirtyFlags {
        self.cascaded
    }
}

/// Executes the body of a scheduled step.
///
/// Errors are returned from `flush` unchanged.
pub trait StepRunner {
    fn run_step(&mut self, context: &mut StepContext<'_>) -> ChartResult<()>;
}

impl<F> StepRunner for F
where
    F: FnMut(&mut StepContext<'_>) -> ChartResult<()>,
{
    fn run_step(&mut self, context: &mut StepContext<'_>) -> ChartResult<()> {
        self(context)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub rank: u16,
    pub ran: bool,
    pub triggered: DirtyFlags,
    pub cascaded: DirtyFlags,
}

/// Result of one rank-ordered sweep over the step table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenderPass {
    pub sweep: usize,
    pub outcomes: Vec<StepOutcome>,
}

impl RenderPass {
    pub fn executed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.ran)
            .map(|outcome| outcome.step.as_str())
    }

    #[must_use]
    pub fn ran(&self, step: &str) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| outcome.ran && outcome.step == step)
    }
}

/// Everything one `flush` call executed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FlushReport {
    pub passes: Vec<RenderPass>,
}

impl FlushReport {
    /// Executed step names across all sweeps, in execution order.
    #[must_use]
    pub fn executed_steps(&self) -> Vec<&str> {
        self.passes.iter().flat_map(RenderPass::executed).collect()
    }

    #[must_use]
    pub fn ran(&self, step: &str) -> bool {
        self.passes.iter().any(|pass| pass.ran(step))
    }

    #[must_use]
    pub fn execution_count(&self, step: &str) -> usize {
        self.executed_steps()
            .into_iter()
            .filter(|name| *name == step)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes
            .iter()
            .all(|pass| pass.outcomes.iter().all(|outcome| !outcome.ran))
    }
}

/// Turns bursts of mutations into one ordered, minimal recompute flush.
#[derive(Debug, Clone)]
pub struct InvalidationScheduler {
    mutations: Arc<MutationEffectTable>,
    steps: Arc<StepTable>,
    dirty: DirtyFlags,
    flush_count: u64,
}

impl InvalidationScheduler {
    /// Creates a scheduler whose first flush is a full pass.
    ///
    /// Fails when the mutation table can produce a flag that no step consumes.
    pub fn new(mutations: Arc<MutationEffectTable>, steps: Arc<StepTable>) -> ChartResult<Self> {
        let guarded = steps.guarded_flags();
        for (name, effect) in mutations.iter() {
            let orphaned = effect.reachable_flags().difference(guarded);
            if !orphaned.is_none() {
                return Err(ChartError::InvalidData(format!(
                    "mutation `{name}` sets {orphaned:?} which no step consumes"
                )));
            }
        }

        let mut scheduler = Self {
            mutations,
            steps,
            dirty: DirtyFlags::none(),
            flush_count: 0,
        };
        scheduler.mark_initial_load();
        Ok(scheduler)
    }

    /// Marks every step due, like a component's first load.
    pub fn mark_initial_load(&mut self) {
        self.dirty.merge(self.steps.guarded_flags());
    }

    /// Records an external input change. Nothing is recomputed until `flush`.
    pub fn mutate(
        &mut self,
        name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> ChartResult<DirtyFlags> {
        let flags = self.mutations.effects_for(name, old_value, new_value)?;
        self.dirty.merge(flags);
        trace!(mutation = name, flags = ?flags, "mutation recorded");
        Ok(flags)
    }

    /// Marks flags dirty directly, bypassing the mutation table.
    pub fn mark(&mut self, flags: DirtyFlags) -> ChartResult<()> {
        let orphaned = flags.difference(self.steps.guarded_flags());
        if !orphaned.is_none() {
            return Err(ChartError::InvalidData(format!(
                "flags {orphaned:?} are not consumed by any step"
            )));
        }
        self.dirty.merge(flags);
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> DirtyFlags {
        self.dirty
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.steps.iter().any(|step| step.is_due(self.dirty))
    }

    /// Steps the next flush would run first, in order.
    pub fn due_steps(&self) -> impl Iterator<Item = &StepSpec> {
        self.steps.steps_guarding(self.dirty)
    }

    #[must_use]
    pub fn step_table(&self) -> &StepTable {
        &self.steps
    }

    #[must_use]
    pub fn mutation_table(&self) -> &MutationEffectTable {
        &self.mutations
    }

    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Runs every due step once, in rank order.
    ///
    /// A step error aborts the flush: the failed step and everything after it
    /// keep their flags for the next flush, completed steps stay cleared.
    pub fn flush<R: StepRunner + ?Sized>(&mut self, runner: &mut R) -> ChartResult<FlushReport> {
        let mut report = FlushReport::default();
        if !self.has_pending() {
            return Ok(report);
        }
        self.flush_count = self.flush_count.saturating_add(1);

        for sweep in 0..=MAX_SWEEPS {
            if !self.has_pending() {
                break;
            }
            if sweep == MAX_SWEEPS {
                let due = self
                    .due_steps()
                    .map(|step| step.name().to_owned())
                    .collect::<Vec<_>>();
                return Err(ChartError::RuntimeInvariant(format!(
                    "cascades still pending after {MAX_SWEEPS} sweeps for steps {due:?}"
                )));
            }
            report.passes.push(self.run_sweep(sweep, runner)?);
        }

        debug!(
            flush = self.flush_count,
            sweeps = report.passes.len(),
            executed = ?report.executed_steps(),
            "flush completed"
        );
        Ok(report)
    }

    fn run_sweep<R: StepRunner + ?Sized>(
        &mut self,
        sweep: usize,
        runner: &mut R,
    ) -> ChartResult<RenderPass> {
        let steps = Arc::clone(&self.steps);
        let mut pass = RenderPass {
            sweep,
            outcomes: Vec::with_capacity(steps.len()),
        };

        for step in steps.iter() {
            if !step.is_due(self.dirty) {
                pass.outcomes.push(StepOutcome {
                    step: step.name().to_owned(),
                    rank: step.rank(),
                    ran: false,
                    triggered: DirtyFlags::none(),
                    cascaded: DirtyFlags::none(),
                });
                continue;
            }

            let mut context = StepContext::new(step, self.dirty, sweep);
            debug!(
                step = step.name(),
                rank = step.rank(),
                sweep,
                triggered = ?context.triggered(),
                "running step"
            );
            if let Err(err) = runner.run_step(&mut context) {
                warn!(
                    step = step.name(),
                    error = %err,
                    pending = ?self.dirty,
                    "step failed; flush aborted with remaining flags kept"
                );
                return Err(err);
            }

            self.dirty.remove_all(step.clears());
            self.dirty.merge(context.cascaded());
            pass.outcomes.push(StepOutcome {
                step: step.name().to_owned(),
                rank: step.rank(),
                ran: true,
                triggered: context.triggered(),
                cascaded: context.cascaded(),
            });
        }

        Ok(pass)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{InvalidationScheduler, StepContext};
    use crate::api::{DirtyFlag, DirtyFlags, MutationEffectTable, StepKind, StepSpec, StepTable};
    use crate::error::{ChartError, ChartResult};

    fn two_step_scheduler(cascades: DirtyFlags) -> InvalidationScheduler {
        let steps = StepTable::new(vec![
            StepSpec::new(
                "scales",
                StepKind::RecomputeScales,
                10,
                DirtyFlags::from_flag(DirtyFlag::RecomputeScales),
            )
            .with_cascades(cascades),
            StepSpec::new(
                "axes",
                StepKind::DrawDecorations,
                10,
                DirtyFlags::from_flag(DirtyFlag::Axes),
            ),
        ])
        .expect("valid step table");
        let mutations = MutationEffectTable::builder()
            .entry("domain", DirtyFlags::from_flag(DirtyFlag::RecomputeScales))
            .build()
            .expect("valid mutation table");
        let mut scheduler =
            InvalidationScheduler::new(Arc::new(mutations), Arc::new(steps)).expect("scheduler");
        scheduler
            .flush(&mut |_: &mut StepContext<'_>| -> ChartResult<()> { Ok(()) })
            .expect("bootstrap flush");
        scheduler
    }

    #[test]
    fn undeclared_cascade_is_rejected() {
        let mut scheduler = two_step_scheduler(DirtyFlags::none());
        scheduler
            .mutate("domain", &json!(0), &json!(1))
            .expect("known mutation");

        let result = scheduler.flush(&mut |ctx: &mut StepContext<'_>| -> ChartResult<()> {
            ctx.cascade(DirtyFlag::Axes)
        });
        assert!(matches!(result, Err(ChartError::RuntimeInvariant(_))));
        assert!(scheduler.pending().contains_flag(DirtyFlag::RecomputeScales));
    }

    #[test]
    fn cascade_to_equal_rank_step_is_consumed_in_the_same_sweep() {
        let mut scheduler = two_step_scheduler(DirtyFlags::from_flag(DirtyFlag::Axes));
        scheduler
            .mutate("domain", &json!(0), &json!(1))
            .expect("known mutation");

        let report = scheduler
            .flush(&mut |ctx: &mut StepContext<'_>| -> ChartResult<()> {
                if ctx.step().name() == "scales" {
                    ctx.cascade(DirtyFlag::Axes)?;
                }
                Ok(())
            })
            .expect("flush");
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.executed_steps(), vec!["scales", "axes"]);
        assert!(scheduler.pending().is_none());
    }

    #[test]
    fn mark_rejects_flags_without_consumer() {
        let mut scheduler = two_step_scheduler(DirtyFlags::none());
        let result = scheduler.mark(DirtyFlags::from_flag(DirtyFlag::Cursor));
        assert!(matches!(result, Err(ChartError::InvalidData(_))));
        assert!(scheduler.pending().is_none());
    }
}
