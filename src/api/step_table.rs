use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

use super::DirtyFlags;

/// Collaborator family that supplies a step's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    PrepareData,
    RecomputeScales,
    DrawGeometry,
    DrawDecorations,
    PlaceLabels,
    DescribeAccessibility,
    ApplyInteraction,
}

/// Declaration of one recompute step.
///
/// A step runs when any guard flag is dirty. On success it clears `clears`
/// (always a superset of `guards`) and may set flags from `cascades`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSpec {
    name: String,
    kind: StepKind,
    rank: u16,
    guards: DirtyFlags,
    clears: DirtyFlags,
    cascades: DirtyFlags,
}

impl StepSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StepKind, rank: u16, guards: DirtyFlags) -> Self {
        Self {
            name: name.into(),
            kind,
            rank,
            guards,
            clears: guards,
            cascades: DirtyFlags::none(),
        }
    }

    /// Extra flags the step subsumes; its guards are always cleared too.
    #[must_use]
    pub fn with_clears(mut self, flags: DirtyFlags) -> Self {
        self.clears = self.guards.union(flags);
        self
    }

    #[must_use]
    pub fn with_cascades(mut self, flags: DirtyFlags) -> Self {
        self.cascades = flags;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    #[must_use]
    pub fn rank(&self) -> u16 {
        self.rank
    }

    #[must_use]
    pub fn guards(&self) -> DirtyFlags {
        self.guards
    }

    #[must_use]
    pub fn clears(&self) -> DirtyFlags {
        self.clears
    }

    #[must_use]
    pub fn cascades(&self) -> DirtyFlags {
        self.cascades
    }

    #[must_use]
    pub fn is_due(&self, dirty: DirtyFlags) -> bool {
        self.guards.intersects(dirty)
    }
}

/// Validated, rank-ordered list of steps.
///
/// Steps with equal rank keep their declaration order. Construction rejects
/// tables in which a step clears a later step's guard or cascades into an
/// earlier step's guard, so a flush can never loop backward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepTable {
    steps: Vec<StepSpec>,
}

impl StepTable {
    pub fn new(mut steps: Vec<StepSpec>) -> ChartResult<Self> {
        if steps.is_empty() {
            return Err(ChartError::InvalidData(
                "step table must declare at least one step".to_owned(),
            ));
        }
        steps.sort_by_key(StepSpec::rank);
        validate_steps(&steps)?;
        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepSpec> {
        self.steps.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.name == name)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name == name)
    }

    /// Union of every step's guard flags.
    #[must_use]
    pub fn guarded_flags(&self) -> DirtyFlags {
        self.steps
            .iter()
            .fold(DirtyFlags::none(), |acc, step| acc.union(step.guards))
    }

    /// Steps whose guard intersects `flags`, in execution order.
    pub fn steps_guarding(&self, flags: DirtyFlags) -> impl Iterator<Item = &StepSpec> {
        self.steps.iter().filter(move |step| step.is_due(flags))
    }
}

fn validate_steps(steps: &[StepSpec]) -> ChartResult<()> {
    for (index, step) in steps.iter().enumerate() {
        if step.name.is_empty() {
            return Err(ChartError::InvalidData(
                "step name must not be empty".to_owned(),
            ));
        }
        if steps[..index].iter().any(|other| other.name == step.name) {
            return Err(ChartError::InvalidData(format!(
                "step `{}` is declared more than once",
                step.name
            )));
        }
        if step.guards.is_none() {
            return Err(ChartError::InvalidData(format!(
                "step `{}` must declare at least one guard flag",
                step.name
            )));
        }
        if !step.clears.contains_all(step.guards) {
            return Err(ChartError::InvalidData(format!(
                "step `{}` must clear all of its guard flags",
                step.name
            )));
        }
    }

    let guarded = steps
        .iter()
        .fold(DirtyFlags::none(), |acc, step| acc.union(step.guards));

    for step in steps {
        for later in steps.iter().filter(|other| other.rank > step.rank) {
            if let Some(flag) = step.clears.intersection(later.guards).iter().next() {
                return Err(ChartError::Cycle {
                    step: step.name.clone(),
                    flag,
                    guarded_by: later.name.clone(),
                });
            }
        }

        for earlier in steps.iter().filter(|other| other.rank < step.rank) {
            if let Some(flag) = step.cascades.intersection(earlier.guards).iter().next() {
                return Err(ChartError::Cycle {
                    step: step.name.clone(),
                    flag,
                    guarded_by: earlier.name.clone(),
                });
            }
        }

        if let Some(flag) = step.cascades.difference(guarded).iter().next() {
            return Err(ChartError::InvalidData(format!(
                "step `{}` cascades {flag} which no step consumes",
                step.name
            )));
        }
    }

    Ok(())
}
