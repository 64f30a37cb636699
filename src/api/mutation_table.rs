use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ChartError, ChartResult};

use super::DirtyFlags;

/// Flags contributed by one externally settable input.
///
/// Object-valued inputs (label or accessibility settings) may refine their
/// effect per field: when both the old and new value are objects, only the
/// changed fields contribute, each through its own flags, falling back to
/// `base` for fields without a refinement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MutationEffect {
    base: DirtyFlags,
    fields: IndexMap<String, DirtyFlags>,
}

impl MutationEffect {
    #[must_use]
    pub fn new(base: DirtyFlags) -> Self {
        Self {
            base,
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, flags: DirtyFlags) -> Self {
        self.fields.insert(field.into(), flags);
        self
    }

    #[must_use]
    pub fn base(&self) -> DirtyFlags {
        self.base
    }

    #[must_use]
    pub fn field(&self, field: &str) -> Option<DirtyFlags> {
        self.fields.get(field).copied()
    }

    /// Every flag this entry can ever produce.
    #[must_use]
    pub fn reachable_flags(&self) -> DirtyFlags {
        self.fields
            .values()
            .fold(self.base, |acc, flags| acc.union(*flags))
    }

    fn resolve(&self, old_value: &Value, new_value: &Value) -> DirtyFlags {
        if old_value == new_value {
            return DirtyFlags::none();
        }
        if self.fields.is_empty() {
            return self.base;
        }

        let (Value::Object(old_fields), Value::Object(new_fields)) = (old_value, new_value) else {
            return self.base;
        };

        let mut flags = DirtyFlags::none();
        for key in old_fields.keys().chain(new_fields.keys()) {
            if old_fields.get(key) == new_fields.get(key) {
                continue;
            }
            flags.merge(self.fields.get(key).copied().unwrap_or(self.base));
        }
        flags
    }
}

/// Static mapping from mutation (input property) name to the flags it sets.
///
/// Built once per chart type. Every input must have exactly one entry; a
/// lookup of an unlisted name is a wiring bug and fails loudly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MutationEffectTable {
    entries: IndexMap<String, MutationEffect>,
}

impl MutationEffectTable {
    #[must_use]
    pub fn builder() -> MutationEffectTableBuilder {
        MutationEffectTableBuilder::default()
    }

    /// Flags implied by changing `name` from `old_value` to `new_value`.
    pub fn effects_for(
        &self,
        name: &str,
        old_value: &Value,
        new_value: &Value,
    ) -> ChartResult<DirtyFlags> {
        self.entry(name)
            .map(|effect| effect.resolve(old_value, new_value))
    }

    pub fn entry(&self, name: &str) -> ChartResult<&MutationEffect> {
        self.entries
            .get(name)
            .ok_or_else(|| ChartError::UnknownMutation {
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MutationEffect)> {
        self.entries
            .iter()
            .map(|(name, effect)| (name.as_str(), effect))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn reachable_flags(&self) -> DirtyFlags {
        self.entries
            .values()
            .fold(DirtyFlags::none(), |acc, effect| {
                acc.union(effect.reachable_flags())
            })
    }
}

#[derive(Debug, Default)]
pub struct MutationEffectTableBuilder {
    entries: Vec<(String, MutationEffect)>,
}

impl MutationEffectTableBuilder {
    #[must_use]
    pub fn entry(self, name: impl Into<String>, flags: DirtyFlags) -> Self {
        self.effect(name, MutationEffect::new(flags))
    }

    /// Registers the same flags for several inputs, like watchers stacked on
    /// one handler (`width`, `height`, `padding`, `margin`).
    #[must_use]
    pub fn entries<'a>(
        mut self,
        names: impl IntoIterator<Item = &'a str>,
        flags: DirtyFlags,
    ) -> Self {
        for name in names {
            self = self.entry(name, flags);
        }
        self
    }

    #[must_use]
    pub fn effect(mut self, name: impl Into<String>, effect: MutationEffect) -> Self {
        self.entries.push((name.into(), effect));
        self
    }

    pub fn build(self) -> ChartResult<MutationEffectTable> {
        let mut entries = IndexMap::with_capacity(self.entries.len());
        for (name, effect) in self.entries {
            if name.is_empty() {
                return Err(ChartError::InvalidData(
                    "mutation name must not be empty".to_owned(),
                ));
            }
            if entries.contains_key(&name) {
                return Err(ChartError::InvalidData(format!(
                    "mutation `{name}` has more than one effect entry"
                )));
            }
            entries.insert(name, effect);
        }
        Ok(MutationEffectTable { entries })
    }
}
