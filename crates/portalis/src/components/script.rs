//! Scripts and the queue of pending script invocations.
//!
//! Interpreting scripts is the host's business. The engine records which
//! script fired, why, and for which entities; the host drains the queue.

use serde::{Deserialize, Serialize};

use portalis_core::{component_base, Base, Component, ComponentFlags, Entity, World};

/// How a script's code is wrapped before interpretation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptStyle {
    /// A statement list.
    #[default]
    Statement,
    /// A single boolean expression.
    BoolExpr,
    /// Code used verbatim.
    Raw,
}

/// A shareable piece of script code.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    #[serde(flatten)]
    base: Base,
    /// Source text, opaque to the engine.
    #[serde(rename = "Code")]
    pub code: String,
    /// Wrapping style.
    #[serde(rename = "Style")]
    pub style: ScriptStyle,
}

impl Component for Script {
    const NAME: &'static str = "core.Script";
    const SHAREABLE: bool = true;
    component_base!();
}

/// Why a script fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptTrigger {
    /// A body entered a sector.
    Enter,
    /// A body left a sector.
    Exit,
    /// A body touched a floor.
    Floor,
    /// A body touched a ceiling.
    Ceiling,
    /// A body touched a wall segment.
    Wall,
    /// Two bodies touched.
    Contact,
}

/// A script that fired, with the entities it concerns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptInvocation {
    /// Source text.
    pub code: String,
    /// Trigger.
    pub trigger: ScriptTrigger,
    /// The body that caused the trigger.
    pub body: Entity,
    /// The sector involved, if any.
    pub sector: Entity,
    /// The other body of a contact.
    pub other: Entity,
}

/// Pending invocations. Never saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptQueue {
    #[serde(flatten)]
    base: Base,
    /// Invocations in firing order.
    #[serde(skip)]
    pub pending: Vec<ScriptInvocation>,
}

impl Default for ScriptQueue {
    fn default() -> Self {
        Self {
            base: Base::with_flags(ComponentFlags::INTERNAL),
            pending: Vec::new(),
        }
    }
}

impl Component for ScriptQueue {
    const NAME: &'static str = "core.ScriptQueue";
    const DEFAULT_FLAGS: ComponentFlags = ComponentFlags::INTERNAL;
    component_base!();
}

/// Queues one invocation per script in `scripts`.
pub fn queue_scripts(
    world: &mut World,
    scripts: &[String],
    trigger: ScriptTrigger,
    body: Entity,
    sector: Entity,
    other: Entity,
) {
    if scripts.is_empty() {
        return;
    }
    let Some(queue) = world.singleton::<ScriptQueue>() else {
        return;
    };
    queue.pending.extend(scripts.iter().map(|code| ScriptInvocation {
        code: code.clone(),
        trigger,
        body,
        sector,
        other,
    }));
}

/// Removes and returns every pending invocation.
pub fn drain_scripts(world: &mut World) -> Vec<ScriptInvocation> {
    world
        .singleton::<ScriptQueue>()
        .map(|q| std::mem::take(&mut q.pending))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_and_drain() {
        let mut world = World::new();
        world.register_component::<ScriptQueue>();
        let body = world.new_entity();
        let sector = world.new_entity();
        queue_scripts(
            &mut world,
            &["open()".to_string(), "close()".to_string()],
            ScriptTrigger::Enter,
            body,
            sector,
            Entity::NULL,
        );
        let drained = drain_scripts(&mut world);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].code, "open()");
        assert_eq!(drained[1].trigger, ScriptTrigger::Enter);
        assert!(drain_scripts(&mut world).is_empty());
    }

    #[test]
    fn test_queue_is_internal() {
        let mut world = World::new();
        world.register_component::<ScriptQueue>();
        world.singleton::<ScriptQueue>();
        let (owner, _) = world.first::<ScriptQueue>().unwrap();
        assert!(world.entity_all_no_save(owner));
    }
}
