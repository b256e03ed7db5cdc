use crate::context::GraphContext;
use crate::nodes::node_state::{CachedState, NodeRuntimeState};
use crate::target::Target;
use crate::task_list::BoneMaskTaskList;

/// Values that have a cached node variant.
pub(crate) trait Cacheable: Clone + Default {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self>;
}

impl Cacheable for f32 {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_float()
    }
}

impl Cacheable for bool {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_bool()
    }
}

impl Cacheable for [f32; 4] {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_vector()
    }
}

impl Cacheable for String {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_id()
    }
}

impl Cacheable for Target {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_target()
    }
}

impl Cacheable for BoneMaskTaskList {
    fn slot(state: &mut NodeRuntimeState) -> &mut CachedState<Self> {
        state.cached_bone_mask()
    }
}

/// Read through `read` when the cache is open, otherwise return the latched value.
pub(crate) fn evaluate_cached<'a, T: Cacheable>(
    ctx: &mut GraphContext<'a>,
    index: usize,
    read: impl FnOnce(&mut GraphContext<'a>) -> T,
) -> T {
    let branch = ctx.branch_state;
    if T::slot(ctx.state_mut(index)).needs_input(branch) {
        let value = read(ctx);
        T::slot(ctx.state_mut(index)).store(value)
    } else {
        T::slot(ctx.state_mut(index)).value.clone()
    }
}
