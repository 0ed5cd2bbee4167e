//! Property tests for structural sharing of the execution context.

use cascade_core::{ExecutionId, FlowId};
use cascade_execution::ExecutionContext;
use cascade_value::Value;
use proptest::prelude::*;

fn context_with(keys: &std::collections::BTreeSet<String>) -> ExecutionContext {
    let mut ctx = ExecutionContext::new(FlowId::new("flow"), ExecutionId::nil());
    for key in keys {
        ctx = ctx.with_variable(key.clone(), Value::string(format!("payload-{key}")));
    }
    ctx
}

proptest! {
    #[test]
    fn untouched_keys_survive_updates_by_identity(
        keys in prop::collection::btree_set("[a-z]{1,6}", 1..8),
        new_key in "[A-Z]{1,6}",
    ) {
        let before = context_with(&keys);
        let after = before.with_variable(new_key, Value::number(1.0));

        for key in &keys {
            let old = before.variables.get(key).unwrap().as_str().unwrap();
            let new = after.variables.get(key).unwrap().as_str().unwrap();
            // Same allocation, not just equal contents.
            prop_assert_eq!(old.as_ptr(), new.as_ptr());
        }
    }

    #[test]
    fn noop_updates_preserve_map_identity(
        keys in prop::collection::btree_set("[a-z]{1,6}", 1..8),
    ) {
        let ctx = context_with(&keys);
        for key in &keys {
            let rewritten = ctx.with_variable(
                key.clone(),
                Value::string(format!("payload-{key}")),
            );
            prop_assert!(ctx.variables.ptr_eq(&rewritten.variables));
        }
    }

    #[test]
    fn overwrites_change_only_the_written_key(
        keys in prop::collection::btree_set("[a-z]{1,6}", 2..8),
    ) {
        let ctx = context_with(&keys);
        let target = keys.iter().next().unwrap().clone();
        let updated = ctx.with_variable(target.clone(), Value::string("rewritten"));

        prop_assert_eq!(
            updated.variables.get(&target),
            Some(&Value::string("rewritten"))
        );
        for key in keys.iter().filter(|k| **k != target) {
            prop_assert_eq!(ctx.variables.get(key), updated.variables.get(key));
        }
    }
}
