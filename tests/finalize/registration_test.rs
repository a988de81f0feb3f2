/*!
 * Finalizer Registration Tests
 */

use pretty_assertions::assert_eq;
use proc_finalize::{FinalizeError, Kwargs, OwnerRef, ProcessContext};
use serde_json::{json, Value};

#[test]
fn test_rejects_entry_without_owner_or_priority() {
    let ctx = ProcessContext::new();

    let result = ctx.register(None, |_, _| Ok(Value::Null), vec![], Kwargs::new(), None);
    assert!(matches!(result, Err(FinalizeError::InvalidConfiguration(_))));

    let result = ctx.finalizer(|_, _| Ok(Value::Null)).register();
    assert!(matches!(result, Err(FinalizeError::InvalidConfiguration(_))));

    assert!(ctx.finalizers().is_empty());
}

#[test]
fn test_owner_without_priority_is_allowed() {
    let ctx = ProcessContext::new();
    let finalizer = ctx
        .register(
            Some(OwnerRef::of::<Vec<u8>>()),
            |_, _| Ok(Value::Null),
            vec![],
            Kwargs::new(),
            None,
        )
        .unwrap();

    assert!(finalizer.is_active());
    assert_eq!(finalizer.priority(), None);
}

#[test]
fn test_display_live_and_dead() {
    let ctx = ProcessContext::new();
    let finalizer = ctx
        .finalizer(|_, _| Ok(Value::Null))
        .name("close_listener")
        .arg("/tmp/sock")
        .kwarg("force", true)
        .priority(5)
        .register()
        .unwrap();

    assert_eq!(
        finalizer.to_string(),
        r#"<Finalize object, callback=close_listener, args=["/tmp/sock"], kwargs={"force":true}, exitpriority=5>"#
    );

    finalizer.cancel();
    assert_eq!(finalizer.to_string(), "<Finalize object, dead>");
}

#[test]
fn test_display_omits_empty_parts() {
    let ctx = ProcessContext::new();
    let guard = ctx
        .finalizer(|_, _| Ok(Value::Null))
        .name("release")
        .guard(17u32)
        .unwrap();

    assert_eq!(guard.finalizer().to_string(), "<Finalize object, callback=release>");
}

#[test]
fn test_args_and_kwargs_reach_callback() {
    let ctx = ProcessContext::new();
    let finalizer = ctx
        .finalizer(|args, kwargs| Ok(json!({ "args": args, "kwargs": kwargs })))
        .arg(1)
        .arg("two")
        .kwarg("three", 3)
        .priority(0)
        .register()
        .unwrap();

    let result = finalizer.invoke().unwrap();
    assert_eq!(
        result,
        Some(json!({ "args": [1, "two"], "kwargs": { "three": 3 } }))
    );
}

#[test]
fn test_keys_are_unique_and_ordered_by_sequence() {
    let ctx = ProcessContext::new();
    let handles: Vec<_> = (0..10)
        .map(|_| {
            ctx.finalizer(|_, _| Ok(Value::Null))
                .priority(1)
                .register()
                .unwrap()
        })
        .collect();

    let sequences: Vec<_> = handles.iter().map(|h| h.key().sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(ctx.finalizers().keys().len(), 10);
}

#[test]
fn test_register_then_cancel_repeatedly() {
    let ctx = ProcessContext::new();

    for _ in 0..100 {
        let finalizer = ctx
            .finalizer(|_, _| Ok(Value::Null))
            .priority(1)
            .register()
            .unwrap();
        assert!(finalizer.cancel());
    }

    assert!(ctx.finalizers().is_empty());
}
