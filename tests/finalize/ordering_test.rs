/*!
 * Batch Ordering Tests
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proc_finalize::{Args, Kwargs, OwnerRef, Priority, ProcessContext};
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;

fn recorder(
    log: &Arc<Mutex<Vec<usize>>>,
    id: usize,
) -> impl FnOnce(Args, Kwargs) -> anyhow::Result<Value> + Send + 'static {
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().push(id);
        Ok(Value::Null)
    }
}

#[test]
fn test_equal_priorities_run_lifo() {
    let ctx = ProcessContext::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    // Registered as [10, 10, 5, none]
    ctx.finalizer(recorder(&log, 0)).priority(10).register().unwrap();
    ctx.finalizer(recorder(&log, 1)).priority(10).register().unwrap();
    ctx.finalizer(recorder(&log, 2)).priority(5).register().unwrap();
    let bound = ctx
        .register(Some(OwnerRef::of::<()>()), recorder(&log, 3), vec![], Kwargs::new(), None)
        .unwrap();

    let report = ctx.run_finalizers(None);

    assert_eq!(*log.lock(), vec![1, 0, 2]);
    assert_eq!(report.selected, 3);
    assert_eq!(report.dropped, 1);
    assert!(!bound.is_active());
}

#[test]
fn test_zero_before_negative() {
    let ctx = ProcessContext::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    ctx.finalizer(recorder(&log, 1)).priority(0).register().unwrap();
    ctx.finalizer(recorder(&log, 2)).priority(-100).register().unwrap();

    ctx.begin_shutdown();
    assert_eq!(*log.lock(), vec![1, 2]);
}

#[test]
fn test_min_priority_run_is_not_terminal() {
    let ctx = ProcessContext::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    ctx.finalizer(recorder(&log, 1)).priority(3).register().unwrap();
    ctx.finalizer(recorder(&log, 2)).priority(-1).register().unwrap();
    let bound = ctx
        .register(Some(OwnerRef::of::<()>()), recorder(&log, 3), vec![], Kwargs::new(), None)
        .unwrap();

    let report = ctx.run_finalizers(Some(0));
    assert_eq!(report.invoked, 1);
    assert_eq!(report.dropped, 0);
    assert!(bound.is_active());
    assert_eq!(ctx.finalizers().len(), 2);
}

#[test]
fn test_finalizer_removed_mid_run_is_skipped() {
    let ctx = ProcessContext::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let victim = ctx.finalizer(recorder(&log, 1)).priority(1).register().unwrap();
    let canceller = {
        let victim = victim.clone();
        move |_: Args, _: Kwargs| {
            victim.cancel();
            Ok(Value::Null)
        }
    };
    ctx.finalizer(canceller).priority(2).register().unwrap();

    let report = ctx.run_finalizers(None);
    assert!(log.lock().is_empty());
    assert_eq!(report.invoked, 1);
    assert_eq!(report.discarded, 1);
}

#[test]
fn test_finalizer_registered_mid_run_is_dropped() {
    let ctx = Arc::new(ProcessContext::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let registrar = {
        let registry = ctx.finalizers().clone();
        let log = Arc::clone(&log);
        move |_: Args, _: Kwargs| {
            registry
                .finalizer(recorder(&log, 9))
                .priority(100)
                .register()?;
            Ok(Value::Null)
        }
    };
    ctx.finalizer(registrar).priority(1).register().unwrap();

    let report = ctx.run_finalizers(None);
    // Not part of the snapshot, removed by the final clear
    assert!(log.lock().is_empty());
    assert_eq!(report.dropped, 1);
    assert!(ctx.finalizers().is_empty());
}

proptest! {
    #[test]
    fn prop_full_run_orders_by_priority_then_lifo(
        priorities in proptest::collection::vec(proptest::option::of(-5i32..5), 0..40)
    ) {
        let ctx = ProcessContext::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for (id, priority) in priorities.iter().enumerate() {
            let owner = priority.is_none().then(OwnerRef::of::<()>);
            handles.push(
                ctx.register(owner, recorder(&log, id), vec![], Kwargs::new(), *priority)
                    .unwrap(),
            );
        }

        ctx.run_finalizers(None);

        let mut expected: Vec<(Priority, usize)> = priorities
            .iter()
            .enumerate()
            .filter_map(|(id, p)| p.map(|p| (p, id)))
            .collect();
        expected.sort_by(|a, b| b.cmp(a));
        let expected: Vec<usize> = expected.into_iter().map(|(_, id)| id).collect();

        prop_assert_eq!(log.lock().clone(), expected);
        prop_assert!(ctx.finalizers().is_empty());
        prop_assert!(handles.iter().all(|h| !h.is_active()));
    }
}
