/*!
 * After-Fork Registry Tests
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proc_finalize::{ForkAwareLocal, ForkAwareLock, ProcessContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

struct Pool {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[test]
fn test_registration_order_across_threads() {
    let ctx = Arc::new(ProcessContext::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut keep = Vec::new();

    // Serialize registration across threads so the order is a, b, c.
    for name in ["a", "b", "c"] {
        let (tx, rx) = mpsc::channel();
        let ctx_clone = Arc::clone(&ctx);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let pool = Arc::new(Pool { name, log });
            let handle = ctx_clone.register_after_fork(&pool, |pool: &Pool| {
                pool.log.lock().push(pool.name);
                Ok(())
            });
            handle.detach();
            tx.send(pool).unwrap();
        })
        .join()
        .unwrap();
        keep.push(rx.recv().unwrap());
    }

    let report = ctx.reinit_after_fork();

    assert_eq!(report.invoked, 3);
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
}

#[test]
fn test_failing_callback_does_not_stop_the_rest() {
    let ctx = ProcessContext::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let owner = Arc::new(Arc::clone(&calls));

    let _first = ctx.register_after_fork(&owner, |_: &Arc<AtomicUsize>| {
        Err(anyhow::anyhow!("connection pool could not reconnect"))
    });
    let _second = ctx.register_after_fork(&owner, |calls: &Arc<AtomicUsize>| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let _third = ctx.register_after_fork(&owner, |_: &Arc<AtomicUsize>| panic!("bad reinit"));

    let report = ctx.run_after_fork();

    assert_eq!(report.failed, 2);
    assert_eq!(report.invoked, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.after_fork().len(), 3);
}

#[test]
fn test_dropped_owner_is_skipped() {
    let ctx = ProcessContext::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let owner = Arc::new(Arc::clone(&calls));
    ctx.register_after_fork(&owner, |calls: &Arc<AtomicUsize>| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .detach();
    drop(owner);

    let report = ctx.run_after_fork();

    assert_eq!(report.pruned, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(ctx.after_fork().is_empty());
}

#[test]
fn test_unregister_and_drop_remove_entries() {
    let ctx = ProcessContext::new();
    let owner = Arc::new(());

    let explicit = ctx.register_after_fork(&owner, |_: &()| Ok(()));
    let scoped = ctx.register_after_fork(&owner, |_: &()| Ok(()));
    assert_eq!(ctx.after_fork().len(), 2);
    assert!(explicit.is_registered());

    assert!(explicit.unregister());
    drop(scoped);

    assert!(ctx.after_fork().is_empty());
    assert_eq!(ctx.run_after_fork().invoked, 0);
}

#[test]
fn test_fork_aware_lock_reinitialized() {
    let ctx = ProcessContext::new();
    let lock = Arc::new(ForkAwareLock::new(ctx.after_fork(), 0u32));

    // Leak a guard to model a lock held by a thread that did not survive the fork.
    std::mem::forget(lock.lock());
    assert!(lock.is_locked());
    assert!(lock.try_lock().is_none());

    ctx.reinit_after_fork();

    assert!(!lock.is_locked());
    *lock.lock() += 1;
    assert_eq!(*lock.lock(), 1);
}

#[test]
fn test_fork_aware_local_cleared() {
    let ctx = ProcessContext::new();
    let local = Arc::new(ForkAwareLocal::<String>::new(ctx.after_fork()));

    local.set("main".to_string());
    {
        let local = Arc::clone(&local);
        thread::spawn(move || local.set("worker".to_string()))
            .join()
            .unwrap();
    }
    assert_eq!(local.len(), 2);
    assert_eq!(local.get().as_deref(), Some("main"));

    ctx.reinit_after_fork();

    assert!(local.is_empty());
    assert_eq!(local.with(|| "fresh".to_string(), |v| v.clone()), "fresh");
}
