/*!
 * Temp Directory Lifecycle Tests
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proc_finalize::{ContextConfig, ProcessContext, TempFileSystem};
use serde_json::Value;
use serial_test::serial;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records every filesystem call instead of touching the disk
struct FakeFileSystem {
    preferred: PathBuf,
    usable: Vec<PathBuf>,
    created: AtomicUsize,
    events: Arc<Mutex<Vec<String>>>,
}

impl FakeFileSystem {
    fn new(preferred: &str, usable: &[&str], events: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            preferred: PathBuf::from(preferred),
            usable: usable.iter().map(PathBuf::from).collect(),
            created: AtomicUsize::new(0),
            events: Arc::clone(events),
        })
    }
}

impl TempFileSystem for FakeFileSystem {
    fn default_temp_dir(&self) -> PathBuf {
        self.preferred.clone()
    }

    fn is_usable_dir(&self, path: &Path) -> bool {
        self.usable.iter().any(|p| p == path)
    }

    fn make_unique_dir(&self, base: &Path, prefix: &str) -> io::Result<PathBuf> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let path = base.join(format!("{}{:08}", prefix, n));
        self.events.lock().push(format!("create {}", path.display()));
        Ok(path)
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        self.events.lock().push(format!("remove {}", path.display()));
        Ok(())
    }
}

fn context(fs: Arc<FakeFileSystem>, config: ContextConfig) -> ProcessContext {
    ProcessContext::builder()
        .with_config(config)
        .with_filesystem(fs)
        .build()
}

#[test]
fn test_same_path_on_every_call() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let ctx = context(FakeFileSystem::new("/tmp", &[], &events), ContextConfig::default());

    let first = ctx.get_temp_dir().unwrap();
    let second = ctx.get_temp_dir().unwrap();

    assert_eq!(first, second);
    assert_eq!(first, PathBuf::from("/tmp/pfin-00000000"));
    assert_eq!(events.lock().len(), 1);
    assert_eq!(ctx.finalizers().len(), 1);
    assert_eq!(
        ctx.process_config().get("tempdir"),
        Some(Value::String("/tmp/pfin-00000000".to_string()))
    );
}

#[test]
fn test_removed_once_after_other_finalizers() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let ctx = context(FakeFileSystem::new("/tmp", &[], &events), ContextConfig::default());

    let path = ctx.get_temp_dir().unwrap();

    for (name, priority) in [("socket", 10), ("pool", 0), ("cache", -1)] {
        let events = Arc::clone(&events);
        ctx.finalizer(move |_, _| {
            events.lock().push(format!("close {}", name));
            Ok(Value::Null)
        })
        .priority(priority)
        .register()
        .unwrap();
    }

    ctx.begin_shutdown();

    assert_eq!(
        *events.lock(),
        vec![
            format!("create {}", path.display()),
            "close socket".to_string(),
            "close pool".to_string(),
            "close cache".to_string(),
            format!("remove {}", path.display()),
        ]
    );
    assert!(ctx.temp_dir().current().is_none());
    assert!(ctx.finalizers().is_empty());
}

#[test]
fn test_removal_entry_description() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let ctx = context(FakeFileSystem::new("/tmp", &[], &events), ContextConfig::default());

    ctx.get_temp_dir().unwrap();
    let keys = ctx.finalizers().keys();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].priority, Some(-100));
}

#[test]
fn test_new_directory_after_removal() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let ctx = context(FakeFileSystem::new("/tmp", &[], &events), ContextConfig::default());

    let first = ctx.get_temp_dir().unwrap();
    ctx.run_finalizers(None);
    let second = ctx.get_temp_dir().unwrap();

    assert_ne!(first, second);
    assert_eq!(ctx.finalizers().len(), 1);
}

#[test]
fn test_long_base_falls_back() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let long_base = format!("/{}", "d".repeat(90));
    let fs = FakeFileSystem::new(&long_base, &["/var/tmp", "/usr/tmp"], &events);
    let config = ContextConfig::default().with_sun_path_max(Some(108));
    let ctx = context(fs, config);

    let path = ctx.get_temp_dir().unwrap();

    // "/tmp" is not usable in the fake, so the next candidate wins
    assert_eq!(path.parent(), Some(Path::new("/var/tmp")));
}

#[test]
fn test_no_usable_fallback_keeps_preferred() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let long_base = format!("/{}", "d".repeat(90));
    let fs = FakeFileSystem::new(&long_base, &[], &events);
    let ctx = context(fs, ContextConfig::default().with_sun_path_max(Some(108)));

    let path = ctx.get_temp_dir().unwrap();

    assert_eq!(path.parent(), Some(Path::new(&long_base)));
}

#[test]
fn test_short_base_is_kept() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let fs = FakeFileSystem::new("/home/user/tmp", &["/tmp"], &events);
    let ctx = context(fs, ContextConfig::default().with_sun_path_max(Some(108)));

    assert_eq!(ctx.temp_dir().base_temp_dir(), PathBuf::from("/home/user/tmp"));
}

#[test]
fn test_custom_prefix() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let fs = FakeFileSystem::new("/tmp", &[], &events);
    let ctx = context(fs, ContextConfig::default().with_temp_dir_prefix("worker-"));

    let path = ctx.get_temp_dir().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();

    assert!(name.starts_with("worker-"));
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_real_directory_removed_at_shutdown() {
    let base = tempfile::tempdir().unwrap();
    let previous = std::env::var_os("TMPDIR");
    std::env::set_var("TMPDIR", base.path());

    let ctx = ProcessContext::new();
    let path = ctx.get_temp_dir().unwrap();

    match previous {
        Some(value) => std::env::set_var("TMPDIR", value),
        None => std::env::remove_var("TMPDIR"),
    }

    assert!(path.is_dir());
    assert!(path.starts_with(base.path()));
    std::fs::write(path.join("sock-placeholder"), b"x").unwrap();

    ctx.begin_shutdown();

    assert!(!path.exists());
    assert!(base.path().is_dir());
}
