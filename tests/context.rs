// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use shapecheck::*;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

#[test]
fn accessors_outside_a_context() {
    let var = ContextVar::<i64>::new();
    assert!(matches!(var.get(), Err(Error::Usage(_))));
    assert!(matches!(var.with_value(1i64, || ()), Err(Error::Usage(_))));
    // The lenient accessor yields the absent sentinel instead.
    assert_eq!(var.try_get(), None);
}

#[test]
fn unset_slot_reads_as_none() -> Result<()> {
    let var = ContextVar::<i64>::new();
    enter(|| -> Result<()> {
        assert_eq!(var.get()?, None);
        assert_eq!(var.try_get(), None);
        Ok(())
    })
}

#[test]
fn with_value_scopes_and_nests() -> Result<()> {
    let var = ContextVar::<i64>::new();
    enter(|| -> Result<()> {
        var.with_value(1i64, || -> Result<()> {
            assert_eq!(var.get()?.as_deref(), Some(&1));
            var.with_value(2i64, || -> Result<()> {
                assert_eq!(var.get()?.as_deref(), Some(&2));
                Ok(())
            })??;
            assert_eq!(var.get()?.as_deref(), Some(&1));
            Ok(())
        })??;
        assert_eq!(var.get()?, None);
        Ok(())
    })
}

#[test]
fn with_value_restores_after_inner_failure() -> Result<()> {
    let var = ContextVar::<i64>::new();
    enter(|| -> Result<()> {
        var.with_value(1i64, || -> Result<()> {
            let inner: Result<()> =
                var.with_value(2i64, || Err(Error::Usage("inner failure".into())))?;
            assert!(inner.is_err());
            // The outer value is visible again.
            assert_eq!(var.get()?.as_deref(), Some(&1));
            Ok(())
        })?
    })
}

#[test]
fn with_value_restores_after_a_panic() -> Result<()> {
    let var = ContextVar::<i64>::new();
    enter(|| -> Result<()> {
        var.with_value(1i64, || -> Result<()> {
            let caught = catch_unwind(AssertUnwindSafe(|| {
                let _ = var.with_value(2i64, || -> () { panic!("boom") });
            }));
            assert!(caught.is_err());
            assert_eq!(var.get()?.as_deref(), Some(&1));
            Ok(())
        })?
    })
}

#[test]
fn variables_get_independent_slots() -> Result<()> {
    let a = ContextVar::<i64>::new();
    let b = ContextVar::<String>::new();
    enter(|| -> Result<()> {
        a.with_value(1i64, || -> Result<()> {
            b.with_value(String::from("x"), || -> Result<()> {
                assert_eq!(a.get()?.as_deref(), Some(&1));
                assert_eq!(b.get()?.as_deref().map(String::as_str), Some("x"));
                Ok(())
            })?
        })?
    })
}

#[test]
fn propagate_requires_a_context_at_wrap_time() {
    let wrapped = propagate(|_: ()| -> Result<i64> { Ok(0) }, "orphan callback");
    assert!(matches!(wrapped, Err(Error::Usage(_))));
}

#[test]
fn propagate_sync_path_returns_the_result_under_captured_state() -> Result<()> {
    let var = ContextVar::<i64>::new();
    enter(|| -> Result<()> {
        let inner = var.clone();
        let wrapped = var.with_value(42i64, || {
            propagate(
                move |x: i64| -> Result<(i64, Option<i64>)> {
                    let seen = inner.get()?.as_deref().copied();
                    Ok((x * 2, seen))
                },
                "doubler",
            )
        })??;

        // Invoked later under different state, the callback still sees the
        // state captured at wrap time.
        let out = var.with_value(7i64, || wrapped(10))??;
        assert_eq!(out, Some((20, Some(42))));

        // The caller's own state survives the installed snapshot.
        var.with_value(7i64, || -> Result<()> {
            assert_eq!(var.get()?.as_deref(), Some(&7));
            Ok(())
        })??;
        Ok(())
    })
}

#[test]
fn concurrent_invocations_see_wrap_time_state() -> Result<()> {
    let var = ContextVar::<i64>::new();
    let inner = var.clone();
    let wrapped = enter(|| {
        var.with_value(99i64, || {
            propagate(
                move |_: ()| -> Result<Option<i64>> { Ok(inner.get()?.as_deref().copied()) },
                "reader",
            )
        })
    })??;

    // Each invocation installs its own copy of the snapshot, so two
    // contexts running the same wrapped function at once cannot interfere.
    let wrapped = std::sync::Arc::new(wrapped);
    let mut workers = vec![];
    for _ in 0..2 {
        let wrapped = std::sync::Arc::clone(&wrapped);
        workers.push(std::thread::spawn(move || enter(|| wrapped(()))));
    }
    for worker in workers {
        let out = worker.join().expect("worker panicked")?;
        assert_eq!(out, Some(Some(99)));
    }
    Ok(())
}

#[test]
fn propagate_sync_fault_reaches_handler_and_caller() -> Result<()> {
    let (tx, rx) = mpsc::channel::<String>();
    let tx = Mutex::new(tx);
    let handler = OnFault::handler(move |e| {
        let _ = tx.lock().unwrap().send(e.to_string());
    });

    enter(|| -> Result<()> {
        let wrapped = propagate(
            |_: ()| -> Result<()> { Err(Error::Usage("deliberate".into())) },
            handler,
        )?;
        let result = wrapped(());
        assert!(matches!(result, Err(Error::Usage(_))));
        Ok(())
    })?;

    let message = rx.try_recv().expect("handler should have run synchronously");
    assert!(message.contains("deliberate"), "got: {message}");
    Ok(())
}

#[test]
fn propagate_async_path_spawns_and_faults_only_to_handler() -> Result<()> {
    let var = ContextVar::<i64>::new();
    let (tx, rx) = mpsc::channel::<String>();
    let tx = Mutex::new(tx);
    let handler = OnFault::handler(move |e| {
        let _ = tx.lock().unwrap().send(e.to_string());
    });

    let inner = var.clone();
    let wrapped = enter(|| {
        var.with_value(5i64, || {
            propagate(
                move |_: ()| -> Result<i64> {
                    let seen = inner.get()?.as_deref().copied();
                    Err(Error::Usage(format!("saw {seen:?}")))
                },
                handler,
            )
        })
    })??;

    // No context is active here, so the call spawns and returns at once;
    // the callee's fault never reaches this caller.
    let out = wrapped(())?;
    assert_eq!(out, None);

    let message = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("fault handler never ran");
    assert!(message.contains("saw Some(5)"), "got: {message}");
    Ok(())
}
