use eventgate::events::{listener_fn, DispatcherState, Event, EventDispatcher, ListenerExt};
use eventgate::{ListenerError, MemoryLogger};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

fn counting(counter: Arc<AtomicUsize>) -> impl eventgate::Listener {
    listener_fn(move |_event: Event| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

fn slow_counting(counter: Arc<AtomicUsize>, delay: Duration) -> impl eventgate::Listener {
    listener_fn(move |_event: Event| {
        let counter = counter.clone();
        async move {
            tokio::time::sleep(delay).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[tokio::test]
async fn failing_middle_listener_does_not_stop_the_rest() {
    let calls: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let dispatcher = EventDispatcher::new();
    dispatcher.listen("ticket.reserved", counting(calls[0].clone()));
    let c = calls[1].clone();
    dispatcher.listen(
        "ticket.reserved",
        listener_fn(move |_event: Event| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ListenerError::msg("inventory service unavailable"))
            }
        }),
    );
    dispatcher.listen("ticket.reserved", counting(calls[2].clone()));

    let err = dispatcher.dispatch(&Event::new("ticket.reserved", 1001u64)).await.unwrap_err();

    for (i, c) in calls.iter().enumerate() {
        assert_eq!(c.load(Ordering::SeqCst), 1, "listener {i} should run exactly once");
    }
    assert_eq!(err.index(), 1);
    assert_eq!(err.listener_error().to_string(), "inventory service unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_callers_twenty_dispatches_each_count_exactly() {
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher.listen("page.viewed", counting(handled.clone()));

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                dispatcher.dispatch(&Event::named("page.viewed")).await.unwrap();
            }
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task.unwrap();
    }

    assert_eq!(handled.load(Ordering::SeqCst), 1000);
}

#[tokio::test]
async fn dispatch_async_returns_immediately_and_shutdown_waits_for_all() {
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = EventDispatcher::new();
    dispatcher.listen("report.requested", slow_counting(handled.clone(), Duration::from_millis(200)));

    let start = Instant::now();
    for _ in 0..25 {
        dispatcher.dispatch_async(Event::named("report.requested"));
    }
    assert!(start.elapsed() < Duration::from_millis(100), "dispatch_async must not wait on listeners");
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    dispatcher.shutdown().await;
    assert_eq!(handled.load(Ordering::SeqCst), 25);
    assert_eq!(dispatcher.in_flight(), 0);
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
}

#[tokio::test]
async fn dispatch_async_after_shutdown_begins_is_dropped() {
    let handled = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let dispatcher = Arc::new(EventDispatcher::new());
    let (h, g) = (handled.clone(), gate.clone());
    dispatcher.listen(
        "order.placed",
        listener_fn(move |_event: Event| {
            let (h, g) = (h.clone(), g.clone());
            async move {
                g.notified().await;
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );

    dispatcher.dispatch_async(Event::named("order.placed"));
    let shutdown = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.shutdown().await })
    };
    while dispatcher.state() == DispatcherState::Running {
        tokio::task::yield_now().await;
    }

    dispatcher.dispatch_async(Event::named("order.placed"));
    dispatcher.dispatch_async(Event::named("order.placed"));
    assert_eq!(dispatcher.in_flight(), 1);

    gate.notify_one();
    shutdown.await.unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_with_timeout_reports_and_can_be_retried() {
    let handled = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let dispatcher = EventDispatcher::new();
    let (h, g) = (handled.clone(), gate.clone());
    dispatcher.listen(
        "export.started",
        listener_fn(move |_event: Event| {
            let (h, g) = (h.clone(), g.clone());
            async move {
                g.notified().await;
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );
    dispatcher.dispatch_async(Event::named("export.started"));

    let start = Instant::now();
    let err = dispatcher.shutdown_with_timeout(Duration::from_millis(100)).await.unwrap_err();
    let waited = start.elapsed();
    assert!(err.is_timeout());
    assert!(waited >= Duration::from_millis(100));
    assert!(waited < Duration::from_secs(1), "timeout must bound the wait, took {waited:?}");
    assert_eq!(dispatcher.state(), DispatcherState::ShuttingDown);
    assert_eq!(dispatcher.in_flight(), 1);

    gate.notify_one();
    dispatcher.shutdown_with_timeout(Duration::from_secs(5)).await.unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
}

#[tokio::test]
async fn sync_dispatch_still_works_after_shutdown() {
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = EventDispatcher::new();
    dispatcher.listen("audit", counting(handled.clone()));
    dispatcher.shutdown().await;

    dispatcher.dispatch(&Event::named("audit")).await.unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decorated_listeners_compose_with_dispatcher() {
    #[derive(Debug)]
    struct Reservation {
        seats: u32,
    }

    let logger = Arc::new(MemoryLogger::new());
    let bulk_seen = Arc::new(AtomicUsize::new(0));
    let dispatcher = EventDispatcher::new();

    dispatcher.listen(
        "ticket.reserved",
        counting(bulk_seen.clone())
            .when(|event: &Event| event.payload::<Reservation>().is_some_and(|r| r.seats >= 10)),
    );
    dispatcher.listen(
        "ticket.reserved",
        listener_fn(|_event: Event| async { Err(ListenerError::msg("mailer offline")) })
            .in_background(logger.clone()),
    );

    dispatcher.dispatch(&Event::new("ticket.reserved", Reservation { seats: 2 })).await.unwrap();
    dispatcher.dispatch(&Event::new("ticket.reserved", Reservation { seats: 12 })).await.unwrap();
    assert_eq!(bulk_seen.load(Ordering::SeqCst), 1);

    for _ in 0..200 {
        if logger.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(logger.len(), 2);
    assert!(logger.messages().iter().all(|m| m.contains("mailer offline")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listen_races_with_sync_and_async_dispatch() {
    let handled = Arc::new(AtomicUsize::new(0));
    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher.listen("cart.updated", counting(handled.clone()));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let (dispatcher, handled) = (dispatcher.clone(), handled.clone());
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                dispatcher.listen("cart.updated", counting(handled.clone()));
                tokio::task::yield_now().await;
            }
        }));
    }
    for _ in 0..4 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                dispatcher.dispatch(&Event::named("cart.updated")).await.unwrap();
                dispatcher.dispatch_async(Event::named("cart.updated"));
            }
        }));
    }

    let finished = tokio::time::timeout(Duration::from_secs(10), futures::future::join_all(tasks))
        .await
        .expect("listen and dispatch must not deadlock");
    for task in finished {
        task.unwrap();
    }
    dispatcher.shutdown().await;

    assert_eq!(dispatcher.listener_count("cart.updated"), 101);
    // Every dispatch sees between 1 and 101 listeners.
    let calls = handled.load(Ordering::SeqCst);
    assert!((200..=200 * 101).contains(&calls), "unexpected handled count {calls}");
}
