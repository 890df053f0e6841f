use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sepal::middleware::{compose, mod_fn, BoxedMod, Chain, Mod};
use sepal::{
    handler_fn, BoxedHandler, ConfigRecord, Context, Error, Handler, Message, Metadata, MetricRecord,
    RecordDict,
};

const METRIC: &str = "context";
const COUNTER: &str = "counter";

type Footprint = Arc<Mutex<Vec<String>>>;

fn increment_counter(context: &mut Context) {
    let current = context.state.metric_records[METRIC][COUNTER].as_f64();
    context
        .state
        .metric_records
        .insert(METRIC, MetricRecord::from([(COUNTER, current + 1.0)]));
}

fn mock_mod(name: &'static str, footprint: &Footprint) -> BoxedMod {
    let footprint = Arc::clone(footprint);
    mod_fn(move |msg, ctx, next| {
        footprint.lock().unwrap().push(name.to_owned());
        msg.content.config_records.insert(name, ConfigRecord::new());
        increment_counter(ctx);

        let mut reply = next.run(msg, ctx)?;

        footprint.lock().unwrap().push(name.to_owned());
        increment_counter(ctx);
        reply.content.config_records.insert(name, ConfigRecord::new());
        Ok(reply)
    })
    .boxed()
}

fn mock_app(name: &'static str, footprint: &Footprint) -> BoxedHandler {
    let footprint = Arc::clone(footprint);
    handler_fn(move |msg: &mut Message, _: &mut Context| {
        footprint.lock().unwrap().push(name.to_owned());
        msg.content.config_records.insert(name, ConfigRecord::new());
        let mut reply = Message::with_metadata(msg.metadata.clone(), RecordDict::new());
        reply.content.config_records.insert(name, ConfigRecord::new());
        Ok(reply)
    })
    .boxed()
}

fn message() -> Message {
    let mut metadata = Metadata::new(0, 0, 0, "train");
    metadata.created_at = 1_700_000_000.0;
    Message::with_metadata(metadata, RecordDict::new())
}

fn counting_context() -> Context {
    let mut context = Context::new(1, 0);
    context
        .state
        .metric_records
        .insert(METRIC, MetricRecord::from([(COUNTER, 0.0)]));
    context
}

fn keys(content: &RecordDict) -> Vec<String> {
    content.config_records.keys().map(str::to_owned).collect()
}

#[test]
fn fourteen_mods_run_as_an_onion() {
    let footprint = Footprint::default();
    let names: Vec<&'static str> = vec![
        "mod1", "mod2", "mod3", "mod4", "mod5", "mod6", "mod7", "mod8", "mod9", "mod10", "mod11",
        "mod12", "mod13", "mod14",
    ];
    let mods: Vec<BoxedMod> = names.iter().map(|&n| mock_mod(n, &footprint)).collect();
    let mut context = counting_context();
    let mut msg = message();

    let wrapped = compose(mock_app("app", &footprint), &mods);
    let reply = wrapped.call(&mut msg, &mut context).unwrap();

    let mut trace: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    trace.push("app".into());
    let mut expected = trace.clone();
    expected.extend(names.iter().rev().map(|n| n.to_string()));
    let footprint = footprint.lock().unwrap();
    assert_eq!(*footprint, expected);
    assert_eq!(footprint.len(), 29);

    assert_eq!(keys(&msg.content), trace);
    assert_eq!(keys(&reply.content), trace.iter().rev().cloned().collect::<Vec<_>>());
    assert_eq!(context.state.metric_records[METRIC][COUNTER], 28.0);
}

#[test]
fn filter_mod_stops_the_chain() {
    let footprint = Footprint::default();
    let app_calls = Arc::new(AtomicUsize::new(0));
    let app = {
        let app_calls = Arc::clone(&app_calls);
        let inner = mock_app("app", &footprint);
        handler_fn(move |msg: &mut Message, ctx: &mut Context| {
            app_calls.fetch_add(1, Ordering::SeqCst);
            inner.call(msg, ctx)
        })
        .boxed()
    };
    let filter = {
        let footprint = Arc::clone(&footprint);
        mod_fn(move |msg, _ctx, _next| {
            footprint.lock().unwrap().push("filter".into());
            msg.content.config_records.insert("filter", ConfigRecord::new());
            let mut reply = Message::with_metadata(msg.metadata.clone(), RecordDict::new());
            reply.content.config_records.insert("filter", ConfigRecord::new());
            Ok(reply)
        })
        .boxed()
    };
    let mut msg = message();

    let wrapped = compose(app, &[filter]);
    let reply = wrapped.call(&mut msg, &mut Context::new(1, 0)).unwrap();

    assert_eq!(*footprint.lock().unwrap(), ["filter"]);
    assert_eq!(msg.content.config_records.keys().next(), Some("filter"));
    assert_eq!(reply.content.config_records.keys().next(), Some("filter"));
    assert_eq!(app_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn short_circuit_reply_still_flows_through_outer_mods() {
    let footprint = Footprint::default();
    let blocker = {
        let footprint = Arc::clone(&footprint);
        mod_fn(move |msg, _ctx, _next| {
            footprint.lock().unwrap().push("m2".into());
            let mut reply = msg.reply(RecordDict::new());
            reply.content.config_records.insert("m2", ConfigRecord::new());
            Ok(reply)
        })
        .boxed()
    };
    let mods = vec![mock_mod("m1", &footprint), blocker, mock_mod("m3", &footprint)];
    let mut context = counting_context();

    let wrapped = compose(mock_app("app", &footprint), &mods);
    let reply = wrapped.call(&mut message(), &mut context).unwrap();

    assert_eq!(*footprint.lock().unwrap(), ["m1", "m2", "m1"]);
    assert_eq!(keys(&reply.content), ["m2", "m1"]);
    assert_eq!(context.state.metric_records[METRIC][COUNTER], 2.0);
}

#[test]
fn empty_chain_is_the_handler_itself() {
    let footprint = Footprint::default();
    let app = mock_app("app", &footprint);

    let wrapped = compose(Arc::clone(&app), &[]);
    assert!(Arc::ptr_eq(&wrapped, &app));

    let direct = app.call(&mut message(), &mut Context::default()).unwrap();
    let composed = wrapped.call(&mut message(), &mut Context::default()).unwrap();
    assert_eq!(direct, composed);
}

#[test]
fn counter_is_twice_the_chain_length() {
    for n in [1, 3, 7] {
        let footprint = Footprint::default();
        let mods: Vec<BoxedMod> = (0..n).map(|_| mock_mod("m", &footprint)).collect();
        let mut context = counting_context();

        compose(mock_app("app", &footprint), &mods)
            .call(&mut message(), &mut context)
            .unwrap();

        assert_eq!(context.state.metric_records[METRIC][COUNTER], 2.0 * n as f64);
    }
}

#[test]
fn terminal_handler_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = {
        let calls = Arc::clone(&calls);
        handler_fn(move |msg: &mut Message, _: &mut Context| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(msg.reply(RecordDict::new()))
        })
        .boxed()
    };
    let pass = || mod_fn(|msg, ctx, next| next.run(msg, ctx)).boxed();

    compose(app, &[pass(), pass(), pass()])
        .call(&mut message(), &mut Context::default())
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
struct DiskFull;

#[test]
fn errors_propagate_unchanged() {
    let footprint = Footprint::default();
    let failing = handler_fn(|_: &mut Message, _: &mut Context| Err(Error::app(DiskFull))).boxed();
    let mods = vec![mock_mod("m1", &footprint), mock_mod("m2", &footprint)];

    let err = compose(failing, &mods)
        .call(&mut message(), &mut counting_context())
        .unwrap_err();

    match err {
        Error::App(inner) => assert!(inner.downcast_ref::<DiskFull>().is_some()),
        other => panic!("unexpected error: {other}"),
    }
    // The `?` in each mod returns before its outbound pass.
    assert_eq!(*footprint.lock().unwrap(), ["m1", "m2"]);
}

#[test]
fn mod_errors_skip_inner_layers() {
    let footprint = Footprint::default();
    let reject = mod_fn(|_msg, _ctx, _next| Err(Error::app("rejected"))).boxed();
    let mods = vec![mock_mod("m1", &footprint), reject, mock_mod("m3", &footprint)];

    let err = compose(mock_app("app", &footprint), &mods)
        .call(&mut message(), &mut counting_context())
        .unwrap_err();

    assert_eq!(err.to_string(), "rejected");
    assert_eq!(*footprint.lock().unwrap(), ["m1"]);
}

#[test]
fn duplicate_entries_overwrite_or_reject() {
    let footprint = Footprint::default();
    let strict = mod_fn(|msg, ctx, next| {
        msg.content.config_records.try_insert("app", ConfigRecord::new())?;
        next.run(msg, ctx)
    })
    .boxed();

    // The app overwrites in place, so the request keeps a single `app` entry.
    let mut msg = message();
    compose(mock_app("app", &footprint), &[mock_mod("app", &footprint)])
        .call(&mut msg, &mut counting_context())
        .unwrap();
    assert_eq!(keys(&msg.content), ["app"]);

    let mut msg = message();
    msg.content.config_records.insert("app", ConfigRecord::new());
    let err = compose(mock_app("app", &footprint), &[strict])
        .call(&mut msg, &mut Context::default())
        .unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)), "{err}");
}

#[test]
fn builder_matches_compose() {
    let footprint = Footprint::default();
    let outer = Arc::clone(&footprint);
    let chain = Chain::new(mock_app("app", &footprint))
        .layer(mod_fn(move |msg, ctx, next| {
            outer.lock().unwrap().push("a".into());
            next.run(msg, ctx)
        }))
        .layers([mock_mod("b", &footprint)])
        .build();

    chain.call(&mut message(), &mut counting_context()).unwrap();

    assert_eq!(*footprint.lock().unwrap(), ["a", "b", "app", "b"]);
}
