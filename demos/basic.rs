//! Minimal sepal node: a client app with built-in mods behind the HTTP server.
//!
//! Run with:
//!   RUST_LOG=info SEPAL_NODE_CONFIG="partition-id=0 num-partitions=2" cargo run --example basic
//!
//! Try:
//!   curl http://localhost:9094/healthz
//!   curl -X POST http://localhost:9094/messages \
//!        -H 'content-type: application/json' \
//!        -d '{"metadata":{"run_id":1,"src_node_id":0,"dst_node_id":7,
//!             "created_at":'"$(date +%s)"',"message_type":"train"},
//!             "content":{"config_records":{"fit":{"epochs":2}}}}'

use sepal::config::parse_config_args;
use sepal::middleware::expiry::Expiry;
use sepal::middleware::size::MessageSize;
use sepal::middleware::trace::Trace;
use sepal::middleware::{mod_fn, Mod};
use sepal::{
    handler_fn, ClientApp, Context, Message, MetricRecord, RecordDict, Scalar, Server,
};

#[tokio::main]
async fn main() -> sepal::Result<()> {
    tracing_subscriber::fmt::init();

    let node_config = parse_config_args(&std::env::var("SEPAL_NODE_CONFIG").unwrap_or_default())?;

    // Counts messages per run in context state, on the way in.
    let counter = mod_fn(|msg, ctx, next| {
        let seen = ctx
            .state
            .metric_records
            .get("node")
            .map_or(0, |r| r["messages"].as_f64() as i64);
        ctx.state
            .metric_records
            .insert("node", MetricRecord::from([("messages", seen + 1)]));
        next.run(msg, ctx)
    });

    let app = ClientApp::with_mods([
        Trace.boxed(),
        MessageSize.boxed(),
        Expiry::new().boxed(),
        counter.boxed(),
    ])
    .train(handler_fn(train))
    .query(handler_fn(query));

    Server::bind("0.0.0.0:9094")
        .node_id(7)
        .node_config(node_config)
        .serve(app)
        .await
}

// train: pretend to fit for `epochs` epochs and report a loss.
fn train(msg: &mut Message, ctx: &mut Context) -> sepal::Result<Message> {
    let epochs = match msg.content.config_records.get("fit").and_then(|fit| fit.get("epochs")) {
        Some(Scalar::Int(n)) => *n,
        _ => 1,
    };
    let partition = ctx.node_config.get("partition-id").cloned().unwrap_or(Scalar::Int(0));
    tracing::info!(epochs, ?partition, "training");

    let mut content = RecordDict::new();
    content.metric_records.insert(
        "train",
        MetricRecord::from([("loss", 1.0 / (epochs as f64 + 1.0)), ("num-examples", 600.0)]),
    );
    Ok(msg.reply(content))
}

// query: report what this node has seen in the current run.
fn query(msg: &mut Message, ctx: &mut Context) -> sepal::Result<Message> {
    let mut content = RecordDict::new();
    if let Some(node) = ctx.state.metric_records.get("node") {
        content.metric_records.insert("node", node.clone());
    }
    Ok(msg.reply(content))
}
