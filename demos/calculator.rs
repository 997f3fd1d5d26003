use contractrpc::{
    interface,
    net::{client::TcpTransport, server::Server},
    Bindings, Call, ClientBuilder, Implementation, ProcedureError, RouteTable, RpcConfig,
    SchemaRegistry, ServerBuilder,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::task;

interface! {
    pub struct Calculator {
        fn add(a: i64, b: i64) -> i64;
        async fn describe(n: i64, verbose: bool = false);
    }
}

pub struct Basic;

#[derive(Deserialize)]
struct Add {
    a: i64,
    b: i64,
}

#[derive(Deserialize)]
struct Describe {
    n: i64,
    verbose: bool,
}

#[derive(Serialize)]
struct Description {
    n: i64,
    even: bool,
    note: Option<String>,
}

impl Implementation for Basic {
    type Interface = Calculator;

    fn bind(bindings: &mut Bindings<Self>) {
        bindings
            .sync("add", |_: &Self, Add { a, b }| Ok(a + b))
            .asynchronous("describe", |_: Arc<Self>, Describe { n, verbose }| async move {
                Ok::<_, ProcedureError>(Description {
                    n,
                    even: n % 2 == 0,
                    note: verbose.then(|| format!("{n} is a number")),
                })
            });
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RpcConfig::new("127.0.0.1").with_port(8888).with_retry(2);

    let mut routes = RouteTable::new();
    ServerBuilder::new(&config, Arc::new(SchemaRegistry::new()))
        .setup(Arc::new(Basic), &mut routes, "/calc")
        .unwrap();
    task::spawn(Server::new(routes).serve_tcp(8888));
    tokio::time::sleep(Duration::from_secs_f32(0.01)).await;

    let calculator = ClientBuilder::new(&config, TcpTransport::from_config(&config).unwrap())
        .unwrap()
        .build::<Calculator>("/calc");

    let sum: i64 = calculator.call("add", Call::new().arg(2).arg(3)).await.unwrap();
    println!("2 + 3 = {sum}");

    let description = calculator
        .call_value("describe", Call::new().arg(7).kwarg("verbose", true))
        .await
        .unwrap();
    println!("{description}");

    let err = calculator
        .call_value("add", Call::new().arg("two"))
        .await
        .unwrap_err();
    println!("{err}");
}
