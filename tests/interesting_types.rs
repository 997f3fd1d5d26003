use contractrpc::{
    net::{client::TcpTransport, server::Server},
    Bindings, CallError, Call, ClientBuilder, Implementation, Interface, ProcedureDescriptor,
    ProcedureError, RouteTable, RpcConfig, SchemaRegistry, ServerBuilder, Type, Param,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::{net::TcpListener, task};

pub struct Quiz;

impl Interface for Quiz {
    const NAME: &'static str = "Quiz";

    fn procedures() -> Vec<ProcedureDescriptor> {
        vec![ProcedureDescriptor::sync("guess")
            .param(Param::required("answer", Type::one_of(["a", "b", "c", "d"])))]
    }
}

pub struct MultipleChoice {
    answer: &'static str,
}

impl MultipleChoice {
    fn new() -> Self {
        let answer = ["a", "b", "c", "d"][rand::random::<usize>() % 4];
        println!("The correct answer will be {answer}");
        Self { answer }
    }
}

#[derive(Deserialize)]
struct Guess {
    answer: String,
}

impl Implementation for MultipleChoice {
    type Interface = Quiz;

    fn bind(bindings: &mut Bindings<Self>) {
        bindings.sync("guess", |this: &Self, Guess { answer }| {
            Ok::<_, ProcedureError>(if answer == this.answer { "right" } else { "wrong" })
        });
    }
}

#[tokio::main(flavor = "current_thread")]
#[test]
async fn main() {
    let config = RpcConfig::default().with_retry(1);
    let mut routes = RouteTable::new();
    ServerBuilder::new(&config, Arc::new(SchemaRegistry::new()))
        .setup(Arc::new(MultipleChoice::new()), &mut routes, "/quiz")
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    task::spawn(Server::new(routes).serve(listener));

    let client = ClientBuilder::new(&config, TcpTransport(addr))
        .unwrap()
        .build::<Quiz>("/quiz");

    let mut rights = 0;
    let mut wrongs = 0;

    for ans in ["a", "b", "c", "d"] {
        let retval: String = client.call("guess", Call::new().arg(ans)).await.unwrap();
        println!("{ans} is {retval}");

        if retval == "right" {
            rights += 1;
        } else {
            wrongs += 1;
        }
    }

    assert_eq!(rights, 1);
    assert_eq!(wrongs, 3);

    for bad_guess in [Call::new().arg("x"), Call::new().arg(10), Call::new()] {
        let err = client.call_value("guess", bad_guess).await.unwrap_err();
        println!("{err}");
        assert!(matches!(err, CallError::CallFailure { status: 422, .. }));
    }
}
