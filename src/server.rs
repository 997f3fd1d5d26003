use crate::{
    config::RpcConfig,
    conformance,
    dispatcher::Dispatcher,
    error::SetupError,
    implementation::Implementation,
    procedure::Interface,
    schema::SchemaRegistry,
    transport::{self, Router},
};
use std::sync::Arc;

/// Installs dispatch handlers for implementations on a [`Router`].
pub struct ServerBuilder {
    schemas: Arc<SchemaRegistry>,
    secure_build: bool,
}

impl ServerBuilder {
    pub fn new(config: &RpcConfig, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            schemas,
            secure_build: config.secure_build,
        }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Register a handler at `{prefix}/{Interface}/{procedure}` for every
    /// procedure the interface marks remote. Returns the number of routes added.
    ///
    /// Every procedure and every path is checked before any route is
    /// registered, so a failing setup installs nothing.
    pub fn setup<S, R>(&self, instance: Arc<S>, router: &mut R, prefix: &str) -> Result<usize, SetupError>
    where
        S: Implementation,
        R: Router + ?Sized,
    {
        let interface = S::Interface::descriptor();
        let bindings = S::bindings();

        for name in bindings.names() {
            if interface.procedure(name).is_none() {
                tracing::debug!(
                    interface = interface.name(),
                    procedure = name,
                    "not a remote procedure, left local"
                );
            }
        }

        let mut planned = Vec::with_capacity(interface.procedures().len());
        for procedure in interface.procedures() {
            if self.secure_build {
                conformance::check(&interface, procedure, &bindings)?;
            }
            let Some(body) = bindings.get(procedure.name()) else {
                tracing::warn!(
                    interface = interface.name(),
                    procedure = procedure.name(),
                    "procedure has no body, skipping"
                );
                continue;
            };
            let schema = self.schemas.get_or_derive(interface.name(), procedure);
            let path = transport::route(prefix, interface.name(), procedure.name());
            planned.push((path, Dispatcher::new(instance.clone(), schema, body.clone())));
        }

        if let Some((path, _)) = planned.iter().find(|(path, _)| router.contains(path)) {
            return Err(SetupError::DuplicateRoute(path.clone()));
        }

        let installed = planned.len();
        for (path, dispatcher) in planned {
            tracing::debug!(%path, convention = %dispatcher.convention(), "installing handler");
            router.post(path, dispatcher.into_handler())?;
        }
        tracing::info!(interface = interface.name(), prefix, installed, "server handlers installed");
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ProcedureError,
        implementation::Bindings,
        interface,
        transport::{Handler, Reply, RouteTable},
        types::Kwargs,
    };

    interface! {
        struct Clock {
            fn now() -> i64;
            async fn sleep(ms: u64);
        }
    }

    struct GoodClock;

    impl Implementation for GoodClock {
        type Interface = Clock;

        fn bind(bindings: &mut Bindings<Self>) {
            bindings
                .sync("now", |_: &Self, _: Kwargs| Ok(42))
                .asynchronous("sleep", |_: Arc<Self>, _: Kwargs| async { Ok::<_, ProcedureError>(()) })
                .sync("helper", |_: &Self, _: Kwargs| Ok(()));
        }
    }

    struct LazyClock;

    impl Implementation for LazyClock {
        type Interface = Clock;

        fn bind(bindings: &mut Bindings<Self>) {
            bindings.sync("now", |_: &Self, _: Kwargs| Ok(0));
        }
    }

    struct BlockingClock;

    impl Implementation for BlockingClock {
        type Interface = Clock;

        fn bind(bindings: &mut Bindings<Self>) {
            bindings
                .sync("now", |_: &Self, _: Kwargs| Ok(0))
                .sync("sleep", |_: &Self, _: Kwargs| Ok(()));
        }
    }

    fn builder(secure_build: bool) -> ServerBuilder {
        let config = RpcConfig::default().with_secure_build(secure_build);
        ServerBuilder::new(&config, Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn installs_handlers_of_matching_form() {
        let mut routes = RouteTable::new();
        let installed = builder(true)
            .setup(Arc::new(GoodClock), &mut routes, "/api")
            .unwrap();
        assert_eq!(installed, 2);
        assert_eq!(
            routes.paths().collect::<Vec<_>>(),
            vec!["/api/Clock/now", "/api/Clock/sleep"]
        );
        assert!(!routes.contains("/api/Clock/helper"));
    }

    #[test]
    fn unimplemented_procedure_aborts_setup() {
        let mut routes = RouteTable::new();
        let err = builder(true)
            .setup(Arc::new(LazyClock), &mut routes, "")
            .unwrap_err();
        assert!(matches!(err, SetupError::NotImplemented { ref procedure, .. } if procedure == "sleep"));
        assert_eq!(routes.paths().count(), 0);
    }

    #[test]
    fn convention_mismatch_aborts_setup() {
        let mut routes = RouteTable::new();
        let err = builder(true)
            .setup(Arc::new(BlockingClock), &mut routes, "")
            .unwrap_err();
        assert!(matches!(err, SetupError::CallingConventionMismatch { .. }));
        assert_eq!(routes.paths().count(), 0);
    }

    #[test]
    fn taken_path_aborts_setup_before_installing() {
        let mut routes = RouteTable::new();
        routes
            .post(
                "/api/Clock/sleep".to_owned(),
                Handler::Sync(Arc::new(|_: &[u8]| Reply::new(200, Vec::new()))),
            )
            .unwrap();
        let err = builder(true)
            .setup(Arc::new(GoodClock), &mut routes, "/api")
            .unwrap_err();
        assert!(matches!(err, SetupError::DuplicateRoute(ref path) if path == "/api/Clock/sleep"));
        assert_eq!(routes.paths().collect::<Vec<_>>(), vec!["/api/Clock/sleep"]);
    }

    #[tokio::test]
    async fn unchecked_setup_skips_and_trusts() {
        let builder = builder(false);

        let mut routes = RouteTable::new();
        assert_eq!(builder.setup(Arc::new(LazyClock), &mut routes, "/a").unwrap(), 1);
        assert!(routes.contains("/a/Clock/now"));

        let mut routes = RouteTable::new();
        assert_eq!(builder.setup(Arc::new(BlockingClock), &mut routes, "/b").unwrap(), 2);
        let reply = routes.handle("/b/Clock/sleep", br#"{"args":[5]}"#.to_vec()).await;
        assert_eq!(reply.body, br#"{"data":null}"#);
    }

    #[test]
    fn schemas_are_shared_across_setups() {
        let builder = builder(true);
        let mut first = RouteTable::new();
        let mut second = RouteTable::new();
        builder.setup(Arc::new(GoodClock), &mut first, "/one").unwrap();
        builder.setup(Arc::new(GoodClock), &mut second, "/two").unwrap();
        assert_eq!(builder.schemas().derivations(), 2);
        assert!(matches!(
            first.handler("/one/Clock/now"),
            Some(Handler::Sync(_))
        ));
    }
}
