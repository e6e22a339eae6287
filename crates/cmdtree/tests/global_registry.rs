//! The process-wide registry. These tests share state, so they run serially.

use cmdtree::{
    App, CommandIdentity, Handler, HandlerResult, MockEnv, Output, Registry, RegistryError,
    ScanError, StaticModule, StaticPackage, StaticSource,
};
use serial_test::serial;

fn source() -> StaticSource {
    StaticSource::new(StaticPackage::new().module(
        StaticModule::new("ping").function(
            "main",
            Handler::new(|_| -> HandlerResult { Ok(Output::Text("pong".into())) }),
        ),
    ))
}

fn app() -> App {
    App::builder("app")
        .source(source())
        .env(MockEnv::new())
        .build()
        .unwrap()
}

#[test]
#[serial]
fn test_default_registry_is_the_global_one() {
    assert!(Registry::default().same_store(&Registry::global()));
    assert!(Registry::global().same_store(&Registry::global()));
    assert!(!Registry::isolated().same_store(&Registry::global()));
    assert!(!Registry::isolated().same_store(&Registry::isolated()));
}

#[test]
#[serial]
fn test_global_registry_is_scanned_once() {
    let mut first = app();
    assert!(first.registry().same_store(&Registry::global()));
    first.scan().unwrap();

    let ping = CommandIdentity::parse("ping");
    let entry = Registry::global().lookup(&ping).unwrap();
    assert_eq!(entry.identity, ping);
    assert!(Registry::global().is_sealed());

    let result = first.dispatch_from(["app", "ping"]).unwrap();
    assert_eq!(result.render().as_deref(), Some("pong"));

    let mut second = app();
    let err = second.scan().unwrap_err();
    assert!(
        matches!(err, ScanError::Registry(RegistryError::AlreadyScanned)),
        "{err}"
    );
    assert_eq!(Registry::global().len(), 1);
}
