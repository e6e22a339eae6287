//! End-to-end dispatch through `App`.

use cmdtree::{
    App, CommandMark, ConfigField, DispatchError, Handler, HandlerResult, MockEnv, Output, Phase,
    Registry, RunResult, StaticModule, StaticPackage, StaticSource, UsageError, ValueSource,
    EXIT_HANDLER_FAILURE, EXIT_SUCCESS, EXIT_USAGE,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn echo() -> Handler {
    Handler::new(|ctx| -> HandlerResult { Ok(Output::Data(ctx.to_json())) })
}

fn user_source(create: Handler) -> StaticSource {
    StaticSource::new(
        StaticPackage::new().package(
            "user",
            StaticPackage::new().module(
                StaticModule::new("create").command(
                    "create",
                    create,
                    CommandMark::new()
                        .help("Create a user")
                        .field(ConfigField::string("email").required().env("USER_EMAIL"))
                        .field(ConfigField::boolean("dry_run").default(false).env("DRY_RUN")),
                ),
            ),
        ),
    )
}

fn app_with(create: Handler, env: MockEnv) -> App {
    App::builder("app")
        .without_standard_flags()
        .root_field(ConfigField::boolean("verbose").default(false))
        .source(user_source(create))
        .registry(Registry::isolated())
        .env(env)
        .build()
        .unwrap()
}

fn app(env: MockEnv) -> App {
    app_with(echo(), env)
}

#[test]
fn test_user_create_with_email_and_dry_run() {
    let mut app = app(MockEnv::new());
    let result = app
        .dispatch_from(["app", "user", "create", "--email", "a@b.com", "--dry_run"])
        .unwrap();
    assert_eq!(
        result.output(),
        Some(&Output::Data(json!({
            "verbose": false,
            "email": "a@b.com",
            "dry_run": true,
        })))
    );
    assert_eq!(app.phase(), Phase::Completed);

    let mut app = self::app(MockEnv::new());
    assert_eq!(
        app.run(["app", "user", "create", "--email", "a@b.com", "--dry_run"]),
        EXIT_SUCCESS
    );
}

#[test]
fn test_user_create_without_email_is_usage_error() {
    let mut app = app(MockEnv::new());
    let err = app.dispatch_from(["app", "user", "create"]).unwrap_err();
    match err.usage() {
        Some(UsageError::MissingRequiredField { field, command }) => {
            assert_eq!(field, "email");
            assert_eq!(command.to_string(), "user.create");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(err.exit_code(), EXIT_USAGE);
    assert_eq!(app.phase(), Phase::UserError);
    assert_eq!(app.run(["app", "user", "create"]), EXIT_USAGE);
}

#[test]
fn test_environment_fills_missing_values() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let capture = Handler::new(move |ctx| -> HandlerResult {
        *sink.lock().unwrap() = Some(ctx.clone());
        Ok(Output::Silent)
    });
    let mut app = app_with(
        capture,
        MockEnv::new()
            .with_var("USER_EMAIL", "env@b.com")
            .with_var("DRY_RUN", "yes"),
    );
    app.dispatch_from(["app", "user", "create"]).unwrap();

    let ctx = seen.lock().unwrap().clone().unwrap();
    assert_eq!(ctx.get_str("email"), Some("env@b.com"));
    assert_eq!(ctx.source("email"), Some(ValueSource::Environment));
    assert_eq!(ctx.get_bool("dry_run"), Some(true));
    assert_eq!(ctx.source("verbose"), Some(ValueSource::Default));
}

#[test]
fn test_command_line_beats_environment() {
    let mut app = app(MockEnv::new().with_var("USER_EMAIL", "env@b.com"));
    let result = app
        .dispatch_from(["app", "user", "create", "--email", "cli@b.com"])
        .unwrap();
    let data = result.output().cloned();
    assert_eq!(
        data,
        Some(Output::Data(json!({
            "verbose": false,
            "email": "cli@b.com",
            "dry_run": false,
        })))
    );
}

#[test]
fn test_malformed_environment_value() {
    let mut app = app(MockEnv::new().with_var("DRY_RUN", "perhaps"));
    let err = app
        .dispatch_from(["app", "user", "create", "--email", "x"])
        .unwrap_err();
    match err.usage() {
        Some(UsageError::InvalidEnvironmentValue { var, field, .. }) => {
            assert_eq!(var, "DRY_RUN");
            assert_eq!(field, "dry_run");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_hyphenated_spelling_is_accepted() {
    let mut app = app(MockEnv::new());
    let result = app
        .dispatch_from(["app", "user", "create", "--email", "x", "--dry-run"])
        .unwrap();
    let Some(Output::Data(data)) = result.output() else {
        panic!("expected data");
    };
    assert_eq!(data["dry_run"], true);
}

#[test]
fn test_unknown_command_is_parse_error() {
    let mut app = app(MockEnv::new());
    let err = app.dispatch_from(["app", "user", "delete"]).unwrap_err();
    assert!(matches!(err.usage(), Some(UsageError::Parse { .. })));
    let message = app.error_message(&err);
    assert!(message.contains("delete"), "{message}");
}

#[test]
fn test_help_at_every_level_exits_zero() {
    let mut app = app(MockEnv::new());
    for args in [
        vec!["app", "--help"],
        vec!["app", "user", "-h"],
        vec!["app", "user", "create", "--help"],
    ] {
        let result = app.dispatch_from(args.clone()).unwrap();
        assert!(result.is_help(), "{args:?}");
        assert_eq!(app.run(args), EXIT_SUCCESS);
    }
}

#[test]
fn test_handler_error_passes_through() {
    let failing = Handler::new(|_| -> HandlerResult { Err(anyhow::anyhow!("quota exceeded")) });
    let mut app = app_with(failing, MockEnv::new());
    let err = app
        .dispatch_from(["app", "user", "create", "--email", "x"])
        .unwrap_err();
    let DispatchError::Handler { source, .. } = &err else {
        panic!("unexpected: {err}");
    };
    assert_eq!(source.to_string(), "quota exceeded");
    assert_eq!(err.exit_code(), EXIT_HANDLER_FAILURE);
}

#[test]
fn test_narrowed_choice_applies_at_the_leaf() {
    let source = StaticSource::new(
        StaticPackage::new()
            .field(ConfigField::choice("format", ["json", "yaml", "text"]).default("text"))
            .module(StaticModule::new("export").command(
                "export",
                echo(),
                CommandMark::new()
                    .field(ConfigField::choice("format", ["json", "yaml"]).default("json")),
            ))
            .module(StaticModule::new("show").function("main", echo())),
    );
    let mut app = App::builder("app")
        .without_standard_flags()
        .source(source)
        .registry(Registry::isolated())
        .env(MockEnv::new())
        .build()
        .unwrap();

    let export = app.dispatch_from(["app", "export"]).unwrap();
    assert_eq!(
        export.output(),
        Some(&Output::Data(json!({ "format": "json" })))
    );
    assert!(app
        .dispatch_from(["app", "export", "--format", "text"])
        .is_err());

    let show = app
        .dispatch_from(["app", "show", "--format", "text"])
        .unwrap();
    assert!(matches!(show, RunResult::Handled { .. }));
}

#[test]
fn test_positionals_at_the_leaf() {
    let source = StaticSource::new(StaticPackage::new().module(
        StaticModule::new("copy").command(
            "copy",
            echo(),
            CommandMark::new()
                .field(ConfigField::string("target").positional().required())
                .field(ConfigField::list("files").positional())
                .field(ConfigField::integer("retries").default(1)),
        ),
    ));
    let mut app = App::builder("app")
        .without_standard_flags()
        .source(source)
        .registry(Registry::isolated())
        .env(MockEnv::new())
        .build()
        .unwrap();

    let result = app
        .dispatch_from(["app", "copy", "dest", "a.txt", "b.txt", "--retries", "3"])
        .unwrap();
    assert_eq!(
        result.output(),
        Some(&Output::Data(json!({
            "target": "dest",
            "files": ["a.txt", "b.txt"],
            "retries": 3,
        })))
    );
}
