//! Integration tests for the registration lifecycle.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use serde_json::{Value, json};
use tower::ServiceExt;

use exthost_core::AppError;
use exthost_core::types::extension::ExtensionKind;
use exthost_extensions::emitter::EventKind;
use exthost_extensions::prelude::*;
use exthost_extensions::{EventMeta, StaticModuleLoader};

use helpers::{LogCapture, TestHost, module_path, trusted, untrusted};
use tracing::Level;

fn audit_hook() -> ModuleExports {
    ModuleExports::hook(hook_fn(|hooks, _ctx| {
        Box::pin(async move {
            hooks
                .filter(
                    "items.create",
                    filter_fn(|mut payload, _meta| async move {
                        payload["audited"] = json!(true);
                        Ok(payload)
                    }),
                )
                .await;
            hooks.action("items.create", action_fn(|_meta| async { Ok(()) })).await;
            hooks.init("app.before", init_fn(|_meta| async { Ok(()) })).await;
            hooks
                .schedule("*/5 * * * *", schedule_fn(|| async { Ok(()) }))
                .await;
            Ok(())
        })
    }))
}

fn action_register(event: &'static str) -> Arc<dyn HookRegister> {
    hook_fn(move |hooks, _ctx| {
        Box::pin(async move {
            hooks.action(event, action_fn(|_meta| async { Ok(()) })).await;
            Ok(())
        })
    })
}

fn action_hook(event: &'static str) -> ModuleExports {
    ModuleExports::hook(action_register(event))
}

fn assert_send<T: Send>(_: &T) {}

fn failing_hook() -> ModuleExports {
    ModuleExports::hook(hook_fn(|_hooks, _ctx| {
        Box::pin(async { Err(AppError::internal("register exploded")) })
    }))
}

fn text_endpoint(body: &'static str) -> Arc<dyn EndpointHandler> {
    endpoint_fn(move |router, _ctx| {
        router.route("/", get(move || async move { body }));
        Ok(())
    })
}

fn echo_operation(id: &str) -> OperationConfig {
    OperationConfig::new(id, operation_fn(|options, _ctx| async move { Ok(options) }))
}

async fn get_text(host: &TestHost, path: &str) -> (StatusCode, String) {
    let router = host.router.route_for(path).await.expect("no mount for path");
    let response = router
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_teardown_restores_pre_registration_state() {
    let loader = StaticModuleLoader::new()
        .with_module(module_path("audit"), || Ok(audit_hook()))
        .with_module(module_path("reports"), || {
            Ok(ModuleExports::endpoint(EndpointConfig::Handler(text_endpoint("reports"))))
        })
        .with_module(module_path("echo"), || Ok(ModuleExports::operation(echo_operation("echo"))))
        .with_module(module_path("kit"), || {
            Ok(ModuleExports::bundle(
                BundleConfig::new()
                    .hook("kit-hook", action_register("kit.event"))
                    .endpoint("kit-api", EndpointConfig::Handler(text_endpoint("kit"))),
            ))
        });

    let mut host = TestHost::new(
        vec![
            trusted("audit", ExtensionKind::Hook),
            trusted("reports", ExtensionKind::Endpoint),
            trusted("echo", ExtensionKind::Operation),
            trusted("kit", ExtensionKind::Bundle),
        ],
        loader,
    );

    let summaries = host.manager.register_api_extensions().await;
    assert!(summaries.iter().all(|s| s.failed == 0));

    assert_eq!(host.emitter.total_listeners().await, 4);
    assert_eq!(host.scheduler.active(), vec!["audit:0"]);
    assert_eq!(host.router.len().await, 2);
    assert!(host.flows.has_operation("echo").await);
    assert_eq!(host.loader.cached().await, 4);

    let counts = host.manager.ledger().counts();
    assert_eq!(counts.filters, 1);
    assert_eq!(counts.actions, 2);
    assert_eq!(counts.inits, 1);
    assert_eq!(counts.schedules, 1);
    assert_eq!(counts.modules, 4);

    host.manager.unregister_api_extensions().await;

    assert_eq!(host.emitter.total_listeners().await, 0);
    assert!(host.scheduler.active().is_empty());
    assert!(host.router.is_empty().await);
    assert!(host.flows.operation_ids().await.is_empty());
    assert_eq!(host.loader.cached().await, 0);
    assert!(host.manager.ledger().is_empty());
}

#[tokio::test]
async fn test_filter_subscription_transforms_payload() {
    let loader = StaticModuleLoader::new().with_module(module_path("audit"), || Ok(audit_hook()));
    let mut host = TestHost::new(vec![trusted("audit", ExtensionKind::Hook)], loader);

    host.manager.register_hooks().await;

    let out = host
        .emitter
        .emit_filter("items.create", json!({"title": "x"}), &EventMeta::new("items.create"))
        .await
        .unwrap();
    assert_eq!(out, json!({"title": "x", "audited": true}));
}

#[tokio::test]
async fn test_invalid_cron_creates_no_job() {
    let loader = StaticModuleLoader::new().with_module(module_path("cron"), || {
        Ok(ModuleExports::hook(hook_fn(|hooks, _ctx| {
            Box::pin(async move {
                hooks.schedule("not a cron", schedule_fn(|| async { Ok(()) })).await;
                hooks.schedule("0 * * * *", schedule_fn(|| async { Ok(()) })).await;
                hooks.schedule("every tuesday", schedule_fn(|| async { Ok(()) })).await;
                hooks.schedule("0 0 * * * *", schedule_fn(|| async { Ok(()) })).await;
                Ok(())
            })
        })))
    });
    let mut host = TestHost::new(vec![trusted("cron", ExtensionKind::Hook)], loader);

    let logs = LogCapture::start();
    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.failed, 0);
    assert_eq!(logs.at(Level::WARN).len(), 2);
    assert_eq!(logs.count(Level::WARN, "provided cron is invalid"), 2);
    assert_eq!(host.scheduler.active(), vec!["cron:0", "cron:1"]);
    assert_eq!(host.manager.ledger().counts().schedules, 2);
}

#[tokio::test]
async fn test_scheduled_handler_errors_are_contained() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let loader = StaticModuleLoader::new().with_module(module_path("flaky"), move || {
        let counter = Arc::clone(&counter);
        Ok(ModuleExports::hook(hook_fn(move |hooks, _ctx| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                hooks
                    .schedule(
                        "* * * * *",
                        schedule_fn(move || {
                            let counter = Arc::clone(&counter);
                            async move {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Err(AppError::internal("tick failed"))
                            }
                        }),
                    )
                    .await;
                Ok(())
            })
        })))
    });
    let mut host = TestHost::new(vec![trusted("flaky", ExtensionKind::Hook)], loader);
    host.manager.register_hooks().await;

    assert!(host.scheduler.fire("flaky:0").await);
    assert!(host.scheduler.fire("flaky:0").await);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    host.manager.set_schedule_enabled(false);
    assert!(host.scheduler.fire("flaky:0").await);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_blank_embeds_are_ignored() {
    let loader = StaticModuleLoader::new().with_module(module_path("branding"), || {
        Ok(ModuleExports::hook(hook_fn(|hooks, _ctx| {
            Box::pin(async move {
                hooks.embed(EmbedPosition::Head, "".into()).await;
                hooks
                    .embed(EmbedPosition::Head, EmbedContent::lazy(|| "   ".to_string()))
                    .await;
                hooks.embed(EmbedPosition::Head, "x".into()).await;
                hooks
                    .embed(EmbedPosition::Body, EmbedContent::lazy(|| "<script></script>".to_string()))
                    .await;
                Ok(())
            })
        })))
    });
    let mut host = TestHost::new(vec![trusted("branding", ExtensionKind::Hook)], loader);

    host.manager.register_hooks().await;

    let embeds = host.embeds.snapshot().await;
    assert_eq!(embeds.head, vec!["x"]);
    assert_eq!(embeds.body, vec!["<script></script>"]);
    assert!(host.manager.ledger().counts().filters == 0);

    host.manager.unregister_api_extensions().await;
    assert_eq!(host.embeds.snapshot().await.head, vec!["x"]);
}

#[tokio::test]
async fn test_one_failing_hook_does_not_stop_others() {
    let loader = StaticModuleLoader::new()
        .with_module(module_path("first"), || Ok(action_hook("first.event")))
        .with_module(module_path("broken"), || Ok(failing_hook()))
        .with_module(module_path("third"), || Ok(action_hook("third.event")));
    let mut host = TestHost::new(
        vec![
            trusted("first", ExtensionKind::Hook),
            trusted("broken", ExtensionKind::Hook),
            trusted("third", ExtensionKind::Hook),
        ],
        loader,
    );

    let logs = LogCapture::start();
    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.failed, 1);
    let warnings = logs.at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].fields["extension"], "broken");
    assert_eq!(host.emitter.listener_count(EventKind::Action, "first.event").await, 1);
    assert_eq!(host.emitter.listener_count(EventKind::Action, "third.event").await, 1);
}

#[tokio::test]
async fn test_panicking_hook_does_not_stop_others() {
    let loader = StaticModuleLoader::new()
        .with_module(module_path("boom"), || {
            Ok(ModuleExports::hook(hook_fn(|_hooks, _ctx| panic!("register blew up"))))
        })
        .with_module(module_path("third"), || Ok(action_hook("third.event")));
    let mut host = TestHost::new(
        vec![trusted("boom", ExtensionKind::Hook), trusted("third", ExtensionKind::Hook)],
        loader,
    );

    let logs = LogCapture::start();
    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(logs.count(Level::WARN, "Couldn't register hook"), 1);
    assert_eq!(host.emitter.listener_count(EventKind::Action, "third.event").await, 1);
}

#[tokio::test]
async fn test_lifecycle_futures_are_send() {
    let loader = StaticModuleLoader::new().with_module(module_path("audit"), || Ok(audit_hook()));
    let mut host = TestHost::new(vec![trusted("audit", ExtensionKind::Hook)], loader);

    let registered = host.manager.register_api_extensions();
    assert_send(&registered);
    registered.await;

    let reloaded = host.manager.reload();
    assert_send(&reloaded);
    reloaded.await;

    let unregistered = host.manager.unregister_api_extensions();
    assert_send(&unregistered);
    unregistered.await;
    assert_eq!(host.emitter.total_listeners().await, 0);
}

#[tokio::test]
async fn test_missing_module_is_a_load_failure() {
    let mut host = TestHost::new(vec![trusted("ghost", ExtensionKind::Hook)], StaticModuleLoader::new());

    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.failed, 1);
    assert!(host.manager.ledger().is_empty());
}

#[tokio::test]
async fn test_kind_mismatch_is_a_load_failure() {
    let loader = StaticModuleLoader::new()
        .with_module(module_path("confused"), || Ok(ModuleExports::operation(echo_operation("x"))));
    let mut host = TestHost::new(vec![trusted("confused", ExtensionKind::Hook)], loader);

    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(host.manager.ledger().counts().modules, 1);
}

#[tokio::test]
async fn test_named_default_export_is_used() {
    let loader = StaticModuleLoader::new().with_module(module_path("named"), || {
        Ok(ModuleExports::default().named("default", ExtensionModule::Operation(echo_operation("named-op"))))
    });
    let mut host = TestHost::new(vec![trusted("named", ExtensionKind::Operation)], loader);

    let summary = host.manager.register_operations().await;

    assert_eq!(summary.loaded, 1);
    assert!(host.flows.has_operation("named-op").await);
}

#[tokio::test]
async fn test_untrusted_extensions_go_to_the_sandbox() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let loader = StaticModuleLoader::new().with_module(module_path("guarded"), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(action_hook("guarded.event"))
    });
    let mut host = TestHost::new(
        vec![
            untrusted("guarded", ExtensionKind::Hook),
            trusted("other", ExtensionKind::Hook),
        ],
        loader,
    );

    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.sandboxed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(created.load(Ordering::SeqCst), 0);
    let started = host.sandbox.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].0, "guarded");
    assert_eq!(started[0].1, std::path::PathBuf::from("/ext/guarded/index.js"));
}

#[tokio::test]
async fn test_endpoint_mounts_under_id_or_name() {
    let loader = StaticModuleLoader::new()
        .with_module(module_path("reports"), || {
            Ok(ModuleExports::endpoint(EndpointConfig::Handler(text_endpoint("by-name"))))
        })
        .with_module(module_path("custom"), || {
            Ok(ModuleExports::endpoint(EndpointConfig::WithId {
                id: "stats".into(),
                handler: text_endpoint("by-id"),
            }))
        });
    let mut host = TestHost::new(
        vec![
            trusted("reports", ExtensionKind::Endpoint),
            trusted("custom", ExtensionKind::Endpoint),
        ],
        loader,
    );

    host.manager.register_endpoints().await;

    assert_eq!(get_text(&host, "/reports").await, (StatusCode::OK, "by-name".into()));
    assert_eq!(get_text(&host, "/stats").await, (StatusCode::OK, "by-id".into()));
    assert!(host.router.route_for("/custom").await.is_none());
}

#[tokio::test]
async fn test_invalid_endpoint_id_mounts_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let loader = StaticModuleLoader::new().with_module(module_path("bad"), move || {
        let counter = Arc::clone(&counter);
        Ok(ModuleExports::endpoint(EndpointConfig::WithId {
            id: "{id}".into(),
            handler: endpoint_fn(move |_router, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        }))
    });
    let mut host = TestHost::new(vec![trusted("bad", ExtensionKind::Endpoint)], loader);

    let summary = host.manager.register_endpoints().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(host.router.is_empty().await);
}

#[tokio::test]
async fn test_bundle_fans_out_to_all_registrars() {
    let hook_runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hook_runs);
    let loader = StaticModuleLoader::new().with_module(module_path("kit"), move || {
        let counter = Arc::clone(&counter);
        Ok(ModuleExports::bundle(
            BundleConfig::new()
                .hook(
                    "h",
                    hook_fn(move |_hooks, _ctx| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Box::pin(async { Ok(()) })
                    }),
                )
                .endpoint("e", EndpointConfig::Handler(text_endpoint("bundled")))
                .operation("O", echo_operation("bundle-op")),
        ))
    });
    let mut host = TestHost::new(vec![trusted("kit", ExtensionKind::Bundle)], loader);

    let summary = host.manager.register_bundles().await;

    assert_eq!(summary.loaded, 1);
    assert_eq!(hook_runs.load(Ordering::SeqCst), 1);
    assert_eq!(get_text(&host, "/e").await, (StatusCode::OK, "bundled".into()));
    let out = host
        .flows
        .run_operation("bundle-op", json!({"v": 1}), Value::Null)
        .await
        .unwrap();
    assert_eq!(out, json!({"v": 1}));
}

#[tokio::test]
async fn test_reload_reinstantiates_modules() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let loader = StaticModuleLoader::new().with_module(module_path("audit"), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(audit_hook())
    });
    let mut host = TestHost::new(vec![trusted("audit", ExtensionKind::Hook)], loader);

    host.manager.register_api_extensions().await;
    assert_eq!(created.load(Ordering::SeqCst), 1);

    host.manager.reload().await;
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(host.emitter.total_listeners().await, 3);
    assert_eq!(host.scheduler.active(), vec!["audit:0"]);
}

#[tokio::test]
async fn test_builtin_operations_registered_without_extensions() {
    let mut host = TestHost::new(Vec::new(), StaticModuleLoader::new());

    let summary = host.manager.register_operations().await;

    assert_eq!(summary.loaded, 0);
    for id in ["log", "sleep", "transform", "throw-error"] {
        assert!(host.flows.has_operation(id).await, "missing built-in {id}");
    }
}

#[tokio::test]
async fn test_disabled_extensions_are_skipped() {
    let loader = StaticModuleLoader::new().with_module(module_path("off"), || Ok(action_hook("off.event")));
    let mut host = TestHost::new(
        vec![trusted("off", ExtensionKind::Hook).disabled()],
        loader,
    );

    let summary = host.manager.register_hooks().await;

    assert_eq!(summary.loaded + summary.failed + summary.sandboxed, 0);
    assert_eq!(host.emitter.total_listeners().await, 0);
}
