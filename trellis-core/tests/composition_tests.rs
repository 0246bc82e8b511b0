//! Integration tests for nested view invocation, element wrapping,
//! out-of-band merging and response hooks.

use parking_lot::Mutex;
use std::sync::Arc;
use trellis_core::*;
use trellis_testing::{assert_oob, root_attr, root_elements};

fn get(path: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::GET, path)
}

/// A view reporting whether it is the resolved target
fn target_reporter(id: &str) -> Arc<View> {
    Arc::new(
        View::builder(id)
            .build(|cx, _| Ok(Reply::html(format!("{}@{}", cx.is_resolved_target()?, cx.depth()))))
            .unwrap(),
    )
}

#[test]
fn test_resolved_target_direct_and_nested() {
    let child = target_reporter("tests::child");
    assert_eq!(child.handle(get("/")).unwrap().body_str(), "true@1");

    let nested = child.clone();
    let parent = View::builder("tests::parent")
        .build(move |cx, _| {
            let own = cx.is_resolved_target()?;
            let inner = nested.call(cx, Args::new())?;
            Ok(Reply::html(format!("{} {}", own, cx.embed(inner))))
        })
        .unwrap();

    assert_eq!(parent.handle(get("/")).unwrap().body_str(), "true false@2");
}

#[test]
fn test_resolved_target_false_when_router_picked_another_view() {
    let view = target_reporter("tests::child");
    let mut request = get("/");
    request.resolved = Some(HandlerId::new("tests::other"));
    assert_eq!(view.handle(request).unwrap().body_str(), "false@1");
}

#[test]
fn test_not_in_context_outside_views() {
    let cx = RequestContext::new(get("/"));
    assert!(matches!(cx.is_resolved_target(), Err(Error::NotInContext { .. })));
    assert!(matches!(cx.is_post(), Err(Error::NotInContext { .. })));
}

#[test]
fn test_oob_merge_output() {
    let primary = Reply::html(r#"<div id="foo">main</div>"#);
    let merged = merge(primary, vec![Reply::html(r#"<div id="oob">side</div>"#)], "outerHTML").unwrap();
    let body = merged.into_response().body_str();

    assert_eq!(root_elements(&body).len(), 2);
    assert_eq!(root_attr(&body, 0, "id").as_deref(), Some("foo"));
    assert_eq!(root_attr(&body, 0, "hx-swap-oob"), None);
    assert_eq!(root_attr(&body, 1, "id").as_deref(), Some("oob"));
    assert_eq!(root_attr(&body, 1, "hx-swap-oob").as_deref(), Some("outerHTML:#oob"));
}

#[test]
fn test_oob_merge_rejects_malformed_fragments() {
    let err = merge(
        Reply::html(r#"<div id="foo"></div>"#),
        vec![Reply::html(r#"<p id="a"></p><p id="b"></p>"#)],
        "outerHTML",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedFragment {
            rule: FragmentRule::ExactlyOneRoot
        }
    ));

    let err = merge(
        Reply::html(r#"<div id="foo"></div>"#),
        vec![Reply::html("<p>no id</p>")],
        "outerHTML",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedFragment {
            rule: FragmentRule::IdentifiedRoot
        }
    ));
}

#[test]
fn test_malformed_swap_oob_surfaces_to_caller() {
    let view = View::builder("tests::bad")
        .build(|cx, _| {
            cx.swap_oob(Reply::html("text only"))?;
            Ok(Reply::html("<p>unreachable</p>"))
        })
        .unwrap();

    let err = view.handle(get("/")).unwrap_err();
    assert!(matches!(err, Error::MalformedFragment { .. }));
}

#[test]
fn test_hooks_run_once_in_order_after_outermost() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let child_log = log.clone();
    let child = Arc::new(
        View::builder("tests::child")
            .build(move |cx, _| {
                let hook_log = child_log.clone();
                cx.add_response_handler(move |_| {
                    hook_log.lock().push("child hook".into());
                    None
                })?;
                child_log.lock().push("child body".into());
                Ok(Reply::html("<p>child</p>"))
            })
            .unwrap(),
    );

    let parent_log = log.clone();
    let nested = child.clone();
    let parent = View::builder("tests::parent")
        .build(move |cx, _| {
            let hook_log = parent_log.clone();
            cx.add_response_handler(move |_| {
                hook_log.lock().push("parent hook".into());
                None
            })?;
            let first = nested.call(cx, Args::new())?;
            let second = nested.call(cx, Args::new())?;
            parent_log.lock().push("parent body".into());
            Ok(Reply::html(format!("{}{}", cx.embed(first), cx.embed(second))))
        })
        .unwrap();

    parent.handle(get("/")).unwrap();
    assert_eq!(
        *log.lock(),
        vec![
            "child body",
            "child body",
            "parent body",
            "parent hook",
            "child hook",
            "child hook",
        ]
    );
}

#[test]
fn test_hook_can_replace_reply() {
    let view = View::builder("tests::replaced")
        .build(|cx, _| {
            cx.add_response_handler(|_| Some(Reply::html("replaced")))?;
            Ok(Reply::html("original"))
        })
        .unwrap();
    assert_eq!(view.handle(get("/")).unwrap().body_str(), "replaced");
}

#[test]
fn test_replacing_hook_keeps_merged_oob() {
    let view = View::builder("tests::replaced")
        .build(|cx, _| {
            cx.add_response_handler(|_| Some(Reply::html("<p>replaced</p>")))?;
            cx.swap_oob(Reply::html(r#"<span id="queued">q</span>"#))?;
            merge(
                Reply::html("<p>original</p>"),
                vec![Reply::html(r#"<span id="merged">m</span>"#)],
                "outerHTML",
            )
        })
        .unwrap();

    let body = view.handle(get("/")).unwrap().body_str();
    assert_eq!(root_elements(&body).len(), 3);
    assert!(body.starts_with("<p>replaced</p>"));
    assert_oob(&body, 1, "merged", "outerHTML");
    assert_oob(&body, 2, "queued", "outerHTML");
}

#[test]
fn test_wrap_idempotent() {
    let meta = ElementMeta::new("x");
    let once = wrap(Reply::html("body"), &meta);
    assert_eq!(wrap(once.clone(), &meta), once);
}

#[test]
fn test_nested_element_wrapped_once() {
    let child = Arc::new(
        View::builder("tests::row")
            .element()
            .build(|_, _| Ok(Reply::html("cell")))
            .unwrap(),
    );
    let nested = child.clone();
    let parent = View::builder("tests::table")
        .element()
        .build(move |cx, _| {
            let row = nested.call(cx, Args::new())?;
            Ok(Reply::html(cx.embed(row)))
        })
        .unwrap();

    assert_eq!(
        parent.handle(get("/")).unwrap().body_str(),
        concat!(
            r#"<div id="table" hx-target="this" hx-swap="outerHTML">"#,
            r#"<div id="row" hx-target="this" hx-swap="outerHTML">cell</div>"#,
            "</div>"
        )
    );
}

#[test]
fn test_handler_returned_element_overrides_view_element() {
    let view = View::builder("tests::custom")
        .element()
        .build(|_, _| {
            Ok(Reply::element(
                HttpResponse::html("body"),
                &ElementMeta::new("override").hx_swap("innerHTML"),
            ))
        })
        .unwrap();

    let body = view.handle(get("/")).unwrap().body_str();
    assert_eq!(root_attr(&body, 0, "id").as_deref(), Some("override"));
    assert_eq!(root_attr(&body, 0, "hx-swap").as_deref(), Some("innerHTML"));
    assert_eq!(root_elements(&body).len(), 1);
}

#[test]
fn test_child_queues_parent_as_oob() {
    // The child renders itself and asks for the parent element to be
    // refreshed alongside it.
    let parent = Arc::new(
        View::builder("tests::parent")
            .element()
            .build(|_, _| Ok(Reply::html("parent")))
            .unwrap(),
    );

    let refreshed = parent.clone();
    let child = View::builder("tests::child")
        .element()
        .build(move |cx, _| {
            let parent_reply = refreshed.call(cx, Args::new())?;
            cx.swap_oob(parent_reply)?;
            Ok(Reply::html("child"))
        })
        .unwrap();

    let body = child.handle(get("/")).unwrap().body_str();
    assert_eq!(root_elements(&body).len(), 2);
    assert_eq!(root_attr(&body, 0, "id").as_deref(), Some("child"));
    assert_eq!(root_attr(&body, 0, "hx-swap-oob"), None);
    assert_eq!(root_attr(&body, 1, "id").as_deref(), Some("parent"));
    assert_eq!(
        root_attr(&body, 1, "hx-swap-oob").as_deref(),
        Some("outerHTML:#parent")
    );
}

#[test]
fn test_oob_from_nested_merge_flushed_once_at_outermost() {
    let badge = Arc::new(
        View::builder("tests::badge")
            .build(|_, _| {
                merge(
                    Reply::html(r#"<span id="badge">1</span>"#),
                    vec![Reply::html(r#"<span id="count">3</span>"#)],
                    "outerHTML",
                )
            })
            .unwrap(),
    );

    let nested = badge.clone();
    let page = View::builder("tests::page")
        .build(move |cx, _| {
            let inner = nested.call(cx, Args::new())?;
            assert_eq!(inner.pending_oob().len(), 1);
            Ok(Reply::html(format!("<main>{}</main>", cx.embed(inner))))
        })
        .unwrap();

    let body = page.handle(get("/")).unwrap().body_str();
    assert_eq!(
        body,
        r##"<main><span id="badge">1</span></main><span id="count" hx-swap-oob="outerHTML:#count">3</span>"##
    );
}

#[test]
fn test_oob_not_appended_to_json() {
    let view = View::builder("tests::api")
        .build(|cx, _| {
            cx.swap_oob(Reply::html(r#"<p id="x">x</p>"#))?;
            Ok(Reply::raw(HttpResponse::json(&serde_json::json!({"ok": true}))?))
        })
        .unwrap();

    let response = view.handle(get("/")).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(json["ok"], true);
}

#[test]
fn test_body_response_is_not_wrapped() {
    let view = View::builder("tests::redirect")
        .element()
        .build(|_, _| Ok(body_response(HttpResponse::html("<main>page</main>"), "outerHTML")))
        .unwrap();

    let response = view.handle(get("/")).unwrap();
    assert_eq!(response.body_str(), "<main>page</main>");
    assert_eq!(response.header("HX-Retarget"), Some("body"));
    assert_eq!(response.header("HX-Reswap"), Some("outerHTML"));
}

#[test]
fn test_failure_in_nested_view_unwinds_stack() {
    let failing = Arc::new(
        View::builder("tests::failing")
            .signature(Signature::new().param(Param::both("required")))
            .build(|_, _| Ok(Reply::html("")))
            .unwrap(),
    );

    let nested = failing.clone();
    let parent = View::builder("tests::parent")
        .build(move |cx, _| {
            let depth_before = cx.depth();
            let result = nested.call(cx, Args::new());
            assert!(result.is_err());
            Ok(Reply::html(format!("{}={}", depth_before, cx.depth())))
        })
        .unwrap();

    assert_eq!(parent.handle(get("/")).unwrap().body_str(), "1=1");
}
