//! End-to-end workflows through the router: a small contacts page built
//! from composed views.

use std::sync::Arc;
use trellis::prelude::*;
use trellis::{HandlerFn, ModelRef, RouteOptions};
use trellis_testing::*;

#[derive(Debug)]
struct Contact {
    name: String,
    starred: bool,
}

fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(
        "contact",
        1,
        Contact {
            name: "Ada".into(),
            starred: true,
        },
    );
    store.insert(
        "contact",
        2,
        Contact {
            name: "Grace".into(),
            starred: false,
        },
    );
    store
}

fn star_view(settings: &Settings) -> View {
    View::builder("contacts::views::star")
        .signature(Signature::new().param(Param::both("contact").typed(TypeTag::model("contact"))))
        .element()
        .settings(settings)
        .build(|_, args| {
            let contact = args.model::<Contact>("contact")?;
            let label = if contact.starred { "starred" } else { "not starred" };
            Ok(Reply::html(label))
        })
        .unwrap()
}

fn detail_view(settings: &Settings, star: Arc<View>) -> View {
    View::builder("contacts::views::detail")
        .signature(
            Signature::new()
                .path("tab", TypeTag::Str)
                .param(Param::query("contact").typed(TypeTag::model("contact"))),
        )
        .element()
        .settings(settings)
        .build(move |cx, args| {
            let tab = args.get::<String>("tab")?;
            let contact = args.get::<ModelRef>("contact")?;
            let name = args.model::<Contact>("contact")?.name.clone();
            let badge = star.call(cx, Args::new().with("contact", contact))?;
            Ok(Reply::html(format!("{} {} {}", name, tab, cx.embed(badge))))
        })
        .unwrap()
}

fn router(settings: Settings, store: &MemoryStore) -> Router {
    let settings = Arc::new(settings);
    let star = Arc::new(star_view(&settings));
    let mut router = Router::new()
        .with_settings(settings.clone())
        .with_data_access(store.clone().into_data_access());
    router.add(detail_view(&settings, star.clone())).unwrap();
    router.add((*star).clone()).unwrap();
    router
}

#[test]
fn test_detail_page_composes_nested_view() {
    let store = store();
    let router = router(Settings::default(), &store);
    let response = router
        .handle(RequestFactory::new().get("/detail/notes/").query("contact", "1").build())
        .unwrap();

    assert_status(&response, 200);
    assert_eq!(
        response.body_str(),
        concat!(
            r#"<div id="detail" hx-target="this" hx-swap="outerHTML">Ada notes "#,
            r#"<div id="star" hx-target="this" hx-swap="outerHTML">starred</div></div>"#
        )
    );
    // The nested view received the resolved object and did not fetch again
    assert_eq!(store.lookup_count(), 1);
}

#[test]
fn test_model_resolved_from_request() {
    let settings = Settings::default();
    let star = star_view(&settings);
    let store = store();
    let cx = RequestFactory::new()
        .get("/")
        .query("contact", "2")
        .context()
        .with_data_access(store.clone().into_data_access());

    let response = star.handle_in(cx, Args::new()).unwrap();
    assert_body_contains(&response, "not starred");
    assert_eq!(store.lookups(), vec![("contact".to_string(), "2".to_string())]);
}

#[test]
fn test_missing_model_is_not_found() {
    let router = router(Settings::default(), &store());
    let err = router
        .handle(RequestFactory::new().get("/star/").query("contact", "99").build())
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn test_unknown_paths() {
    let router = router(Settings::default(), &store());
    for path in ["/detail/", "/star/extra/", "/nowhere/"] {
        let err = router.handle(RequestFactory::new().get(path).build()).unwrap_err();
        assert!(matches!(err, Error::RouteNotFound(_)), "{}", path);
    }
}

#[test]
fn test_reverse_routes() {
    let router = router(Settings::default(), &store());
    assert_eq!(
        router.reverse("contacts-views-detail", &[("tab", "notes")]).unwrap(),
        "/detail/notes/"
    );
    let star = star_view(&Settings::default());
    assert_eq!(router.reverse_view(&star, &[]).unwrap(), "/star/");
    assert!(router.reverse("contacts-views-detail", &[]).is_err());
}

#[test]
fn test_settings_change_element_container() {
    let settings = Settings::from_toml_str(
        r#"
        oob_swap = "innerHTML"

        [element]
        tag = "section"
        hx_swap = "innerHTML"
        "#,
    )
    .unwrap();
    let router = router(settings, &store());

    let response = router
        .handle(RequestFactory::new().get("/star/").query("contact", "1").build())
        .unwrap();
    let body = response.body_str();
    assert!(body.starts_with(r#"<section id="star" hx-target="this" hx-swap="innerHTML">"#));
    assert!(body.ends_with("</section>"));
}

#[test]
fn test_configured_oob_swap_mode() {
    let settings = Settings::from_toml_str(r#"oob_swap = "innerHTML""#).unwrap();
    let view = View::builder("contacts::views::save")
        .build(|cx, _| {
            cx.swap_oob(Reply::html(r#"<span id="count">3</span>"#))?;
            Ok(Reply::html("<p>saved</p>"))
        })
        .unwrap();

    let cx = RequestFactory::with_settings(settings).post("/").context();
    let response = view.handle_in(cx, Args::new()).unwrap();
    let body = response.body_str();
    assert_eq!(root_ids(&body), vec![None, Some("count".to_string())]);
    assert_oob(&body, 1, "count", "innerHTML");
}

#[test]
fn test_actions_dispatch_on_submitted_name() {
    let recorder = CallRecorder::new();
    let seen = recorder.clone();
    let view = View::builder("contacts::views::bulk")
        .build(move |cx, _| {
            let mut actions = Actions::new(cx)?;
            let on_delete = seen.clone();
            let on_archive = seen.clone();
            actions
                .add("delete", move |value| {
                    on_delete.record(format!("delete {}", value));
                    Some("deleted")
                })
                .add("archive", move |value| {
                    on_archive.record(format!("archive {}", value));
                    Some("archived")
                });
            let label = if actions.matched() {
                actions.take_value().unwrap_or_default()
            } else {
                "idle"
            };
            Ok(Reply::html(label))
        })
        .unwrap();

    let response = view
        .handle(RequestFactory::new().post("/").form("archive", "7").build())
        .unwrap();
    assert_eq!(response.body_str(), "archived");

    // Query parameters are ignored for a POST
    let response = view
        .handle(RequestFactory::new().post("/").query("delete", "1").build())
        .unwrap();
    assert_eq!(response.body_str(), "idle");

    let response = view
        .handle(RequestFactory::new().get("/").query("delete", "3").build())
        .unwrap();
    assert_eq!(response.body_str(), "deleted");

    assert_eq!(recorder.calls(), vec!["archive 7", "delete 3"]);
}

#[test]
fn test_actions_only_for_resolved_target() {
    let inner = Arc::new(
        View::builder("contacts::views::inner")
            .build(|cx, _| {
                let mut actions = Actions::new(cx)?;
                actions.add("go", |_| Some(()));
                Ok(Reply::html(if actions.matched() { "ran" } else { "skipped" }))
            })
            .unwrap(),
    );
    let nested = inner.clone();
    let outer = View::builder("contacts::views::outer")
        .build(move |cx, _| {
            let reply = nested.call(cx, Args::new())?;
            Ok(Reply::html(cx.embed(reply)))
        })
        .unwrap();

    let request = RequestFactory::new().get("/").query("go", "1");
    assert_eq!(inner.handle(request.clone().build()).unwrap().body_str(), "ran");
    assert_eq!(outer.handle(request.build()).unwrap().body_str(), "skipped");
}

#[test]
fn test_body_response_from_routed_view() {
    let mut router = Router::new();
    router
        .add_with(
            View::builder("contacts::views::logout")
                .element()
                .build(|_, _| Ok(body_response(HttpResponse::html("<main>bye</main>"), "innerHTML")))
                .unwrap(),
            RouteOptions {
                url: Some("logout/".into()),
                exclude_module_name: true,
                ..RouteOptions::default()
            },
        )
        .unwrap();

    let response = router.handle(RequestFactory::new().post("/logout/").build()).unwrap();
    assert_eq!(response.body_str(), "<main>bye</main>");
    assert_header(&response, "HX-Retarget", "body");
    assert_header(&response, "HX-Reswap", "innerHTML");
    assert_eq!(router.reverse("logout", &[]).unwrap(), "/logout/");
}

#[test]
fn test_decorated_view_sees_bound_arguments() {
    let recorder = CallRecorder::new();
    let log = recorder.clone();
    let view = View::builder("contacts::views::audited")
        .signature(Signature::new().param(Param::query("q").default("")))
        .decorate(move |inner| {
            let log = log.clone();
            Arc::new(move |cx: &mut RequestContext, args: Args| {
                log.record("before");
                let reply = inner(cx, args);
                log.record("after");
                reply
            }) as HandlerFn
        })
        .build(|_, args| Ok(Reply::html(args.get::<String>("q")?)))
        .unwrap();

    let response = view
        .handle(RequestFactory::new().get("/").query("q", "ada").build())
        .unwrap();
    assert_eq!(response.body_str(), "ada");
    assert_eq!(recorder.calls(), vec!["before", "after"]);
}
