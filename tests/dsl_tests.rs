mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use regex::Regex;
use scenario_dsl::dom::DomEvent;
use scenario_dsl::prelude::*;
use serde_json::{json, Value};

const REPEATER_HTML: &str = r#"<ul>
  <li><span ng:bind="name" class="ng-binding">misko</span>
      <span ng:bind="test &amp;&amp; gender" class="ng-binding">male</span></li>
  <li><span ng:bind="name" class="ng-binding">felisa</span>
      <span ng:bind="gender | uppercase" class="ng-binding">female</span></li>
</ul>"#;

fn values(app: &MemoryApplication, selector: &str) -> Vec<String> {
    let doc = app.document();
    let doc = doc.read();
    doc.query(doc.root(), selector)
        .unwrap()
        .into_iter()
        .map(|node| doc.value(node))
        .collect()
}

fn prop(app: &MemoryApplication, selector: &str, name: &str) -> Value {
    let doc = app.document();
    let doc = doc.read();
    let node = doc.query(doc.root(), selector).unwrap()[0];
    doc.prop(node, name)
}

async fn run(dsl: &Dsl) -> RunSummary {
    dsl.context().run().await.expect("run raised an action error")
}

// ============================================================================
// Pause and sleep
// ============================================================================

#[tokio::test]
async fn test_pause_waits_for_resume() {
    let (dsl, _, _) = dsl_with("");
    dsl.pause();

    let ctx = dsl.context().clone();
    let running = tokio::spawn(async move { ctx.run().await });

    while !dsl.context().is_paused() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(dsl.context().future_log().is_empty());
    assert!(dsl
        .context()
        .events()
        .iter()
        .any(|e| e.name() == "InteractivePause"));

    assert!(dsl.context().resume());
    let summary = running.await.unwrap().unwrap();
    assert!(summary.success);
    assert_eq!(dsl.context().future_log(), vec!["pausing for you to resume"]);
    assert!(!dsl.context().resume());
}

#[tokio::test]
async fn test_sleep_uses_the_timer() {
    let (dsl, _, clock) = dsl_with("");
    dsl.sleep(10.0);
    run(&dsl).await;

    assert_eq!(clock.last_delay().await, Some(Duration::from_secs(10)));
    assert_eq!(dsl.context().future_result(), Some(json!(10000)));
}

// ============================================================================
// Expect
// ============================================================================

#[tokio::test]
async fn test_expect_passing_and_failing() {
    let (dsl, _, _) = dsl_with("");
    let future = FutureHandle::resolved("future", 10);

    dsl.expect(&future).to_equal(10);
    run(&dsl).await;
    assert_eq!(dsl.context().future_error(), None);
    assert_eq!(dsl.context().future_result(), Some(Value::Null));

    dsl.expect(&future).to_equal(20);
    let summary = run(&dsl).await;
    assert!(!summary.success);
    assert!(dsl.context().future_error().is_some());
}

#[tokio::test]
async fn test_expect_on_queued_future() {
    let (dsl, _, _) = dsl_with(r#"<p id="greeting">hello world</p>"#);
    let text = dsl.element("#greeting").text();
    let matched = dsl.expect(&text).to_match("^hello");
    let negated = dsl.expect(&text).not().to_contain("bye");

    let summary = run(&dsl).await;
    assert!(summary.success);
    assert_eq!(matched.status(), FutureStatus::Resolved);
    assert_eq!(negated.status(), FutureStatus::Resolved);
}

// ============================================================================
// Browser
// ============================================================================

#[tokio::test]
async fn test_browser_reload() {
    let (dsl, app, _) = app_dsl(MemoryApplication::from_html("").with_location("http://server/#foo"));
    dsl.browser().reload();
    run(&dsl).await;

    assert_eq!(
        dsl.context().future_result(),
        Some(json!("http://server/#foo"))
    );
    assert_eq!(app.history(), vec!["http://server/#foo"]);
}

#[tokio::test]
async fn test_browser_navigate_to() {
    let (dsl, app, _) = dsl_with("");
    let nav = dsl.browser().navigate_to("http://myurl");
    run(&dsl).await;

    assert_eq!(nav.name(), "browser navigate to 'http://myurl'");
    assert_eq!(dsl.context().future_result(), Some(json!("http://myurl")));
    assert_eq!(app.location().href(), "http://myurl");
}

#[tokio::test]
async fn test_browser_navigate_to_computed_url() {
    let (dsl, _, _) = dsl_with("");
    let nav = dsl
        .browser()
        .navigate_to_with("http://myurl", |_| "http://futureUrl/".to_string());
    run(&dsl).await;

    assert_eq!(nav.name(), "browser navigate to 'http://myurl'");
    assert_eq!(dsl.context().future_result(), Some(json!("http://futureUrl/")));
}

#[tokio::test]
async fn test_browser_navigate_without_hook() {
    let (dsl, _, _) = dsl_with("");
    dsl.browser().navigate_to("http://other/");
    let summary = run(&dsl).await;
    assert!(summary.success);
}

#[tokio::test]
async fn test_browser_window_accessors() {
    let (dsl, _, _) = app_dsl(
        MemoryApplication::from_html("").with_location("http://server/app/index.html?a=b#hhh"),
    );
    let window = dsl.browser().window();
    let href = window.href();
    let path = window.path();
    let search = window.search();
    let hash = window.hash();
    run(&dsl).await;

    assert_eq!(href.value(), Some(&json!("http://server/app/index.html?a=b#hhh")));
    assert_eq!(path.value(), Some(&json!("/app/index.html")));
    assert_eq!(search.value(), Some(&json!("?a=b")));
    assert_eq!(hash.value(), Some(&json!("hhh")));
}

#[tokio::test]
async fn test_browser_app_location() {
    let hook = MemoryHook::new().with_location_service(Arc::new(
        StaticLocationService::from_href("http://server/path?search=a#hhh"),
    ));
    let (dsl, _, _) = app_dsl(MemoryApplication::from_html("").with_hook(Arc::new(hook)));
    let location = dsl.browser().location();
    let url = location.url();
    let path = location.path();
    let hash = location.hash();
    run(&dsl).await;

    assert_eq!(url.name(), "$location.url()");
    assert_eq!(url.value(), Some(&json!("http://server/path?search=a#hhh")));
    assert_eq!(path.value(), Some(&json!("/path")));
    assert_eq!(hash.value(), Some(&json!("hhh")));
}

// ============================================================================
// Select
// ============================================================================

#[tokio::test]
async fn test_select_option_by_value() {
    let (dsl, app, _) = dsl_with(
        r#"<select ng:model="test"><option value=A>one</option><option value=B selected>two</option></select>"#,
    );
    dsl.select("test").option("A");
    run(&dsl).await;
    assert_eq!(values(&app, "select"), vec!["A"]);
}

#[tokio::test]
async fn test_select_option_by_name() {
    let (dsl, app, _) = dsl_with(
        r#"<select ng:model="test"><option value=A>one</option><option value=B selected>two</option></select>"#,
    );
    dsl.select("test").option("one");
    run(&dsl).await;
    assert_eq!(values(&app, "select"), vec!["A"]);
}

#[tokio::test]
async fn test_select_multiple_options() {
    let (dsl, _, _) = dsl_with(
        r#"<select ng:model="test" multiple>
             <option>A</option><option selected>B</option><option>C</option>
           </select>"#,
    );
    dsl.select("test").options(&["A", "B"]);
    let selected = dsl.element("select").val();
    run(&dsl).await;
    assert_eq!(selected.value(), Some(&json!(["A", "B"])));
}

#[tokio::test]
async fn test_select_options_on_single_select_fails() {
    let (dsl, _, _) = dsl_with(r#"<select ng:model="test"><option>A</option></select>"#);
    let options = dsl.select("test").options(&["A", "B"]);
    run(&dsl).await;
    assert!(options.error().unwrap().contains("did not match"));
}

// ============================================================================
// Element
// ============================================================================

#[tokio::test]
async fn test_element_click_runs_listeners() {
    let clicked = Arc::new(AtomicBool::new(false));
    let mut doc = MemoryDocument::parse(r#"<a class="link">link</a>"#);
    let link = doc.select_first("a").unwrap().unwrap();
    let flag = clicked.clone();
    doc.add_listener(link, "click", move |_| flag.store(true, Ordering::SeqCst));

    let (dsl, _, _) = app_dsl(MemoryApplication::new(doc));
    dsl.element("a").click();
    let summary = run(&dsl).await;

    assert!(summary.success);
    assert!(clicked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_element_click_follows_anchor() {
    let (dsl, app, _) = dsl_with(r##"<a href="#foo">link</a>"##);
    dsl.element("a").click();
    run(&dsl).await;
    assert!(app.location().href().ends_with("#foo"));
}

#[tokio::test]
async fn test_element_click_respects_prevent_default() {
    let mut doc = MemoryDocument::parse(r##"<a href="#foo">link</a>"##);
    let link = doc.select_first("a").unwrap().unwrap();
    doc.add_listener(link, "click", |event: &mut DomEvent| event.prevent_default());

    let (dsl, app, _) = app_dsl(MemoryApplication::new(doc).with_location("http://server/"));
    dsl.element("a").click();
    run(&dsl).await;
    assert_eq!(app.location().href(), "http://server/");
    assert!(app.history().is_empty());
}

#[tokio::test]
async fn test_element_count() {
    let (dsl, _, _) = dsl_with(r#"<p>one</p><p>two</p>"#);
    let found = dsl.element("p").count();
    let missing = dsl.element("div").count();
    run(&dsl).await;
    assert_eq!(found.value(), Some(&json!(2)));
    assert_eq!(missing.value(), Some(&json!(0)));
}

#[tokio::test]
async fn test_element_attr_get_and_set() {
    let (dsl, app, _) = dsl_with(r#"<div id="test" class="foo"></div>"#);
    let class = dsl.element("#test").attr("class");
    dsl.element("#test").set_attr("id", "bar");
    run(&dsl).await;

    assert_eq!(class.value(), Some(&json!("foo")));
    let doc = app.document();
    let doc = doc.read();
    assert_eq!(doc.query(doc.root(), "#bar").unwrap().len(), 1);
}

#[tokio::test]
async fn test_element_attr_set_null_removes() {
    let (dsl, _, _) = dsl_with(r#"<input id="name" disabled>"#);
    dsl.element("#name").set_attr("disabled", Value::Null);
    let disabled = dsl.element("#name").attr("disabled");
    let prop = dsl.element("#name").prop("disabled");
    run(&dsl).await;

    assert_eq!(disabled.value(), Some(&Value::Null));
    assert_eq!(prop.value(), Some(&json!(false)));
}

#[tokio::test]
async fn test_element_getters_without_matches_resolve_null() {
    let (dsl, _, _) = dsl_with("<div></div>");
    let text = dsl.element("span").text();
    let val = dsl.element("span").val();
    let attr = dsl.element("span").attr("id");
    let set = dsl.element("span").set_text("ignored");
    let summary = run(&dsl).await;

    assert!(summary.success);
    for future in [&text, &val, &attr, &set] {
        assert_eq!(future.status(), FutureStatus::Resolved, "{}", future.name());
        assert_eq!(future.value(), Some(&Value::Null), "{}", future.name());
    }
}

#[tokio::test]
async fn test_element_position_is_read_only() {
    let (dsl, _, _) = dsl_with(r#"<div style="top: 5px"></div>"#);
    assert!(!Property::Position.is_settable());
    let set = dsl.element("div").set(Property::Position, json!({"top": 10, "left": 0}));
    let get = dsl.element("div").position();
    run(&dsl).await;

    assert_eq!(set.name(), "element 'div' set position");
    assert_eq!(set.error(), Some("position cannot be set"));
    assert_eq!(get.value(), Some(&json!({"top": 5, "left": 0})));
}

#[tokio::test]
async fn test_element_prop_get_and_set() {
    let (dsl, app, _) = dsl_with(r#"<div class="foo"></div>"#);
    let class_name = dsl.element("div").prop("className");
    let set = dsl.element("div").set_prop("className", "bam");
    run(&dsl).await;

    assert_eq!(class_name.value(), Some(&json!("foo")));
    assert_eq!(set.name(), "element 'div' set prop 'className' to 'bam'");
    assert_eq!(prop(&app, "div", "className"), json!("bam"));
}

#[tokio::test]
async fn test_element_css_get_and_set() {
    let (dsl, _, _) = dsl_with(r#"<div style="height: 30px"></div>"#);
    let height = dsl.element("div").css("height");
    dsl.element("div").set_css("height", "40px");
    let updated = dsl.element("div").css("height");
    run(&dsl).await;

    assert_eq!(height.value(), Some(&json!("30px")));
    assert_eq!(updated.value(), Some(&json!("40px")));
}

#[tokio::test]
async fn test_element_val_get_and_set() {
    let (dsl, app, _) = dsl_with(r#"<input value="bar">"#);
    let before = dsl.element("input").val();
    dsl.element("input").set_val("baz");
    run(&dsl).await;

    assert_eq!(before.value(), Some(&json!("bar")));
    assert_eq!(values(&app, "input"), vec!["baz"]);
}

#[tokio::test]
async fn test_element_property_names() {
    let (dsl, _, _) = dsl_with("<div></div>");
    let element = dsl.element("div");
    for property in Property::ALL {
        let get = element.get(property);
        assert_eq!(get.name(), format!("element 'div' {}", property));
        if property.is_settable() {
            let set = element.set(property, 1);
            assert_eq!(set.name(), format!("element 'div' set {}", property));
        }
    }
    assert_eq!(element.text().name(), "element 'div' text");
    assert_eq!(element.set_text("x").name(), "element 'div' set text");
}

#[tokio::test]
async fn test_element_custom_query() {
    let (dsl, _, _) = dsl_with(r#"<a href="http://example.com/myUrl"></a>"#);
    let href = dsl.element("a").query(|nodes, doc, done| {
        let href = doc.read().attr(nodes[0], "href").unwrap_or_default();
        done.resolve(href);
    });
    run(&dsl).await;

    assert_eq!(href.name(), "element 'a' custom query");
    assert_eq!(href.value(), Some(&json!("http://example.com/myUrl")));
}

#[tokio::test]
async fn test_element_label() {
    let (dsl, _, _) = dsl_with("");
    assert_eq!(dsl.element("a").label(), "a");
    assert_eq!(
        dsl.using("div").element("a").labeled("My Link").label(),
        "My Link ( div a )"
    );
}

// ============================================================================
// Repeater
// ============================================================================

#[tokio::test]
async fn test_repeater_count() {
    let (dsl, _, _) = dsl_with(REPEATER_HTML);
    let rows = dsl.repeater("ul li").count();
    let none = dsl.repeater("ol li").count();
    run(&dsl).await;
    assert_eq!(rows.value(), Some(&json!(2)));
    assert_eq!(none.value(), Some(&json!(0)));
}

#[tokio::test]
async fn test_repeater_row() {
    let (dsl, _, _) = dsl_with(REPEATER_HTML);
    let row = dsl.repeater("ul li").row(1);
    run(&dsl).await;
    assert_eq!(row.name(), "repeater 'ul li' row '1'");
    assert_eq!(row.value(), Some(&json!(["felisa", "female"])));
}

#[tokio::test]
async fn test_repeater_column() {
    let (dsl, _, _) = dsl_with(REPEATER_HTML);
    let genders = dsl.repeater("ul li").column("gender");
    let names = dsl.repeater("ul li").column("name");
    run(&dsl).await;
    assert_eq!(genders.value(), Some(&json!(["male", "female"])));
    assert_eq!(names.value(), Some(&json!(["misko", "felisa"])));
}

#[tokio::test]
async fn test_repeater_label() {
    let (dsl, _, _) = dsl_with("");
    assert_eq!(dsl.repeater("ul li").label(), "ul li");
    assert_eq!(
        dsl.using("ul li")
            .repeater("mySelector")
            .labeled("myLabel")
            .label(),
        "myLabel ( ul li mySelector )"
    );
}

// ============================================================================
// Binding
// ============================================================================

#[tokio::test]
async fn test_binding_by_name() {
    let (dsl, _, _) = dsl_with(r#"<span class="ng-binding" ng:bind="foo.bar">some value</span>"#);
    let value = dsl.binding("foo.bar");
    run(&dsl).await;
    assert_eq!(value.name(), "select binding 'foo.bar'");
    assert_eq!(value.value(), Some(&json!("some value")));
}

#[tokio::test]
async fn test_binding_by_regex() {
    let (dsl, _, _) = dsl_with(
        r#"<span class="ng-binding" ng:bind="foo.bar">some value</span>
           <span class="ng-binding" ng:bind="foo.baz">other</span>"#,
    );
    let value = dsl.binding(Regex::new(r"^foo\.b.z$").unwrap());
    run(&dsl).await;
    assert_eq!(value.value(), Some(&json!("other")));
}

#[tokio::test]
async fn test_binding_of_form_fields() {
    let (dsl, _, _) = dsl_with(
        r#"<input class="ng-binding" ng:bind="input" value="some value">
           <textarea class="ng-binding" ng:bind="area">other value</textarea>"#,
    );
    let input = dsl.binding("input");
    let area = dsl.binding("area");
    run(&dsl).await;
    assert_eq!(input.value(), Some(&json!("some value")));
    assert_eq!(area.value(), Some(&json!("other value")));
}

#[tokio::test]
async fn test_binding_returns_markup() {
    let (dsl, _, _) =
        dsl_with(r#"<div class="ng-binding" ng:bind="foo.bar">some <b>value</b></div>"#);
    let value = dsl.binding("foo.bar");
    run(&dsl).await;
    assert_eq!(value.value(), Some(&json!("some <b>value</b>")));
}

#[tokio::test]
async fn test_binding_template_and_substring() {
    let (dsl, _, _) = dsl_with(
        r#"<span class="ng-binding" ng:bind-template="foo {{bar}} baz">foo some baz</span>
           <span class="ng-binding" ng:bind="foo.bar() &amp;&amp; test.baz() | filter">sub</span>"#,
    );
    let template = dsl.binding("bar");
    let substring = dsl.binding("test.baz");
    run(&dsl).await;
    assert_eq!(template.value(), Some(&json!("foo some baz")));
    assert_eq!(substring.value(), Some(&json!("sub")));
}

#[tokio::test]
async fn test_binding_failures() {
    let (dsl, _, _) = dsl_with(r#"<span class="ng-binding" ng:bind="foo">x</span>"#);
    let missing = dsl.binding("nomatch");
    run(&dsl).await;
    assert!(missing.error().unwrap().contains("did not match"));

    let (dsl, _, _) = dsl_with("<span>no bindings</span>");
    let none = dsl.binding("foo");
    run(&dsl).await;
    assert!(none.error().unwrap().contains("did not match"));
}

// ============================================================================
// Using
// ============================================================================

#[tokio::test]
async fn test_using_scopes_lookups() {
    let (dsl, app, _) = dsl_with(
        r#"<div id="test1"><input ng:model="test.input" value="something"></div>
           <div id="test2"><input ng:model="test.input" value="something"></div>"#,
    );
    dsl.using("div#test2").input("test.input").enter("foo");
    run(&dsl).await;
    assert_eq!(values(&app, "input"), vec!["something", "foo"]);
}

#[tokio::test]
async fn test_using_labels() {
    let (dsl, _, _) = dsl_with("");
    assert_eq!(dsl.using("div").label(), "div");
    assert_eq!(dsl.using("div").labeled("My Div").label(), "My Div ( div )");
    assert_eq!(
        dsl.using("div").using("p").labeled("Para").label(),
        "Para ( div p )"
    );
}

// ============================================================================
// Input
// ============================================================================

#[tokio::test]
async fn test_input_enter() {
    let hook = Arc::new(MemoryHook::new());
    let (dsl, app, _) = app_dsl(
        MemoryApplication::from_html(r#"<input ng:model="test.input" value="something">"#)
            .with_hook(hook.clone()),
    );
    let enter = dsl.input("test.input").enter("foo");
    run(&dsl).await;

    assert_eq!(enter.name(), "input 'test.input' enter 'foo'");
    assert_eq!(values(&app, "input"), vec!["foo"]);
    assert_eq!(hook.notifications(), 1);
}

#[tokio::test]
async fn test_input_enter_missing_fails() {
    let (dsl, _, _) = dsl_with("");
    let enter = dsl.input("test.input").enter("foo");
    run(&dsl).await;
    assert!(enter.error().unwrap().contains("did not match"));
}

#[tokio::test]
async fn test_input_checkbox_toggle() {
    let (dsl, app, _) = dsl_with(r#"<input type="checkbox" ng:model="test.input" checked>"#);
    dsl.input("test.input").check();
    run(&dsl).await;
    assert_eq!(prop(&app, "input", "checked"), json!(false));

    dsl.input("test.input").check();
    run(&dsl).await;
    assert_eq!(prop(&app, "input", "checked"), json!(true));
}

#[tokio::test]
async fn test_input_checkbox_missing_fails() {
    let (dsl, _, _) = dsl_with(r#"<input ng:model="test.input">"#);
    let check = dsl.input("test.input").check();
    run(&dsl).await;
    assert!(check.error().unwrap().contains("did not match"));
}

#[tokio::test]
async fn test_input_radio_select() {
    let (dsl, app, _) = dsl_with(
        r#"<input type="radio" ng:model="gender" value="male" checked>
           <input type="radio" ng:model="gender" value="female">"#,
    );
    dsl.input("gender").select("female");
    run(&dsl).await;

    assert_eq!(prop(&app, "input[value=female]", "checked"), json!(true));
    assert_eq!(prop(&app, "input[value=male]", "checked"), json!(false));
}

#[tokio::test]
async fn test_input_radio_missing_fails() {
    let (dsl, _, _) = dsl_with(r#"<input type="radio" ng:model="gender" value="male">"#);
    let select = dsl.input("gender").select("other");
    run(&dsl).await;
    assert!(select.error().unwrap().contains("did not match"));
}

#[tokio::test]
async fn test_input_val() {
    let (dsl, _, _) = dsl_with(r#"<input ng:model="test.input" value="something">"#);
    let val = dsl.input("test.input").val();
    run(&dsl).await;
    assert_eq!(val.name(), "input 'test.input' val");
    assert_eq!(val.value(), Some(&json!("something")));
}

#[tokio::test]
async fn test_textarea_enter() {
    let (dsl, app, _) = dsl_with(r#"<textarea ng:model="test.textarea">something</textarea>"#);
    dsl.input("test.textarea").enter("foo");
    run(&dsl).await;
    assert_eq!(values(&app, "textarea"), vec!["foo"]);
}

#[tokio::test]
async fn test_textarea_enter_missing_fails() {
    let (dsl, _, _) = dsl_with("<textarea></textarea>");
    let enter = dsl.input("test.textarea").enter("foo");
    run(&dsl).await;
    assert!(enter.error().unwrap().contains("did not match"));
}
