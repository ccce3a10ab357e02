use std::fs;
use std::path::Path;
use std::sync::Arc;

use scenario_dsl::prelude::*;
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_scenario(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write scenario file");
}

pub fn write_config(dir: &Path, content: &str) {
    fs::write(dir.join("scenario.yaml"), content).expect("Failed to write scenario.yaml");
}

pub fn simple_scenario(name: &str) -> String {
    format!(
        r#"
name: {}
html: '<input ng:model="name" value="misko">'
steps:
  - uses: input/val
    with:
      model: name
    expect:
      matcher: toEqual
      value: misko
"#,
        name
    )
}

pub fn failing_scenario(name: &str) -> String {
    format!(
        r#"
name: {}
steps:
  - uses: input/enter
    with:
      model: missing
      value: foo
"#,
        name
    )
}

/// DSL over an application showing `html`, with a virtual clock
pub fn dsl_with(html: &str) -> (Dsl, Arc<MemoryApplication>, MockClock) {
    app_dsl(MemoryApplication::from_html(html))
}

pub fn app_dsl(app: MemoryApplication) -> (Dsl, Arc<MemoryApplication>, MockClock) {
    let app = Arc::new(app);
    let clock = MockClock::new();
    let ctx = ExecutionContext::builder(app.clone())
        .timer(Arc::new(clock.clone()))
        .build();
    (Dsl::new(ctx), app, clock)
}
