//! Named tasks with prerequisites
//!
//! A [`TaskRegistry`] maps task names to [`Task`]s. Running a task first
//! resolves its full plan (prerequisites depth-first, each task once), so an
//! unknown name fails before anything touches the filesystem.

use crate::build::{css_pipeline, PipelineError};
use crate::config::StyleConfig;
use crate::output::{format_duration, log_error, log_line};
use crate::watch::{watch, WatchError, WatchOptions};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Error from resolving or running a task.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// No task with this name is registered
    #[error("task '{0}' is not registered")]
    UnknownTask(String),
    /// Prerequisites form a cycle
    #[error("task dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    /// The task's configuration cannot be turned into a pipeline
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl TaskError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            TaskError::UnknownTask(_) | TaskError::Cycle(_) | TaskError::Config(_) => 2,
            TaskError::Pipeline(_) | TaskError::Watch(_) => 1,
        }
    }
}

/// Work performed by a task. Receives the registry it runs in.
pub type TaskBody = Box<dyn Fn(&TaskRegistry) -> Result<(), TaskError>>;

/// A named unit of work.
pub struct Task {
    name: String,
    description: String,
    prerequisites: Vec<String>,
    body: Option<TaskBody>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: String::new(), prerequisites: Vec::new(), body: None }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Tasks that must complete before this one, in order.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&TaskRegistry) -> Result<(), TaskError> + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Registry of named tasks.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, returning the one it replaced.
    pub fn register(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.name.clone(), task)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Registered task names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Resolve the order in which `name` and its prerequisites run.
    pub fn plan(&self, name: &str) -> Result<Vec<&str>, TaskError> {
        let mut plan = Vec::new();
        let mut stack = Vec::new();
        self.visit(name, &mut stack, &mut plan)?;
        Ok(plan)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        stack: &mut Vec<&'a str>,
        plan: &mut Vec<&'a str>,
    ) -> Result<(), TaskError> {
        let (key, task) = self
            .tasks
            .get_key_value(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

        if plan.contains(&key.as_str()) {
            return Ok(());
        }
        if let Some(pos) = stack.iter().position(|n| *n == key.as_str()) {
            let mut cycle: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(key.clone());
            return Err(TaskError::Cycle(cycle));
        }

        stack.push(key.as_str());
        for prerequisite in &task.prerequisites {
            self.visit(prerequisite, stack, plan)?;
        }
        stack.pop();
        plan.push(key.as_str());
        Ok(())
    }

    /// Run a task and its prerequisites.
    pub fn run(&self, name: &str) -> Result<(), TaskError> {
        let plan = self.plan(name)?;
        debug!(task = name, plan = ?plan, "resolved task plan");

        for step in plan {
            let Some(body) = self.tasks.get(step).and_then(|t| t.body.as_ref()) else {
                continue;
            };
            log_line(format!("Starting '{}'...", step));
            let start = Instant::now();
            if let Err(e) = body(self) {
                log_error(format!("'{}' errored after {}", step, format_duration(start.elapsed())));
                return Err(e);
            }
            log_line(format!("Finished '{}' after {}", step, format_duration(start.elapsed())));
        }
        Ok(())
    }
}

/// Build the registry with the standard `css`, `watch` and `default` tasks.
pub fn standard_registry(config: &StyleConfig, root: &Path) -> TaskRegistry {
    let mut registry = TaskRegistry::new();

    let css_config = config.clone();
    let css_root = root.to_path_buf();
    registry.register(
        Task::new("css")
            .describe("Compile, normalize, format, prefix and minify stylesheets")
            .body(move |_| build_css(&css_config, &css_root)),
    );

    let options = WatchOptions::from_config(config, root);
    registry.register(
        Task::new("watch")
            .describe(format!("Run '{}' when {} changes", config.watch.task, config.watch.pattern))
            .body(move |registry| watch(registry, &options)),
    );

    registry.register(Task::new("default").describe("Build stylesheets once").depends_on(["css"]));

    registry
}

fn build_css(config: &StyleConfig, root: &Path) -> Result<(), TaskError> {
    let pipeline = css_pipeline(config, root).map_err(TaskError::Config)?;
    let report = pipeline.run()?;
    for path in report.written() {
        debug!(path = %path.display(), "wrote");
    }
    info!("{}", report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(registry: &mut TaskRegistry, log: &Rc<RefCell<Vec<String>>>, name: &str, deps: &[&str]) {
        let log = log.clone();
        let owned = name.to_string();
        registry.register(
            Task::new(name).depends_on(deps.iter().copied()).body(move |_| {
                log.borrow_mut().push(owned.clone());
                Ok(())
            }),
        );
    }

    #[test]
    fn test_default_runs_css() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        recording(&mut registry, &log, "css", &[]);
        registry.register(Task::new("default").depends_on(["css"]));

        registry.run("default").unwrap();
        assert_eq!(*log.borrow(), vec!["css"]);
    }

    #[test]
    fn test_plan_is_depth_first_and_runs_each_task_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        recording(&mut registry, &log, "clean", &[]);
        recording(&mut registry, &log, "css", &["clean"]);
        recording(&mut registry, &log, "fonts", &["clean"]);
        recording(&mut registry, &log, "all", &["css", "fonts"]);

        assert_eq!(registry.plan("all").unwrap(), vec!["clean", "css", "fonts", "all"]);
        registry.run("all").unwrap();
        assert_eq!(*log.borrow(), vec!["clean", "css", "fonts", "all"]);
    }

    #[test]
    fn test_unknown_task_fails_before_any_body_runs() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        recording(&mut registry, &log, "css", &[]);
        recording(&mut registry, &log, "all", &["css", "missing"]);

        let err = registry.run("all").unwrap_err();
        assert!(matches!(err, TaskError::UnknownTask(ref name) if name == "missing"));
        assert!(log.borrow().is_empty());

        let err = registry.run("nope").unwrap_err();
        assert_eq!(err.to_string(), "task 'nope' is not registered");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("a").depends_on(["b"]));
        registry.register(Task::new("b").depends_on(["a"]));

        let err = registry.plan("a").unwrap_err();
        match err {
            TaskError::Cycle(path) => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_body_stops_the_plan() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register(
            Task::new("broken").body(|_| Err(TaskError::Config("bad browsers".to_string()))),
        );
        recording(&mut registry, &log, "after", &["broken"]);

        assert!(matches!(registry.run("after"), Err(TaskError::Config(_))));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TaskRegistry::new();
        assert!(registry.register(Task::new("css").describe("one")).is_none());
        let old = registry.register(Task::new("css").describe("two")).unwrap();
        assert_eq!(old.description(), "one");
        assert_eq!(registry.get("css").unwrap().description(), "two");
    }

    #[test]
    fn test_standard_registry_names() {
        let registry = standard_registry(&StyleConfig::default(), Path::new("/project"));
        assert_eq!(registry.names(), vec!["css", "default", "watch"]);
        assert_eq!(registry.get("default").unwrap().prerequisites(), ["css".to_string()]);
        assert!(!registry.get("default").unwrap().has_body());
        assert_eq!(registry.plan("default").unwrap(), vec!["css", "default"]);
    }
}
