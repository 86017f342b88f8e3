//! Deterministic task routing
//!
//! Classifies free-text task descriptions with ordered keyword patterns
//! and maps each task type to a fixed agent sequence and priority.
//! Classification is deterministic code; no judge calls are involved.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kinds of work the router can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Feature,
    BugFix,
    Review,
    Docs,
    Infrastructure,
    Design,
    Architecture,
    Backend,
    Frontend,
    Ml,
    Integration,
    Performance,
    #[serde(rename = "project_mgmt")]
    ProjectManagement,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl TaskType {
    /// Ordered agents that handle this kind of task. Features and bug
    /// fixes put a test-writing engineer before the implementer.
    pub fn agent_sequence(&self) -> Vec<String> {
        let agents: &[&str] = match self {
            TaskType::Feature => &["architect", "performance-engineer", "orchestrator"],
            TaskType::BugFix => &["performance-engineer", "orchestrator", "reviewer"],
            TaskType::Infrastructure => &["architect", "infrastructure-engineer", "reviewer"],
            TaskType::Design => &["designer"],
            TaskType::Architecture => &["architect"],
            TaskType::Backend => &["performance-engineer", "backend-engineer", "reviewer"],
            TaskType::Frontend => &["performance-engineer", "frontend-engineer", "reviewer"],
            TaskType::Ml => &["ml-engineer", "performance-engineer", "reviewer"],
            TaskType::Integration => &["integration-engineer", "reviewer"],
            TaskType::Performance => &["performance-engineer", "orchestrator"],
            TaskType::ProjectManagement => &["project-manager"],
            TaskType::Review => &["reviewer"],
            TaskType::Docs => &["architect"],
            TaskType::Unknown => &["orchestrator"],
        };
        agents.iter().map(|agent| agent.to_string()).collect()
    }

    /// Architectural decisions and integration failures block other
    /// work, so they rank high.
    pub fn priority(&self) -> Priority {
        match self {
            TaskType::BugFix | TaskType::Architecture | TaskType::Integration => Priority::High,
            TaskType::Docs | TaskType::ProjectManagement | TaskType::Unknown => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

lazy_static! {
    // Ordered by specificity: architecture and documentation first so
    // they win over the keyword fallbacks, feature keywords last.
    static ref CLASSIFICATION_PATTERNS: Vec<(TaskType, Regex)> = {
        let table: &[(TaskType, &str)] = &[
            (TaskType::Architecture, r"(?i)\barchitecture\b"),
            (TaskType::Architecture, r"(?i)\bsystem\s*design\b"),
            (TaskType::Architecture, r"(?i)\bapi\s*spec\b"),
            (TaskType::Architecture, r"(?i)\bfoundation\b.*\bdocumentation\b"),
            (TaskType::Architecture, r"(?i)\bproject\s+foundation\b"),
            (TaskType::Docs, r"(?i)\bwrite.*documentation\b"),
            (TaskType::Docs, r"(?i)\bcreate.*documentation\b"),
            (TaskType::Docs, r"(?i)\barchitectural\s+documentation\b"),
            (TaskType::Design, r"(?i)\bdesign\b"),
            (TaskType::Design, r"(?i)\bui\b"),
            (TaskType::Design, r"(?i)\bux\b"),
            (TaskType::Design, r"(?i)\bwireframe\b"),
            (TaskType::Backend, r"(?i)\bapi\b"),
            (TaskType::Backend, r"(?i)\bdatabase\b"),
            (TaskType::Backend, r"(?i)\bbackend\b"),
            (TaskType::Backend, r"(?i)\bgrpc\b"),
            (TaskType::Frontend, r"(?i)\bfrontend\b"),
            (TaskType::Frontend, r"(?i)\bcomponent\b"),
            (TaskType::Frontend, r"(?i)\breact\b"),
            (TaskType::Ml, r"(?i)\bmachine\s*learning\b"),
            (TaskType::Ml, r"(?i)\bml\b"),
            (TaskType::Ml, r"(?i)\bllm\b"),
            (TaskType::Ml, r"(?i)\bmodel\b"),
            (TaskType::Integration, r"(?i)\bintegration\b"),
            (TaskType::Integration, r"(?i)\bend.to.end\b"),
            (TaskType::Integration, r"(?i)\be2e\b"),
            (TaskType::Performance, r"(?i)\bperformance\b"),
            (TaskType::Performance, r"(?i)\boptimize\b"),
            (TaskType::Performance, r"(?i)\bprofile\b"),
            (TaskType::Performance, r"(?i)\bbenchmark\b"),
            (TaskType::ProjectManagement, r"(?i)\bepic\b"),
            (TaskType::ProjectManagement, r"(?i)\bcost\s*estimate\b"),
            (TaskType::ProjectManagement, r"(?i)\bsync\b"),
            // Review before bug fix so "review the fix" stays a review.
            (TaskType::Review, r"(?i)\breview\b"),
            (TaskType::Review, r"(?i)\bpr\b"),
            (TaskType::Review, r"(?i)\bpull\s*request\b"),
            (TaskType::Review, r"(?i)\bcode\s*review\b"),
            (TaskType::BugFix, r"(?i)\bbug\b"),
            (TaskType::BugFix, r"(?i)\bfix\b"),
            (TaskType::BugFix, r"(?i)\bbroken\b"),
            (TaskType::BugFix, r"(?i)\berror\b"),
            (TaskType::BugFix, r"(?i)\bissue\b"),
            (TaskType::Docs, r"(?i)\bdocs?\b"),
            (TaskType::Docs, r"(?i)\breadme\b"),
            (TaskType::Docs, r"(?i)\bdocstrings?\b"),
            (TaskType::Infrastructure, r"(?i)\binfra\b"),
            (TaskType::Infrastructure, r"(?i)\binfrastructure\b"),
            (TaskType::Infrastructure, r"(?i)\bci\b"),
            (TaskType::Infrastructure, r"(?i)\bcd\b"),
            (TaskType::Infrastructure, r"(?i)\bdeploy\b"),
            (TaskType::Infrastructure, r"(?i)\bpipeline\b"),
            (TaskType::Infrastructure, r"(?i)\bdevops\b"),
            (TaskType::Feature, r"(?i)\bfeature\b"),
            (TaskType::Feature, r"(?i)\badd\b"),
            (TaskType::Feature, r"(?i)\bcreate\b"),
            (TaskType::Feature, r"(?i)\bimplement\b"),
        ];
        table
            .iter()
            .map(|(task_type, pattern)| (*task_type, Regex::new(pattern).unwrap()))
            .collect()
    };

    static ref FILE_PATH_PATTERN: Regex =
        Regex::new(r"[\w./\-]+\.(?:py|rs|js|ts|json|yaml|yml|toml|md|txt|sh)").unwrap();
}

/// Context pulled out of a task description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingContext {
    pub files: Vec<String>,
}

/// A routing decision: what the task is, who handles it, how urgent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub task_type: TaskType,
    pub agent_sequence: Vec<String>,
    pub priority: Priority,
    pub context: RoutingContext,
}

/// Routes tasks to agent sequences via classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskRouter;

impl TaskRouter {
    pub fn new() -> Self {
        Self
    }

    /// Classify a task description. First matching pattern wins;
    /// empty or unmatched input is a valid `Unknown`, not an error.
    pub fn classify(&self, task_description: &str) -> TaskType {
        if task_description.trim().is_empty() {
            return TaskType::Unknown;
        }

        for (task_type, pattern) in CLASSIFICATION_PATTERNS.iter() {
            if pattern.is_match(task_description) {
                return *task_type;
            }
        }

        TaskType::Unknown
    }

    /// Classify and produce the full routing decision.
    pub fn route(&self, task_description: &str) -> RoutingDecision {
        let context = extract_context(task_description);
        let task_type = self.classify(task_description);

        RoutingDecision {
            task_type,
            agent_sequence: task_type.agent_sequence(),
            priority: task_type.priority(),
            context,
        }
    }
}

fn extract_context(task_description: &str) -> RoutingContext {
    let files = FILE_PATH_PATTERN
        .find_iter(task_description)
        .map(|m| m.as_str().to_string())
        .collect();
    RoutingContext { files }
}
