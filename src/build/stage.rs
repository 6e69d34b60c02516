//! Stage definitions.
//!
//! A stage is a named unit of work in the site pipeline. Stages declare the
//! stages that must complete before them; a [`StagePlan`] turns a requested
//! stage into the ordered list of stages to execute.

use std::collections::HashSet;
use std::str::FromStr;

/// How a stage does its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Rewrites files on disk through one or more transformations
    Transform,
    /// Runs an external command or a file-system publish step
    Command,
    /// Only orders other stages
    Sequence,
    /// Long-running serve and watch process
    Serve,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Transform => write!(f, "transform"),
            StageKind::Command => write!(f, "command"),
            StageKind::Sequence => write!(f, "sequence"),
            StageKind::Serve => write!(f, "serve"),
        }
    }
}

/// A named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    CompileScript,
    PrependMarker,
    CompileStyles,
    GenerateSite,
    MinifyHtml,
    ProductionBuild,
    WatchAndServe,
    PublishCopy,
    Deploy,
}

impl Stage {
    /// Every stage, in declaration order.
    pub const ALL: [Stage; 9] = [
        Stage::CompileScript,
        Stage::PrependMarker,
        Stage::CompileStyles,
        Stage::GenerateSite,
        Stage::MinifyHtml,
        Stage::ProductionBuild,
        Stage::WatchAndServe,
        Stage::PublishCopy,
        Stage::Deploy,
    ];

    /// Command-line name of the stage.
    pub fn name(self) -> &'static str {
        match self {
            Stage::CompileScript => "compile-script",
            Stage::PrependMarker => "prepend-marker",
            Stage::CompileStyles => "compile-styles",
            Stage::GenerateSite => "generate-site",
            Stage::MinifyHtml => "minify-html",
            Stage::ProductionBuild => "production-build",
            Stage::WatchAndServe => "watch-and-serve",
            Stage::PublishCopy => "publish-copy",
            Stage::Deploy => "deploy",
        }
    }

    pub fn kind(self) -> StageKind {
        match self {
            Stage::CompileScript
            | Stage::PrependMarker
            | Stage::CompileStyles
            | Stage::MinifyHtml => StageKind::Transform,
            Stage::GenerateSite | Stage::PublishCopy => StageKind::Command,
            Stage::ProductionBuild | Stage::Deploy => StageKind::Sequence,
            Stage::WatchAndServe => StageKind::Serve,
        }
    }

    /// Stages that must complete successfully before this one starts, in the
    /// order they are run.
    ///
    /// `production-build` compiles styles before generating the site so the
    /// generator copies the fresh stylesheet into the output directory.
    pub fn dependencies(self) -> &'static [Stage] {
        match self {
            Stage::CompileScript | Stage::CompileStyles | Stage::PublishCopy => &[],
            Stage::PrependMarker => &[Stage::CompileScript],
            Stage::GenerateSite => &[Stage::CompileScript, Stage::PrependMarker],
            Stage::MinifyHtml => &[Stage::GenerateSite],
            Stage::ProductionBuild => {
                &[Stage::CompileStyles, Stage::GenerateSite, Stage::MinifyHtml]
            }
            Stage::WatchAndServe => &[Stage::GenerateSite],
            Stage::Deploy => &[Stage::ProductionBuild, Stage::PublishCopy],
        }
    }

    /// One-line description used in help output.
    pub fn description(self) -> &'static str {
        match self {
            Stage::CompileScript => "Minify the script entry into the asset directory",
            Stage::PrependMarker => "Prepend the front-matter marker to the minified script",
            Stage::CompileStyles => "Compile the stylesheet to CSS and minified CSS",
            Stage::GenerateSite => "Run the script stages, then the site generator",
            Stage::MinifyHtml => "Minify every HTML file in the output directory",
            Stage::ProductionBuild => "Full production build",
            Stage::WatchAndServe => "Build, serve with live reload and rebuild on change",
            Stage::PublishCopy => "Replace the publish target's contents with the output",
            Stage::Deploy => "Production build followed by publish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing a stage name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl std::fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
        write!(f, "unknown stage '{}' (expected one of: {})", self.0, names.join(", "))
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// The ordered stages needed to complete a requested stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Plan the requested stage and everything it depends on.
    ///
    /// Dependencies come before dependents and no stage appears twice.
    pub fn for_stage(target: Stage) -> Self {
        Self::for_stages(&[target])
    }

    /// Plan several requested stages in order, sharing common dependencies.
    pub fn for_stages(targets: &[Stage]) -> Self {
        let mut stages = Vec::new();
        let mut visited = HashSet::new();
        for target in targets {
            visit(*target, &mut visited, &mut stages);
        }
        Self { stages }
    }

    /// Get all stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages that do real work, without sequence and serve stages.
    pub fn executable(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages
            .iter()
            .copied()
            .filter(|s| !matches!(s.kind(), StageKind::Sequence | StageKind::Serve))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Position of a stage in the plan.
    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }
}

// The stage graph is fixed and acyclic, so a plain depth-first walk is enough.
fn visit(stage: Stage, visited: &mut HashSet<Stage>, result: &mut Vec<Stage>) {
    if visited.contains(&stage) {
        return;
    }

    for dep in stage.dependencies() {
        visit(*dep, visited, result);
    }

    visited.insert(stage);
    result.push(stage);
}
