// src/types.rs

//! Small shared vocabulary types: asset categories, task names and the
//! re-trigger policy.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Logical asset category of the source tree.
///
/// Each category owns one source glob set, one output directory and one
/// watch glob set in the [`PathTable`](crate::paths::PathTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCategory {
    Sites,
    Templates,
    Styles,
    Scripts,
    Images,
    VectorGraphics,
    VectorSprite,
    Fonts,
    /// Declaratively managed third-party dependencies.
    VendorsA,
    /// Manually dropped-in third-party files.
    VendorsB,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Sites => "sites",
            AssetCategory::Templates => "templates",
            AssetCategory::Styles => "styles",
            AssetCategory::Scripts => "scripts",
            AssetCategory::Images => "images",
            AssetCategory::VectorGraphics => "vector-graphics",
            AssetCategory::VectorSprite => "vector-sprite",
            AssetCategory::Fonts => "fonts",
            AssetCategory::VendorsA => "vendors-a",
            AssetCategory::VendorsB => "vendors-b",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a build task. There is exactly one task per buildable category
/// (templates only feed `sites`, both vendor drops feed `vendors`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskName {
    Sites,
    Fonts,
    Styles,
    Scripts,
    Images,
    VectorGraphics,
    VectorSprite,
    Vendors,
}

impl TaskName {
    /// All tasks, in the order the full build runs them.
    pub const BUILD_ORDER: [TaskName; 8] = [
        TaskName::Sites,
        TaskName::Fonts,
        TaskName::Styles,
        TaskName::Scripts,
        TaskName::Images,
        TaskName::VectorGraphics,
        TaskName::VectorSprite,
        TaskName::Vendors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Sites => "sites",
            TaskName::Fonts => "fonts",
            TaskName::Styles => "styles",
            TaskName::Scripts => "scripts",
            TaskName::Images => "images",
            TaskName::VectorGraphics => "vector-graphics",
            TaskName::VectorSprite => "vector-sprite",
            TaskName::Vendors => "vendors",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        TaskName::BUILD_ORDER
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = TaskName::BUILD_ORDER.iter().map(|t| t.as_str()).collect();
                format!("unknown task: {s} (expected one of {})", known.join(", "))
            })
    }
}

/// Behaviour when a watch trigger arrives for a task that is still running.
///
/// - `Queue`: remember the trigger and rerun the task once the current run
///   finishes. Any number of triggers during one run coalesce into a single
///   rerun.
/// - `Skip`: drop the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Skip,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "skip" => Ok(TriggerWhileRunningBehaviour::Skip),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"skip\")"
            )),
        }
    }
}

/// Where watch-mode content hashes are kept when `use_hash` is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Hashes live for the lifetime of the process.
    #[default]
    Memory,
    /// Hashes persist in `.sitepipe/hashes` across restarts.
    File,
}
