//! Compiled-in manifests for the generation phases.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SvgKind {
    Animated,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvgComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SvgKind,
    pub theme: &'static str,
}

pub const QUANTUM_SPATIAL_THEME: &str = "quantum-spatial";
pub const HERITAGE_THEME: &str = "heritage";

fn svg_series(
    prefix: &str,
    theme: &'static str,
    count: usize,
    animated: usize,
) -> Vec<SvgComponent> {
    (0..count)
        .map(|i| SvgComponent {
            name: format!("{prefix}_{}", i + 1),
            kind: if i < animated {
                SvgKind::Animated
            } else {
                SvgKind::Static
            },
            theme,
        })
        .collect()
}

/// 30 quantum-spatial components followed by 15 heritage components.
pub fn svg_manifest() -> Vec<SvgComponent> {
    let mut components = svg_series("QuantumSpatial", QUANTUM_SPATIAL_THEME, 30, 15);
    components.extend(svg_series("Heritage", HERITAGE_THEME, 15, 5));
    components
}

pub const GAME_CORE_FILES: &[&str] = &[
    "HexecuteGameEngine.swift",
    "HexagonalGrid.swift",
    "MetalRenderer.swift",
    "M4PhysicsEngine.swift",
    "GameEntities.swift",
    "Shaders.metal",
];

pub const GAME_RULES_PLACEHOLDER: &str = "Placeholder: Hexecute game mechanics go here";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionProCategory {
    pub name: &'static str,
    pub count: usize,
}

pub const VISION_PRO_CATEGORIES: &[VisionProCategory] = &[
    VisionProCategory {
        name: "Primitives",
        count: 20,
    },
    VisionProCategory {
        name: "Compositions",
        count: 15,
    },
    VisionProCategory {
        name: "Experiences",
        count: 5,
    },
];

#[derive(Debug, Clone)]
pub struct PhaseManifests {
    pub svg: Vec<SvgComponent>,
    pub game_files: Vec<String>,
    pub vision_pro: Vec<VisionProCategory>,
}

impl PhaseManifests {
    pub fn builtin() -> Self {
        Self {
            svg: svg_manifest(),
            game_files: GAME_CORE_FILES.iter().map(|f| f.to_string()).collect(),
            vision_pro: VISION_PRO_CATEGORIES.to_vec(),
        }
    }

    pub fn total_items(&self) -> usize {
        self.svg.len()
            + self.game_files.len()
            + self.vision_pro.iter().map(|c| c.count).sum::<usize>()
    }
}

impl Default for PhaseManifests {
    fn default() -> Self {
        Self::builtin()
    }
}
