//! Gradle block context.
//!
//! Build scripts are interpreted by where a statement sits:
//! `implementation("a:b:1")` is a dependency only inside `dependencies { }`,
//! and anything under `allprojects { }` or `subprojects { }` applies to every
//! module.

use phf::phf_map;

use crate::analysis::ContextController;
use crate::parser::script::{self, block_name};
use crate::parser::{SyntaxNode, SyntaxUnit};

/// Build script blocks that change how statements are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradleBlock {
    Dependencies,
    Plugins,
    AllProjects,
    SubProjects,
    Repositories,
    Buildscript,
    Apply,
}

/// Lowercase block name -> block.
static BLOCKS: phf::Map<&'static str, GradleBlock> = phf_map! {
    "dependencies" => GradleBlock::Dependencies,
    "plugins" => GradleBlock::Plugins,
    "allprojects" => GradleBlock::AllProjects,
    "subprojects" => GradleBlock::SubProjects,
    "repositories" => GradleBlock::Repositories,
    "buildscript" => GradleBlock::Buildscript,
    "apply" => GradleBlock::Apply,
};

impl GradleBlock {
    /// Block for a header name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCKS.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn key(&self) -> &'static str {
        match self {
            GradleBlock::Dependencies => "dependencies",
            GradleBlock::Plugins => "plugins",
            GradleBlock::AllProjects => "allprojects",
            GradleBlock::SubProjects => "subprojects",
            GradleBlock::Repositories => "repositories",
            GradleBlock::Buildscript => "buildscript",
            GradleBlock::Apply => "apply",
        }
    }
}

/// Stack of enclosing blocks. Unrecognized blocks are kept as `None` so
/// every close pops exactly what its open pushed.
#[derive(Debug, Default)]
pub struct GradleBlockContext {
    stack: Vec<Option<GradleBlock>>,
}

impl GradleBlockContext {
    /// Immediately enclosing block, if it is a recognized one.
    pub fn current(&self) -> Option<GradleBlock> {
        self.stack.last().copied().flatten()
    }

    /// Innermost recognized enclosing block.
    pub fn innermost(&self) -> Option<GradleBlock> {
        self.stack.iter().rev().find_map(|b| *b)
    }

    pub fn within(&self, block: GradleBlock) -> bool {
        self.stack.contains(&Some(block))
    }

    /// Inside `allprojects { }` or `subprojects { }`.
    pub fn all_projects(&self) -> bool {
        self.within(GradleBlock::AllProjects) || self.within(GradleBlock::SubProjects)
    }
}

/// Pushes and pops [`GradleBlockContext`] entries around `block` nodes.
pub struct GradleBlockController;

impl ContextController<GradleBlockContext> for GradleBlockController {
    fn open(&self, node: &SyntaxNode, unit: &SyntaxUnit, context: &mut GradleBlockContext) {
        if node.kind() == script::BLOCK {
            context
                .stack
                .push(block_name(unit, node).and_then(GradleBlock::from_name));
        }
    }

    fn close(&self, node: &SyntaxNode, _unit: &SyntaxUnit, context: &mut GradleBlockContext) {
        if node.kind() == script::BLOCK {
            context.stack.pop();
        }
    }
}
