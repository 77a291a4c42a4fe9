//! Structural units extracted from one source file

use crate::types::{UnitId, UnitKind};

/// A module-level function or a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionUnit {
    pub name: String,
    pub docstring: Option<String>,
    /// Verbatim source, whole lines, including decorators
    pub source: String,
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
}

/// A module-level class and its direct methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassUnit {
    pub name: String,
    pub docstring: Option<String>,
    /// Verbatim source of the whole class
    pub source: String,
    /// Class source with the lines of its methods removed
    pub own_source: String,
    pub start_line: usize,
    pub end_line: usize,
    pub methods: Vec<FunctionUnit>,
}

impl ClassUnit {
    pub fn method(&self, name: &str) -> Option<&FunctionUnit> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// The unit tree of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    /// Path relative to the scanned root, `/`-separated
    pub file_path: String,
    pub functions: Vec<FunctionUnit>,
    pub classes: Vec<ClassUnit>,
}

impl ParsedFile {
    pub fn function(&self, name: &str) -> Option<&FunctionUnit> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassUnit> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Number of units, counting methods
    pub fn unit_count(&self) -> usize {
        self.functions.len()
            + self.classes.len()
            + self.classes.iter().map(|c| c.methods.len()).sum::<usize>()
    }

    /// Identities of every unit in the file, in source order
    pub fn unit_ids(&self) -> Vec<(UnitKind, UnitId)> {
        let mut ids = Vec::with_capacity(self.unit_count());
        for function in &self.functions {
            ids.push((
                UnitKind::Function,
                UnitId::new(&self.file_path, None, &function.name),
            ));
        }
        for class in &self.classes {
            ids.push((UnitKind::Class, UnitId::new(&self.file_path, None, &class.name)));
            for method in &class.methods {
                ids.push((
                    UnitKind::Method,
                    UnitId::new(&self.file_path, Some(&class.name), &method.name),
                ));
            }
        }
        ids
    }
}
